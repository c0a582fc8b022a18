use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Environment;

/// Error type for filter parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid filter expression \"{0}\"")]
    Invalid(String),
    #[error("Unbalanced parentheses in filter \"{0}\"")]
    Unbalanced(String),
}

/// An LDAP-style predicate over environment properties.
///
/// Supported forms: `(key=value)`, `(key=*)` presence, and the `&`, `|`,
/// `!` combinators, e.g. `(&(osgi.os=linux)(osgi.arch=x86_64))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Filter {
    text: String,
    node: Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Equals(String, String),
    Present(String),
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
}

impl Filter {
    /// Parse a filter expression.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let text = input.trim().to_string();
        let mut parser = Parser {
            input: text.as_bytes(),
            pos: 0,
            original: &text,
        };
        let node = parser.parse_node()?;
        parser.skip_whitespace();
        if parser.pos != parser.input.len() {
            return Err(FilterError::Invalid(text));
        }
        Ok(Self { text, node })
    }

    /// Evaluate this filter against the resolution environment.
    pub fn matches(&self, env: &Environment) -> bool {
        self.node.matches(env)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Node {
    fn matches(&self, env: &Environment) -> bool {
        match self {
            Node::Equals(key, value) => env.get(key) == Some(value.as_str()),
            Node::Present(key) => env.get(key).is_some(),
            Node::And(children) => children.iter().all(|c| c.matches(env)),
            Node::Or(children) => children.iter().any(|c| c.matches(env)),
            Node::Not(child) => !child.matches(env),
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    original: &'a str,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn invalid(&self) -> FilterError {
        FilterError::Invalid(self.original.to_string())
    }

    fn expect(&mut self, byte: u8) -> Result<(), FilterError> {
        self.skip_whitespace();
        if self.pos < self.input.len() && self.input[self.pos] == byte {
            self.pos += 1;
            Ok(())
        } else if byte == b')' {
            Err(FilterError::Unbalanced(self.original.to_string()))
        } else {
            Err(self.invalid())
        }
    }

    fn parse_node(&mut self) -> Result<Node, FilterError> {
        self.expect(b'(')?;
        self.skip_whitespace();
        let node = match self.input.get(self.pos) {
            Some(b'&') => {
                self.pos += 1;
                Node::And(self.parse_children()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Node::Or(self.parse_children()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Node::Not(Box::new(self.parse_node()?))
            }
            Some(_) => self.parse_comparison()?,
            None => return Err(FilterError::Unbalanced(self.original.to_string())),
        };
        self.expect(b')')?;
        Ok(node)
    }

    fn parse_children(&mut self) -> Result<Vec<Node>, FilterError> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.input.get(self.pos) {
                Some(b'(') => children.push(self.parse_node()?),
                Some(b')') => break,
                _ => return Err(self.invalid()),
            }
        }
        if children.is_empty() {
            return Err(self.invalid());
        }
        Ok(children)
    }

    fn parse_comparison(&mut self) -> Result<Node, FilterError> {
        let start = self.pos;
        while self.pos < self.input.len() && !matches!(self.input[self.pos], b'=' | b'(' | b')') {
            self.pos += 1;
        }
        if self.input.get(self.pos) != Some(&b'=') {
            return Err(self.invalid());
        }
        let key = self.original[start..self.pos].trim().to_string();
        if key.is_empty() {
            return Err(self.invalid());
        }
        self.pos += 1;

        let value_start = self.pos;
        while self.pos < self.input.len() && !matches!(self.input[self.pos], b'(' | b')') {
            self.pos += 1;
        }
        let value = self.original[value_start..self.pos].to_string();

        if value == "*" {
            Ok(Node::Present(key))
        } else {
            Ok(Node::Equals(key, value))
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl TryFrom<String> for Filter {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Filter::parse(&value)
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.text
    }
}
