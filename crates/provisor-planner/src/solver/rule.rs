use std::fmt;

use crate::metadata::Requirement;

use super::pool::VariableId;

/// A literal in SAT terms - positive means "select", negative means
/// "do not select"
pub type Literal = i32;

/// Types of rules generated during resolution. Root and keep assertions
/// are not rules; the solver asserts them directly so it can relax them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// An explicitly requested removal: the variable is forced false
    Remove,
    /// Component requirement: if X is selected, one of its providers must be
    Requires,
    /// Two versions of a singleton id cannot both be selected
    Singleton,
}

/// A SAT rule (clause): a disjunction of literals, satisfied when at least
/// one literal is true.
///
/// # Examples
///
/// - `[A]` - component A must be selected (assertion)
/// - `[-A]` - component A must not be selected
/// - `[-A, B, C]` - if A is selected, then B or C must be selected
/// - `[-A, -B]` - A and B cannot both be selected (singleton exclusion)
#[derive(Debug, Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    id: usize,
    /// Source variable (for diagnostics)
    source: Option<VariableId>,
    /// Requirement this rule was generated from (for diagnostics)
    requirement: Option<Requirement>,
    /// Requires rules from non-greedy requirements are constraints only:
    /// the search never branches on them to pull a provider in
    greedy: bool,
}

impl Rule {
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            source: None,
            requirement: None,
            greedy: true,
        }
    }

    /// Requirement rule: if `source` is selected, one of `targets` must be.
    pub fn requires(source: VariableId, targets: Vec<VariableId>, requirement: Requirement) -> Self {
        let greedy = requirement.is_greedy();
        let mut literals = vec![-source];
        literals.extend(targets);
        let mut rule = Self::new(literals, RuleType::Requires);
        rule.source = Some(source);
        rule.greedy = greedy;
        rule.requirement = Some(requirement);
        rule
    }

    /// Singleton exclusion: `a` and `b` cannot both be selected.
    pub fn singleton(a: VariableId, b: VariableId) -> Self {
        Self::new(vec![-a, -b], RuleType::Singleton)
    }

    /// Removal assertion: the variable must not be selected.
    pub fn remove(variable: VariableId) -> Self {
        Self::new(vec![-variable], RuleType::Remove)
    }

    pub fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn source(&self) -> Option<VariableId> {
        self.source
    }

    pub fn requirement(&self) -> Option<&Requirement> {
        self.requirement.as_ref()
    }

    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| {
                if l > 0 {
                    format!("+{}", l)
                } else {
                    format!("{}", l)
                }
            })
            .collect();
        write!(f, "({}) [{}]", self.rule_type_str(), literals.join(" | "))
    }
}

impl Rule {
    fn rule_type_str(&self) -> &'static str {
        match self.rule_type {
            RuleType::Remove => "remove",
            RuleType::Requires => "requires",
            RuleType::Singleton => "singleton",
        }
    }
}

/// The set of rules for one resolution, with stable ids.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut rule: Rule) -> usize {
        let id = self.rules.len();
        rule.set_id(id);
        self.rules.push(rule);
        id
    }

    pub fn get(&self, id: usize) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
