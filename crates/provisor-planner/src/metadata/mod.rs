//! The component metadata vocabulary: capabilities, requirements,
//! environment filters, and the installable component itself.

mod capability;
mod component;
mod filter;
mod requirement;

use std::collections::BTreeMap;

use thiserror::Error;

pub use capability::{Capability, NAMESPACE_ID};
pub use component::{Component, ComponentBuilder, ComponentKey};
pub use filter::{Filter, FilterError};
pub use requirement::Requirement;

/// Error type for metadata construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Namespace \"{0}\" is reserved for component identities")]
    ReservedNamespace(String),
}

/// The resolution-time property map that requirement filters evaluate
/// against. Built from the profile properties with the change request's
/// property changes folded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    properties: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn unset(&mut self, key: &str) {
        self.properties.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.properties.iter()
    }
}
