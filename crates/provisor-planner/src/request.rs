//! The change request: desired installs, removals, and property changes
//! relative to a profile.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::metadata::{Component, ComponentKey};

/// A delta of desired installs and removals relative to a profile.
///
/// Added and removed components are the roots of the resolution: additions
/// are mandatory roots, removals force the component out of the next state.
/// Property changes travel through the resulting plan into the successor
/// profile. Insertion order is preserved for property changes; roots are
/// resolved in `(id, version)` order regardless of insertion order.
#[derive(Debug, Clone, Default)]
pub struct ChangeRequest {
    additions: Vec<Arc<Component>>,
    removals: Vec<Arc<Component>>,
    property_changes: IndexMap<String, Option<String>>,
}

impl ChangeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request installation of a component as a mandatory root.
    pub fn install(&mut self, component: Arc<Component>) -> &mut Self {
        if !self.additions.iter().any(|c| c.key() == component.key()) {
            self.additions.push(component);
        }
        self
    }

    /// Request removal of an installed component.
    pub fn remove(&mut self, component: Arc<Component>) -> &mut Self {
        if !self.removals.iter().any(|c| c.key() == component.key()) {
            self.removals.push(component);
        }
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.property_changes
            .insert(key.into(), Some(value.into()));
        self
    }

    pub fn remove_property(&mut self, key: impl Into<String>) -> &mut Self {
        self.property_changes.insert(key.into(), None);
        self
    }

    pub fn additions(&self) -> &[Arc<Component>] {
        &self.additions
    }

    pub fn removals(&self) -> &[Arc<Component>] {
        &self.removals
    }

    pub fn property_changes(&self) -> &IndexMap<String, Option<String>> {
        &self.property_changes
    }

    pub fn is_addition(&self, key: &ComponentKey) -> bool {
        self.additions.iter().any(|c| &c.key() == key)
    }

    pub fn is_removal(&self, key: &ComponentKey) -> bool {
        self.removals.iter().any(|c| &c.key() == key)
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty() && self.property_changes.is_empty()
    }
}
