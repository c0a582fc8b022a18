//! The installation state: an immutable snapshot of installed components.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::metadata::{Component, ComponentKey, Environment};
use crate::plan::{Operand, Plan};

/// The current set of installed components plus profile-level properties.
///
/// A profile is never mutated in place; applying a plan produces the next
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    installed: BTreeMap<ComponentKey, Arc<Component>>,
    properties: BTreeMap<String, String>,
}

impl Profile {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, P, K, V>(installed: I, properties: P) -> Self
    where
        I: IntoIterator<Item = Arc<Component>>,
        P: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            installed: installed.into_iter().map(|c| (c.key(), c)).collect(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Installed components in `(id, version)` order.
    pub fn installed(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.installed.values()
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.installed.contains_key(key)
    }

    pub fn get(&self, key: &ComponentKey) -> Option<&Arc<Component>> {
        self.installed.get(key)
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// The environment this profile resolves in: its own properties.
    pub fn environment(&self) -> Environment {
        Environment::from_properties(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Produce the successor profile by applying a plan: uninstall operands
    /// drop entries, install operands add them, and the plan's property
    /// changes are folded in. Pure; `self` is untouched.
    pub fn apply(&self, plan: &Plan) -> Profile {
        let mut installed = self.installed.clone();
        for operand in plan.operands() {
            match operand {
                Operand::Uninstall(component) => {
                    installed.remove(&component.key());
                }
                Operand::Install(component) => {
                    installed.insert(component.key(), component.clone());
                }
            }
        }

        let mut properties = self.properties.clone();
        for (key, change) in plan.property_changes() {
            match change {
                Some(value) => {
                    properties.insert(key.clone(), value.clone());
                }
                None => {
                    properties.remove(key);
                }
            }
        }

        Profile {
            installed,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RequestStatus;
    use indexmap::IndexMap;
    use provisor_version::Version;

    fn unit(id: &str, version: &str) -> Arc<Component> {
        Arc::new(
            Component::builder(id, Version::parse(version).unwrap())
                .build()
                .unwrap(),
        )
    }

    fn plan_of(operands: Vec<Operand>) -> Plan {
        Plan::new(
            operands,
            IndexMap::new(),
            RequestStatus::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_apply_install_and_uninstall() {
        let old = unit("a", "1.0.0");
        let new = unit("a", "2.0.0");
        let profile = Profile::new([old.clone()], Vec::<(String, String)>::new());

        let plan = plan_of(vec![
            Operand::Uninstall(old.clone()),
            Operand::Install(new.clone()),
        ]);

        let next = profile.apply(&plan);
        assert!(!next.contains(&old.key()));
        assert!(next.contains(&new.key()));
        // The original snapshot is untouched
        assert!(profile.contains(&old.key()));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let a = unit("a", "1.0.0");
        let profile = Profile::empty();
        let plan = plan_of(vec![Operand::Install(a.clone())]);

        let once = profile.apply(&plan);
        let twice = once.apply(&plan);
        assert_eq!(once.len(), 1);
        assert_eq!(twice.len(), 1);
        assert!(twice.contains(&a.key()));
    }

    #[test]
    fn test_apply_property_changes() {
        let profile = Profile::new(Vec::new(), [("keep", "1"), ("drop", "2")]);

        let mut changes = IndexMap::new();
        changes.insert("drop".to_string(), None);
        changes.insert("add".to_string(), Some("3".to_string()));
        let plan = Plan::new(Vec::new(), changes, RequestStatus::default(), Vec::new());

        let next = profile.apply(&plan);
        assert_eq!(next.properties().get("keep").map(String::as_str), Some("1"));
        assert_eq!(next.properties().get("add").map(String::as_str), Some("3"));
        assert!(!next.properties().contains_key("drop"));
    }
}
