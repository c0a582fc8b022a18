use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{candidates, Catalog};
use crate::metadata::{Component, ComponentKey, Environment, Requirement};
use crate::profile::Profile;
use crate::request::ChangeRequest;

/// A boolean decision variable: positive index into the pool. The sign
/// carries polarity when used as a literal.
pub type VariableId = i32;

/// The set of components a resolution may decide about, one variable per
/// distinct `(id, version)`.
///
/// Built by transitive closure of greedy requirements from the components
/// already installed (and not being removed) and the requested additions;
/// components only reachable through non-greedy requirements are never
/// considered. Variables are numbered `1..=len` in `(id, version)`
/// ascending order, which fixes the tie-break order of the whole search.
#[derive(Debug, Clone)]
pub struct Pool {
    components: Vec<Arc<Component>>,
    by_key: BTreeMap<ComponentKey, VariableId>,
}

impl Pool {
    /// Build the pool for one resolution.
    pub fn build(
        catalog: &dyn Catalog,
        profile: &Profile,
        request: &ChangeRequest,
        env: &Environment,
    ) -> Self {
        let mut reached: BTreeMap<ComponentKey, Arc<Component>> = BTreeMap::new();
        let mut worklist: Vec<Arc<Component>> = Vec::new();

        let seed = |component: &Arc<Component>,
                        reached: &mut BTreeMap<ComponentKey, Arc<Component>>,
                        worklist: &mut Vec<Arc<Component>>| {
            if reached.insert(component.key(), component.clone()).is_none() {
                worklist.push(component.clone());
            }
        };

        for component in profile.installed() {
            if !request.is_removal(&component.key()) {
                seed(component, &mut reached, &mut worklist);
            }
        }
        for component in request.additions() {
            seed(component, &mut reached, &mut worklist);
        }

        while let Some(component) = worklist.pop() {
            for requirement in component.required() {
                if !requirement.is_greedy() {
                    continue;
                }
                for candidate in candidates(catalog, requirement, env) {
                    seed(&candidate, &mut reached, &mut worklist);
                }
            }
        }

        let components: Vec<Arc<Component>> = reached.into_values().collect();
        let by_key = components
            .iter()
            .enumerate()
            .map(|(index, c)| (c.key(), (index + 1) as VariableId))
            .collect();

        log::debug!("Built pool with {} reachable components", components.len());

        Self { components, by_key }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, variable: VariableId) -> Option<&Arc<Component>> {
        self.components.get((variable - 1) as usize)
    }

    pub fn var(&self, key: &ComponentKey) -> Option<VariableId> {
        self.by_key.get(key).copied()
    }

    /// All variables in ascending `(id, version)` order.
    pub fn vars(&self) -> impl Iterator<Item = VariableId> {
        1..=self.components.len() as VariableId
    }

    /// Pool variables whose component satisfies the requirement, ascending.
    pub fn candidates_for(&self, requirement: &Requirement, env: &Environment) -> Vec<VariableId> {
        if !requirement.filter_matches(env) {
            return Vec::new();
        }
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.satisfies(requirement, env))
            .map(|(index, _)| (index + 1) as VariableId)
            .collect()
    }

    /// Variables grouped by component id, ascending within each group.
    pub fn vars_by_id(&self) -> BTreeMap<&str, Vec<VariableId>> {
        let mut groups: BTreeMap<&str, Vec<VariableId>> = BTreeMap::new();
        for (index, component) in self.components.iter().enumerate() {
            groups
                .entry(component.id())
                .or_default()
                .push((index + 1) as VariableId);
        }
        groups
    }
}
