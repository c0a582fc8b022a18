//! The resolved plan: an ordered sequence of install/uninstall operands
//! plus the per-root request status.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::metadata::{Component, ComponentKey, Environment, Requirement};
use crate::profile::Profile;
use crate::solver::Problem;

/// A single step of a plan, consumed in order by the execution engine.
#[derive(Debug, Clone, Serialize)]
pub enum Operand {
    Uninstall(Arc<Component>),
    Install(Arc<Component>),
}

impl Operand {
    pub fn component(&self) -> &Arc<Component> {
        match self {
            Operand::Uninstall(c) | Operand::Install(c) => c,
        }
    }
}

/// A requested root that could not be satisfied, with its explanation.
#[derive(Debug, Clone, Serialize)]
pub struct RootConflict {
    pub root: ComponentKey,
    pub problem: Problem,
}

/// An unmet optional requirement. Never a conflict; the owning component
/// stays selectable.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub component: ComponentKey,
    pub requirement: Requirement,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has an unsatisfied optional requirement on {}",
            self.component, self.requirement
        )
    }
}

/// Per-root outcome of a change request: which explicitly requested
/// components were satisfied, and which conflict with the already
/// installed roots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestStatus {
    satisfied: Vec<ComponentKey>,
    conflicts: Vec<RootConflict>,
}

impl RequestStatus {
    pub fn new(satisfied: Vec<ComponentKey>, conflicts: Vec<RootConflict>) -> Self {
        Self {
            satisfied,
            conflicts,
        }
    }

    pub fn satisfied(&self) -> &[ComponentKey] {
        &self.satisfied
    }

    pub fn conflicts(&self) -> &[RootConflict] {
        &self.conflicts
    }

    pub fn is_satisfied(&self, key: &ComponentKey) -> bool {
        self.satisfied.contains(key)
    }

    pub fn is_conflict(&self, key: &ComponentKey) -> bool {
        self.conflicts.iter().any(|c| &c.root == key)
    }

    /// Keys of the requested components that conflict with installed roots.
    pub fn conflicts_with_installed_roots(&self) -> impl Iterator<Item = &ComponentKey> {
        self.conflicts.iter().map(|c| &c.root)
    }
}

/// An ordered sequence of operands realizing a resolved selection,
/// together with the request status and optional-requirement warnings.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    operands: Vec<Operand>,
    property_changes: IndexMap<String, Option<String>>,
    status: RequestStatus,
    warnings: Vec<Warning>,
}

impl Plan {
    pub fn new(
        operands: Vec<Operand>,
        property_changes: IndexMap<String, Option<String>>,
        status: RequestStatus,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            operands,
            property_changes,
            status,
            warnings,
        }
    }

    /// Diff a resolved selection against the profile's installed set.
    ///
    /// Installed-but-not-selected components become uninstalls,
    /// selected-but-not-installed become installs. All uninstalls precede
    /// all installs, so a replaced version is always gone before its
    /// replacement arrives. Uninstalls run dependents-first and installs
    /// dependencies-first, so no intermediate state holds a component whose
    /// provider is absent.
    pub fn synthesize(
        profile: &Profile,
        selection: &[Arc<Component>],
        property_changes: IndexMap<String, Option<String>>,
        status: RequestStatus,
        warnings: Vec<Warning>,
        env: &Environment,
    ) -> Self {
        let selected_keys: BTreeSet<ComponentKey> = selection.iter().map(|c| c.key()).collect();

        let uninstalls: Vec<Arc<Component>> = profile
            .installed()
            .filter(|c| !selected_keys.contains(&c.key()))
            .cloned()
            .collect();

        let mut operands: Vec<Operand> = sort_by_dependencies(uninstalls, env)
            .into_iter()
            .rev()
            .map(Operand::Uninstall)
            .collect();

        let installs: Vec<Arc<Component>> = selection
            .iter()
            .filter(|c| !profile.contains(&c.key()))
            .cloned()
            .collect();

        operands.extend(
            sort_by_dependencies(installs, env)
                .into_iter()
                .map(Operand::Install),
        );

        Self::new(operands, property_changes, status, warnings)
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn property_changes(&self) -> &IndexMap<String, Option<String>> {
        &self.property_changes
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty() && self.property_changes.is_empty()
    }

    pub fn installs(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.operands.iter().filter_map(|op| match op {
            Operand::Install(c) => Some(c),
            _ => None,
        })
    }

    pub fn uninstalls(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.operands.iter().filter_map(|op| match op {
            Operand::Uninstall(c) => Some(c),
            _ => None,
        })
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            installs: self.installs().count(),
            uninstalls: self.uninstalls().count(),
            conflicts: self.status.conflicts().len(),
        }
    }
}

/// Summary of a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub installs: usize,
    pub uninstalls: usize,
    pub conflicts: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.installs > 0 {
            parts.push(format!("{} install(s)", self.installs));
        }
        if self.uninstalls > 0 {
            parts.push(format!("{} removal(s)", self.uninstalls));
        }
        if self.conflicts > 0 {
            parts.push(format!("{} conflict(s)", self.conflicts));
        }
        if parts.is_empty() {
            write!(f, "Nothing to do")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Topological order over "is required by" edges restricted to the given
/// components: providers before their dependents. Kahn's algorithm; on a
/// cycle the remaining components are appended in `(id, version)` order.
fn sort_by_dependencies(
    mut components: Vec<Arc<Component>>,
    env: &Environment,
) -> Vec<Arc<Component>> {
    if components.len() <= 1 {
        return components;
    }

    // Deterministic base order before the topological pass
    components.sort_by_key(|c| c.key());

    let mut in_degree: Vec<usize> = vec![0; components.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); components.len()];

    for (idx, component) in components.iter().enumerate() {
        for requirement in component.required() {
            for (provider_idx, provider) in components.iter().enumerate() {
                if provider_idx == idx {
                    continue;
                }
                if provider.satisfies(requirement, env) {
                    dependents[provider_idx].push(idx);
                    in_degree[idx] += 1;
                }
            }
        }
    }

    let mut queue: VecDeque<usize> = VecDeque::new();
    for (idx, &degree) in in_degree.iter().enumerate() {
        if degree == 0 {
            queue.push_back(idx);
        }
    }

    let mut order: Vec<usize> = Vec::with_capacity(components.len());
    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    // Requirement cycles land here; append what is left
    if order.len() != components.len() {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        for idx in 0..components.len() {
            if !placed.contains(&idx) {
                order.push(idx);
            }
        }
    }

    let by_index: BTreeMap<usize, Arc<Component>> = components.into_iter().enumerate().collect();
    order
        .into_iter()
        .map(|idx| by_index[&idx].clone())
        .collect()
}
