//! Conflict explanations: why a requested root could not be satisfied.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use provisor_version::{Version, VersionRange};

use crate::catalog::Catalog;
use crate::metadata::{Component, ComponentKey, Environment, Requirement};

/// Why a requirement along a root's dependency chain could not be met.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictReason {
    /// No provider for the capability exists in the catalog at all.
    MissingCapability { requirement: Requirement },
    /// Providers exist, but none inside the range can be selected, for
    /// example because a singleton collision locked in another version.
    VersionConflict {
        requirement: Requirement,
        available: Vec<Version>,
    },
    /// A provider exists but the requirement's filter excludes the
    /// resolution environment.
    FilterMismatch { requirement: Requirement },
    /// The only satisfying providers are marked for explicit removal.
    RemovalConflict {
        requirement: Requirement,
        removed: ComponentKey,
    },
}

impl ConflictReason {
    pub fn requirement(&self) -> &Requirement {
        match self {
            ConflictReason::MissingCapability { requirement }
            | ConflictReason::VersionConflict { requirement, .. }
            | ConflictReason::FilterMismatch { requirement }
            | ConflictReason::RemovalConflict { requirement, .. } => requirement,
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::MissingCapability { requirement } => {
                write!(f, "no component provides {}", requirement)
            }
            ConflictReason::VersionConflict {
                requirement,
                available,
            } => {
                let versions: Vec<String> = available.iter().map(Version::to_string).collect();
                write!(
                    f,
                    "no selectable component satisfies {} (available: {})",
                    requirement,
                    versions.join(", ")
                )
            }
            ConflictReason::FilterMismatch { requirement } => {
                write!(
                    f,
                    "{} is excluded by its filter in this environment",
                    requirement
                )
            }
            ConflictReason::RemovalConflict {
                requirement,
                removed,
            } => {
                write!(
                    f,
                    "{} is only satisfied by {}, which is marked for removal",
                    requirement, removed
                )
            }
        }
    }
}

/// A minimal justification for one conflicting root: the chain of components
/// leading from the root to the requirement that failed, and why it failed.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub root: ComponentKey,
    pub chain: Vec<ComponentKey>,
    pub reason: ConflictReason,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot satisfy {}", self.root)?;
        for step in self.chain.iter().skip(1) {
            write!(f, " -> {}", step)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Derive a justification for a root the search had to drop.
///
/// Walks non-optional requirements depth-first from the root and reports the
/// first requirement for which every provider fails, classified by the
/// reason taxonomy above. `removed` is the set of explicitly removed keys,
/// `selected` the keys the search managed to keep; both narrow "providers
/// exist" down to "providers were actually selectable".
pub fn explain_root(
    catalog: &dyn Catalog,
    env: &Environment,
    root: &Arc<Component>,
    removed: &BTreeSet<ComponentKey>,
    selected: &BTreeSet<ComponentKey>,
) -> Problem {
    let mut chain = vec![root.key()];
    let mut visited = BTreeSet::new();
    visited.insert(root.key());

    if let Some(reason) = explain_component(
        catalog,
        env,
        root,
        removed,
        selected,
        &mut chain,
        &mut visited,
    ) {
        return Problem {
            root: root.key(),
            chain,
            reason,
        };
    }

    // No failing requirement found along the chain: the root itself collides
    // with an already-selected version of its id
    let requirement = Requirement::on_id(root.id(), VersionRange::exact(root.version().clone()));
    let available: Vec<Version> = catalog
        .by_identity(root.id(), &VersionRange::any())
        .iter()
        .map(|c| c.version().clone())
        .collect();
    Problem {
        root: root.key(),
        chain: vec![root.key()],
        reason: ConflictReason::VersionConflict {
            requirement,
            available,
        },
    }
}

fn explain_component(
    catalog: &dyn Catalog,
    env: &Environment,
    component: &Arc<Component>,
    removed: &BTreeSet<ComponentKey>,
    selected: &BTreeSet<ComponentKey>,
    chain: &mut Vec<ComponentKey>,
    visited: &mut BTreeSet<ComponentKey>,
) -> Option<ConflictReason> {
    for requirement in component.required() {
        if requirement.is_optional() {
            continue;
        }

        let in_range = catalog.query(
            requirement.namespace(),
            requirement.name(),
            requirement.range(),
        );

        if !requirement.filter_matches(env) {
            if in_range.is_empty() {
                return Some(ConflictReason::MissingCapability {
                    requirement: requirement.clone(),
                });
            }
            return Some(ConflictReason::FilterMismatch {
                requirement: requirement.clone(),
            });
        }

        if in_range.is_empty() {
            let any = catalog.query(
                requirement.namespace(),
                requirement.name(),
                &VersionRange::any(),
            );
            if any.is_empty() {
                return Some(ConflictReason::MissingCapability {
                    requirement: requirement.clone(),
                });
            }
            return Some(ConflictReason::VersionConflict {
                requirement: requirement.clone(),
                available: any.iter().map(|c| c.version().clone()).collect(),
            });
        }

        // A selected provider settles the requirement
        if in_range.iter().any(|c| selected.contains(&c.key())) {
            continue;
        }

        // Non-greedy requirements cannot pull a provider in; with none
        // selected they are simply unsatisfiable
        if !requirement.is_greedy() {
            return Some(ConflictReason::VersionConflict {
                requirement: requirement.clone(),
                available: in_range.iter().map(|c| c.version().clone()).collect(),
            });
        }

        if in_range.iter().all(|c| removed.contains(&c.key())) {
            return Some(ConflictReason::RemovalConflict {
                requirement: requirement.clone(),
                removed: in_range[0].key(),
            });
        }

        let viable: Vec<&Arc<Component>> = in_range
            .iter()
            .filter(|c| !removed.contains(&c.key()) && !singleton_blocked(c, selected))
            .collect();

        if viable.is_empty() {
            return Some(ConflictReason::VersionConflict {
                requirement: requirement.clone(),
                available: in_range.iter().map(|c| c.version().clone()).collect(),
            });
        }

        // Every viable provider must itself be unsatisfiable for this
        // requirement to be the cause; report through the first one
        let mut first_failure = None;
        let mut all_fail = true;
        for provider in &viable {
            if !visited.insert(provider.key()) {
                continue;
            }
            chain.push(provider.key());
            match explain_component(catalog, env, provider, removed, selected, chain, visited) {
                Some(reason) => {
                    if first_failure.is_none() {
                        first_failure = Some((chain.clone(), reason));
                    }
                    chain.pop();
                }
                None => {
                    chain.pop();
                    all_fail = false;
                    break;
                }
            }
        }

        if all_fail {
            if let Some((failed_chain, reason)) = first_failure {
                *chain = failed_chain;
                return Some(reason);
            }
        }
    }
    None
}

/// Whether selecting this component would violate a singleton exclusion
/// against an already-selected version of the same id.
fn singleton_blocked(component: &Arc<Component>, selected: &BTreeSet<ComponentKey>) -> bool {
    if !component.is_singleton() {
        return false;
    }
    selected
        .iter()
        .any(|key| key.id == component.id() && &key.version != component.version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::metadata::Filter;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn r(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    fn explain(catalog: &MemoryCatalog, root: &Arc<Component>) -> Problem {
        explain_root(
            catalog,
            &Environment::new(),
            root,
            &BTreeSet::new(),
            &BTreeSet::new(),
        )
    }

    #[test]
    fn test_missing_capability() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("ghost", r("*")))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        let problem = explain(&catalog, &root);
        assert!(matches!(
            problem.reason,
            ConflictReason::MissingCapability { .. }
        ));
        assert_eq!(problem.chain, vec![root.key()]);
    }

    #[test]
    fn test_version_conflict_lists_available() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("lib", r("[3.0,4.0)")))
            .build()
            .unwrap();
        let lib = Component::builder("lib", v("1.0")).build().unwrap();
        let catalog = MemoryCatalog::from_components([app, lib]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        let problem = explain(&catalog, &root);
        match problem.reason {
            ConflictReason::VersionConflict { available, .. } => {
                assert_eq!(available, vec![v("1.0")]);
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_filter_mismatch() {
        let app = Component::builder("app", v("1.0"))
            .requires(
                Requirement::on_id("lib", r("*"))
                    .with_filter(Filter::parse("(osgi.os=win32)").unwrap()),
            )
            .build()
            .unwrap();
        let lib = Component::builder("lib", v("1.0")).build().unwrap();
        let catalog = MemoryCatalog::from_components([app, lib]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        let env = Environment::from_properties([("osgi.os", "linux")]);
        let problem = explain_root(&catalog, &env, &root, &BTreeSet::new(), &BTreeSet::new());
        assert!(matches!(
            problem.reason,
            ConflictReason::FilterMismatch { .. }
        ));
    }

    #[test]
    fn test_removal_conflict() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("lib", r("*")))
            .build()
            .unwrap();
        let lib = Component::builder("lib", v("1.0")).build().unwrap();
        let catalog = MemoryCatalog::from_components([app, lib]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        let removed: BTreeSet<ComponentKey> =
            [ComponentKey::new("lib", v("1.0"))].into_iter().collect();
        let problem = explain_root(
            &catalog,
            &Environment::new(),
            &root,
            &removed,
            &BTreeSet::new(),
        );
        match problem.reason {
            ConflictReason::RemovalConflict { removed, .. } => {
                assert_eq!(removed, ComponentKey::new("lib", v("1.0")));
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_transitive_chain() {
        // app -> lib -> ghost, ghost missing
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("lib", r("*")))
            .build()
            .unwrap();
        let lib = Component::builder("lib", v("1.0"))
            .requires(Requirement::on_id("ghost", r("*")))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app, lib]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        let problem = explain(&catalog, &root);
        assert_eq!(
            problem.chain,
            vec![
                ComponentKey::new("app", v("1.0")),
                ComponentKey::new("lib", v("1.0")),
            ]
        );
        assert!(matches!(
            problem.reason,
            ConflictReason::MissingCapability { .. }
        ));
    }

    #[test]
    fn test_optional_requirements_never_explain() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("ghost", r("*")).optional(true))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        // Falls through to the root-level fallback, never to the optional
        // requirement itself
        let problem = explain(&catalog, &root);
        match problem.reason {
            ConflictReason::VersionConflict { requirement, .. } => {
                assert_eq!(requirement.name(), "app");
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_singleton_collision_is_version_conflict() {
        let app = Component::builder("app", v("1.0"))
            .requires(Requirement::on_id("lib", r("[2.0,3.0)")))
            .build()
            .unwrap();
        let lib2 = Component::builder("lib", v("2.0"))
            .singleton(true)
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([app, lib2]);
        let root = catalog.by_identity("app", &r("*"))[0].clone();

        // lib 1.0 is already locked in elsewhere
        let selected: BTreeSet<ComponentKey> =
            [ComponentKey::new("lib", v("1.0"))].into_iter().collect();
        let problem = explain_root(
            &catalog,
            &Environment::new(),
            &root,
            &BTreeSet::new(),
            &selected,
        );
        assert!(matches!(
            problem.reason,
            ConflictReason::VersionConflict { .. }
        ));
    }
}
