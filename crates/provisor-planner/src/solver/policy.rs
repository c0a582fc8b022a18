use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::metadata::ComponentKey;

use super::pool::{Pool, VariableId};

/// Policy for ordering candidate components when several can satisfy a
/// requirement: which one the search tries first.
///
/// The default order implements the optimization objective: keep what is
/// already installed (minimal churn), then prefer the higher version, then
/// fall back to `(id, version)` ascending pool order, which makes every
/// resolution deterministic. Both preferences are configurable rather than
/// hard-coded.
#[derive(Debug, Clone)]
pub struct Policy {
    pub prefer_installed: bool,
    pub prefer_lowest: bool,
}

impl Policy {
    pub fn new() -> Self {
        Self {
            prefer_installed: true,
            prefer_lowest: false,
        }
    }

    pub fn prefer_installed(mut self, prefer: bool) -> Self {
        self.prefer_installed = prefer;
        self
    }

    /// Prefer lowest versions (for testing downgrades and minimal states)
    pub fn prefer_lowest(mut self, prefer: bool) -> Self {
        self.prefer_lowest = prefer;
        self
    }

    /// Sort candidates by preference, best first.
    pub fn sort_candidates(
        &self,
        pool: &Pool,
        installed: &BTreeSet<ComponentKey>,
        candidates: &[VariableId],
    ) -> Vec<VariableId> {
        let mut sorted: Vec<VariableId> = candidates.to_vec();
        sorted.sort_by(|&a, &b| self.compare(pool, installed, a, b));
        sorted
    }

    fn compare(
        &self,
        pool: &Pool,
        installed: &BTreeSet<ComponentKey>,
        a: VariableId,
        b: VariableId,
    ) -> Ordering {
        let (Some(ca), Some(cb)) = (pool.component(a), pool.component(b)) else {
            return a.cmp(&b);
        };

        if self.prefer_installed {
            let a_installed = installed.contains(&ca.key());
            let b_installed = installed.contains(&cb.key());
            if a_installed != b_installed {
                return if a_installed {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
        }

        if ca.id() == cb.id() {
            let version_cmp = ca.version().cmp(cb.version());
            let preferred = if self.prefer_lowest {
                version_cmp
            } else {
                version_cmp.reverse()
            };
            if preferred != Ordering::Equal {
                return preferred;
            }
        }

        // Pool insertion order, which is (id, version) ascending
        a.cmp(&b)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}
