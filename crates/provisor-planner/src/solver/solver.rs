//! The resolution search: complete boolean satisfiability over the pool's
//! rules with chronological backtracking, plus root relaxation so one
//! conflicting root never fails the whole request.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::catalog::Catalog;
use crate::error::{PlannerError, Result};
use crate::metadata::{Component, ComponentKey, Environment};
use crate::plan::{RootConflict, Warning};
use crate::profile::Profile;
use crate::request::ChangeRequest;

use super::decisions::Decisions;
use super::policy::Policy;
use super::pool::{Pool, VariableId};
use super::problem::explain_root;
use super::rule::{Literal, RuleSet, RuleType};
use super::rule_generator::RuleGenerator;

/// Safety valve for the main search loop.
const MAX_ITERATIONS: usize = 1_000_000;

/// An open decision point: the alternatives not yet tried at `level`.
#[derive(Debug)]
struct Branch {
    level: u32,
    alternatives: Vec<Literal>,
}

/// Outcome of a resolution: the selected components plus the per-root
/// bookkeeping the plan synthesizer turns into a `RequestStatus`.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub selected: Vec<Arc<Component>>,
    pub satisfied_roots: Vec<ComponentKey>,
    pub conflicts: Vec<RootConflict>,
    pub warnings: Vec<Warning>,
}

/// One resolution over an immutable catalog, profile and change request.
pub struct Solver<'a> {
    catalog: &'a dyn Catalog,
    env: &'a Environment,
    policy: Policy,
    pool: Pool,
    rules: RuleSet,
    installed: BTreeSet<ComponentKey>,
    removed: BTreeSet<ComponentKey>,
    keep_roots: Vec<VariableId>,
    add_roots: Vec<VariableId>,
}

impl<'a> Solver<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        profile: &'a Profile,
        request: &'a ChangeRequest,
        env: &'a Environment,
        policy: Policy,
    ) -> Self {
        let pool = Pool::build(catalog, profile, request, env);
        let rules = RuleGenerator::new(&pool, env).generate(request);

        let installed: BTreeSet<ComponentKey> =
            profile.installed().map(|c| c.key()).collect();
        let removed: BTreeSet<ComponentKey> = request
            .removals()
            .iter()
            .map(|c| c.key())
            .filter(|key| !request.is_addition(key))
            .collect();

        // Installed components not being removed should stay selected;
        // requested additions must become selected. Both are roots the
        // relaxation loop may drop one by one, keeps before adds.
        let mut keep_roots: Vec<VariableId> = profile
            .installed()
            .filter(|c| !removed.contains(&c.key()))
            .filter_map(|c| pool.var(&c.key()))
            .collect();
        keep_roots.sort_unstable();

        let mut add_roots: Vec<VariableId> = request
            .additions()
            .iter()
            .filter_map(|c| pool.var(&c.key()))
            .filter(|var| !keep_roots.contains(var))
            .collect();
        add_roots.sort_unstable();
        add_roots.dedup();

        Self {
            catalog,
            env,
            policy,
            pool,
            rules,
            installed,
            removed,
            keep_roots,
            add_roots,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn solve(&self, cancel: &CancelToken) -> Result<Resolution> {
        let all_roots: Vec<VariableId> = self
            .keep_roots
            .iter()
            .chain(self.add_roots.iter())
            .copied()
            .collect();

        let (accepted_roots, decisions) = match self.search(&all_roots, cancel)? {
            Some(decisions) => (all_roots.clone(), decisions),
            None => self.relax_roots(&all_roots, cancel)?,
        };

        let decisions = self.extend_greedy_extras(decisions, cancel)?;

        let selected: Vec<Arc<Component>> = self
            .pool
            .vars()
            .filter(|&var| decisions.decided_true(var))
            .filter_map(|var| self.pool.component(var).cloned())
            .collect();
        let selected_keys: BTreeSet<ComponentKey> = selected.iter().map(|c| c.key()).collect();

        let satisfied_roots: Vec<ComponentKey> = accepted_roots
            .iter()
            .filter_map(|&var| self.pool.component(var).map(|c| c.key()))
            .collect();

        let conflicts: Vec<RootConflict> = all_roots
            .iter()
            .copied()
            .filter(|var| !accepted_roots.contains(var))
            .filter_map(|var| self.pool.component(var))
            .map(|component| RootConflict {
                root: component.key(),
                problem: explain_root(
                    self.catalog,
                    self.env,
                    component,
                    &self.removed,
                    &selected_keys,
                ),
            })
            .collect();

        let warnings = self.collect_warnings(&selected);

        log::info!(
            "Resolved: {} selected, {} satisfied root(s), {} conflict(s), {} warning(s)",
            selected.len(),
            satisfied_roots.len(),
            conflicts.len(),
            warnings.len()
        );

        Ok(Resolution {
            selected,
            satisfied_roots,
            conflicts,
            warnings,
        })
    }

    /// The all-roots attempt failed: re-admit roots one at a time, keeps
    /// before adds, so independent satisfiable roots still succeed. Roots
    /// that cannot join the accepted set become conflicts.
    ///
    /// Re-admission order matters: a root accepted early can exclude a
    /// larger set of later roots. After the first pass, every dropped root
    /// gets one retry at the front of the order, and the order satisfying
    /// the most roots wins.
    fn relax_roots(
        &self,
        all_roots: &[VariableId],
        cancel: &CancelToken,
    ) -> Result<(Vec<VariableId>, Decisions)> {
        let (mut accepted, mut best) = self.relax_in_order(all_roots, cancel)?;

        let dropped: Vec<VariableId> = all_roots
            .iter()
            .copied()
            .filter(|var| !accepted.contains(var))
            .collect();
        for &promoted in &dropped {
            let mut order: Vec<VariableId> = Vec::with_capacity(all_roots.len());
            order.push(promoted);
            order.extend(all_roots.iter().copied().filter(|&var| var != promoted));
            let (alt_accepted, alt_best) = self.relax_in_order(&order, cancel)?;
            if alt_accepted.len() > accepted.len() {
                accepted = alt_accepted;
                best = alt_best;
            }
        }

        let decisions = match best {
            Some(decisions) => decisions,
            // Even the empty root set must pass removal rules
            None => self
                .search(&[], cancel)?
                .unwrap_or_else(|| Decisions::new(self.pool.len())),
        };
        accepted.sort_unstable();
        Ok((accepted, decisions))
    }

    /// One greedy relaxation pass over a fixed root order.
    fn relax_in_order(
        &self,
        roots: &[VariableId],
        cancel: &CancelToken,
    ) -> Result<(Vec<VariableId>, Option<Decisions>)> {
        let mut accepted: Vec<VariableId> = Vec::new();
        let mut best: Option<Decisions> = None;

        for &root in roots {
            if cancel.is_cancelled() {
                return Err(PlannerError::Cancelled);
            }
            let mut attempt = accepted.clone();
            attempt.push(root);
            match self.search(&attempt, cancel)? {
                Some(decisions) => {
                    accepted.push(root);
                    best = Some(decisions);
                }
                None => {
                    log::debug!(
                        "Root {} dropped as unsatisfiable",
                        self.pool
                            .component(root)
                            .map(|c| c.to_string())
                            .unwrap_or_default()
                    );
                }
            }
        }
        Ok((accepted, best))
    }

    /// One complete search attempt for a fixed root set. `Ok(None)` means
    /// unsatisfiable.
    fn search(&self, roots: &[VariableId], cancel: &CancelToken) -> Result<Option<Decisions>> {
        let mut decisions = Decisions::new(self.pool.len());
        decisions.increment_level();

        // Assert removals first so a removed root fails fast
        for rule in self.rules.iter() {
            if rule.rule_type() == RuleType::Remove {
                let literal = rule.literals()[0];
                if decisions.conflicts(literal) {
                    return Ok(None);
                }
                if !decisions.satisfied(literal) {
                    decisions.decide(literal, Some(rule.id()));
                }
            }
        }
        for &root in roots {
            if decisions.conflicts(root) {
                return Ok(None);
            }
            if !decisions.satisfied(root) {
                decisions.decide(root, None);
            }
        }
        if !self.propagate(&mut decisions) {
            return Ok(None);
        }

        let mut branches: Vec<Branch> = Vec::new();

        for _ in 0..MAX_ITERATIONS {
            if cancel.is_cancelled() {
                return Err(PlannerError::Cancelled);
            }

            match self.find_branch(&decisions) {
                Some((rule_id, candidates)) => {
                    let level = decisions.increment_level();
                    let first = candidates[0];
                    let rest: Vec<Literal> = candidates[1..].to_vec();
                    if !rest.is_empty() {
                        branches.push(Branch {
                            level,
                            alternatives: rest,
                        });
                    }
                    decisions.decide(first, Some(rule_id));
                    if !self.propagate(&mut decisions)
                        && !self.backtrack(&mut decisions, &mut branches)
                    {
                        return Ok(None);
                    }
                }
                None => {
                    if self.final_check(&decisions) {
                        return Ok(Some(decisions));
                    }
                    if !self.backtrack(&mut decisions, &mut branches) {
                        return Ok(None);
                    }
                }
            }
        }
        log::error!("Search aborted after {} iterations", MAX_ITERATIONS);
        Ok(None)
    }

    /// Unit propagation to fixpoint by rule scanning. Returns false on a
    /// violated rule. Non-greedy rules never propagate a positive literal:
    /// they constrain but never pull a provider in.
    fn propagate(&self, decisions: &mut Decisions) -> bool {
        loop {
            let mut changed = false;
            for rule in self.rules.iter() {
                if rule
                    .literals()
                    .iter()
                    .any(|&literal| decisions.satisfied(literal))
                {
                    continue;
                }
                let undecided: Vec<Literal> = rule
                    .literals()
                    .iter()
                    .copied()
                    .filter(|&literal| decisions.undecided(literal.abs()))
                    .collect();
                match undecided.as_slice() {
                    [] => return false,
                    [unit] => {
                        if *unit > 0 && !rule.is_greedy() {
                            continue;
                        }
                        decisions.decide(*unit, Some(rule.id()));
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// The next open decision: the first unsatisfied greedy requirement
    /// whose owner is selected, with its undecided providers in policy
    /// preference order.
    fn find_branch(&self, decisions: &Decisions) -> Option<(usize, Vec<Literal>)> {
        for rule in self.rules.iter() {
            if rule.rule_type() != RuleType::Requires || !rule.is_greedy() {
                continue;
            }
            if rule
                .literals()
                .iter()
                .any(|&literal| decisions.satisfied(literal))
            {
                continue;
            }
            let Some(source) = rule.source() else {
                continue;
            };
            if !decisions.decided_true(source) {
                continue;
            }
            let undecided: Vec<VariableId> = rule
                .literals()
                .iter()
                .copied()
                .filter(|&literal| literal > 0 && decisions.undecided(literal))
                .collect();
            if undecided.is_empty() {
                continue;
            }
            let sorted = self
                .policy
                .sort_candidates(&self.pool, &self.installed, &undecided);
            return Some((rule.id(), sorted));
        }
        None
    }

    /// All rules satisfied with undecided variables read as false.
    fn final_check(&self, decisions: &Decisions) -> bool {
        self.rules.iter().all(|rule| {
            rule.literals().iter().any(|&literal| {
                decisions.satisfied(literal) || (literal < 0 && decisions.undecided(-literal))
            })
        })
    }

    /// Take the next untried alternative of the deepest open branch.
    /// Returns false when every branch is exhausted.
    fn backtrack(&self, decisions: &mut Decisions, branches: &mut Vec<Branch>) -> bool {
        while let Some(mut branch) = branches.pop() {
            decisions.revert_to_level(branch.level - 1);
            let literal = branch.alternatives.remove(0);
            decisions.increment_level();
            if !branch.alternatives.is_empty() {
                branches.push(branch);
            }
            decisions.decide(literal, None);
            if self.propagate(decisions) {
                return true;
            }
        }
        false
    }

    /// Post-search phase for optional-greedy and `multiple` requirements:
    /// try to pull each candidate in on top of the accepted roots, adopting
    /// every attempt that stays satisfiable. Failures here never conflict.
    fn extend_greedy_extras(
        &self,
        decisions: Decisions,
        cancel: &CancelToken,
    ) -> Result<Decisions> {
        let mut current = decisions;
        let mut worklist: VecDeque<VariableId> =
            self.pool.vars().filter(|&v| current.decided_true(v)).collect();
        let mut processed: BTreeSet<VariableId> = BTreeSet::new();

        while let Some(var) = worklist.pop_front() {
            if !processed.insert(var) {
                continue;
            }
            let Some(component) = self.pool.component(var) else {
                continue;
            };
            for requirement in component.required() {
                if !requirement.is_greedy() {
                    continue;
                }
                if !requirement.is_optional() && !requirement.is_multiple() {
                    continue;
                }

                let candidates = self.policy.sort_candidates(
                    &self.pool,
                    &self.installed,
                    &self.pool.candidates_for(requirement, self.env),
                );
                let already_satisfied = candidates
                    .iter()
                    .any(|&candidate| current.decided_true(candidate));
                if already_satisfied && !requirement.is_multiple() {
                    continue;
                }

                for candidate in candidates {
                    if cancel.is_cancelled() {
                        return Err(PlannerError::Cancelled);
                    }
                    if current.decided_true(candidate) {
                        continue;
                    }
                    // Freeze everything selected so far and try to add the
                    // candidate on top
                    let mut attempt: Vec<VariableId> = self
                        .pool
                        .vars()
                        .filter(|&v| current.decided_true(v))
                        .collect();
                    attempt.push(candidate);
                    if let Some(next) = self.search(&attempt, cancel)? {
                        for newly in self.pool.vars() {
                            if next.decided_true(newly) && !current.decided_true(newly) {
                                worklist.push_back(newly);
                            }
                        }
                        current = next;
                        if !requirement.is_multiple() {
                            break;
                        }
                    }
                }
            }
        }
        Ok(current)
    }

    /// Optional requirements still unmet in the final selection. The owning
    /// component stays selected regardless.
    fn collect_warnings(&self, selected: &[Arc<Component>]) -> Vec<Warning> {
        let mut warnings = Vec::new();
        for component in selected {
            for requirement in component.required() {
                if !requirement.is_optional() {
                    continue;
                }
                // A filter-gated requirement that does not apply in this
                // environment is not unmet
                if !requirement.filter_matches(self.env) {
                    continue;
                }
                let met = selected
                    .iter()
                    .any(|provider| provider.satisfies(requirement, self.env));
                if !met {
                    warnings.push(Warning {
                        component: component.key(),
                        requirement: requirement.clone(),
                    });
                }
            }
        }
        warnings
    }
}
