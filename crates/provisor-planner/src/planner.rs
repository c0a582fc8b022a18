//! The planner facade: validates a change request, runs the solver and
//! synthesizes the resulting plan.

use crate::cancel::CancelToken;
use crate::catalog::Catalog;
use crate::error::{PlannerError, Result};
use crate::plan::{Plan, RequestStatus};
use crate::profile::Profile;
use crate::request::ChangeRequest;
use crate::solver::{Policy, Solver};
use provisor_version::VersionRange;

/// Resolves change requests against a catalog into provisioning plans.
///
/// The planner is stateless between calls; each resolution runs over the
/// immutable catalog, profile snapshot and request it is given, so
/// independent resolutions may run concurrently over the same inputs.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    policy: Policy,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self {
            catalog,
            policy: Policy::new(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve the request into a plan.
    ///
    /// Unsatisfiable roots never fail the call; they are reported in the
    /// plan's [`RequestStatus`] while the rest of the request still
    /// resolves. Only a malformed request or cooperative cancellation
    /// return an error.
    pub fn provisioning_plan(
        &self,
        profile: &Profile,
        request: &ChangeRequest,
        cancel: &CancelToken,
    ) -> Result<Plan> {
        self.validate(profile, request)?;

        // Filters evaluate against the profile properties with the
        // request's property changes already folded in
        let mut env = profile.environment();
        for (key, change) in request.property_changes() {
            match change {
                Some(value) => env.set(key, value),
                None => env.unset(key),
            }
        }
        let solver = Solver::new(self.catalog, profile, request, &env, self.policy.clone());
        let resolution = solver.solve(cancel)?;

        let status = RequestStatus::new(resolution.satisfied_roots, resolution.conflicts);
        let plan = Plan::synthesize(
            profile,
            &resolution.selected,
            request.property_changes().clone(),
            status,
            resolution.warnings,
            &env,
        );
        log::info!("Plan: {}", plan.summary());
        Ok(plan)
    }

    /// A request is malformed when an addition names a component the
    /// catalog does not know, or a removal names one that is not installed.
    fn validate(&self, profile: &Profile, request: &ChangeRequest) -> Result<()> {
        for component in request.additions() {
            let known = self
                .catalog
                .by_identity(component.id(), &VersionRange::exact(component.version().clone()))
                .iter()
                .any(|c| c.key() == component.key());
            if !known {
                return Err(PlannerError::malformed(format!(
                    "requested component {} is not in the catalog",
                    component
                )));
            }
        }
        for component in request.removals() {
            if !profile.contains(&component.key()) {
                return Err(PlannerError::malformed(format!(
                    "cannot remove {}: not installed",
                    component
                )));
            }
        }
        Ok(())
    }
}
