//! Provisioning planner: resolves component change requests against a
//! catalog of versioned, inter-dependent components into ordered
//! installation plans.
//!
//! The entry point is [`Planner`]: give it a [`Catalog`], a [`Profile`]
//! snapshot and a [`ChangeRequest`], and it returns a [`Plan`] whose
//! [`RequestStatus`](plan::RequestStatus) reports, per requested root,
//! whether it was satisfied or why it conflicts.

pub mod cancel;
pub mod catalog;
pub mod error;
pub mod metadata;
pub mod plan;
pub mod planner;
pub mod profile;
pub mod request;
pub mod solver;

pub use cancel::CancelToken;
pub use catalog::{Catalog, CompositeCatalog, MemoryCatalog};
pub use error::{PlannerError, Result};
pub use metadata::{Capability, Component, ComponentKey, Environment, Filter, Requirement};
pub use plan::{Operand, Plan, RequestStatus, RootConflict, Warning};
pub use planner::Planner;
pub use profile::Profile;
pub use request::ChangeRequest;
pub use solver::{Policy, Problem, Resolution, Solver};
