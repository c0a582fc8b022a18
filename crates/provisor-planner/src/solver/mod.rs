//! SAT-based constraint solver: pool and rule construction, the
//! backtracking search, and conflict explanations.

pub mod decisions;
pub mod policy;
pub mod pool;
pub mod problem;
pub mod rule;
pub mod rule_generator;
#[allow(clippy::module_inception)]
pub mod solver;


pub use policy::Policy;
pub use pool::{Pool, VariableId};
pub use problem::{explain_root, ConflictReason, Problem};
pub use rule::{Literal, Rule, RuleSet, RuleType};
pub use solver::{Resolution, Solver};
