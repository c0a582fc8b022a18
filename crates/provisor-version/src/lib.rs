//! Version and version range model for the provisioning planner
//!
//! Versions are dotted numeric segments with an optional trailing
//! qualifier (`1.2.3.rc1`). Ranges are closed/half-open intervals over
//! them, written in interval syntax (`[1.0,2.0)`).

mod range;
mod version;

pub use range::VersionRange;
pub use version::{Version, VersionError};
