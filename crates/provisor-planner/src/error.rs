use thiserror::Error;

/// Hard failures of a resolution.
///
/// Expected conflict conditions (unsatisfiable roots, singleton collisions,
/// version mismatches) are not errors; they are reported through the
/// `RequestStatus` of the returned plan. Only malformed input and
/// cooperative cancellation abort a resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Malformed change request: {message}")]
    MalformedRequest { message: String },

    #[error("Resolution was cancelled")]
    Cancelled,
}

impl PlannerError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
