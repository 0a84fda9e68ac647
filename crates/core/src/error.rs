use chrono::NaiveDate;

use crate::types::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("No eligible active people for template {template_id}")]
    EmptyEligiblePool { template_id: i64 },

    #[error("Timed out acquiring lock on {resource}")]
    LockTimeout { resource: String },

    #[error("{entity} {id} is {state} and cannot be modified")]
    ImmutableStateConflict {
        entity: &'static str,
        id: RecordId,
        state: String,
    },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing entity keyed by anything displayable.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::InvalidConstraint(errors.to_string())
    }
}
