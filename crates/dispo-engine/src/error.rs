//! Error types for dispo-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispoError {
    /// A request parameter failed validation. `field` is the payload field name.
    #[error("Invalid request field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    /// The request payload was not a JSON object of the expected shape.
    #[error("Invalid request payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// An events document was not a JSON array.
    #[error("Invalid events document: {0}")]
    InvalidEvents(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// Free-space extraction could not complete.
    #[error("Computation error: {0}")]
    Computation(String),
}

impl DispoError {
    pub(crate) fn field(field: &str, reason: impl Into<String>) -> Self {
        DispoError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispoError>;
