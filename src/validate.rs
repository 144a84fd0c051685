//! Field-level input validation shared by the flows and the form controller.

/// A single rejected field, named by its wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required and must not be empty")
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Rejects the empty string. Whitespace is kept as-is and counts as content.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}
