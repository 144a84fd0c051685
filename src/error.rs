use crate::validate::ValidationError;
use std::fmt;

#[derive(Debug)]
pub enum GenFillError {
    ConfigError(String),
    ValidationError { field: &'static str, message: String },
    RequestError(String),
    ResponseError(String),
    /// The model answered but the declared output field was absent or null.
    MissingOutput(&'static str),
    SerializationError(String),
    HttpError(String),
    ApiError { status: u16, message: String },
    AwsError(String),
    AwsServiceError(String),
    IoError(String),
}

impl GenFillError {
    /// True for failures raised before any remote call was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, GenFillError::ValidationError { .. })
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            GenFillError::ValidationError { field, .. } => Some(field),
            GenFillError::MissingOutput(field) => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for GenFillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenFillError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            GenFillError::ValidationError { field, message } => {
                write!(f, "Validation error on '{}': {}", field, message)
            }
            GenFillError::RequestError(msg) => write!(f, "Request error: {}", msg),
            GenFillError::ResponseError(msg) => write!(f, "Response error: {}", msg),
            GenFillError::MissingOutput(field) => {
                write!(f, "Response error: model output is missing '{}'", field)
            }
            GenFillError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            GenFillError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            GenFillError::ApiError { status, message } => {
                write!(f, "API error: {} - {}", status, message)
            }
            GenFillError::AwsError(msg) => write!(f, "AWS error: {}", msg),
            GenFillError::AwsServiceError(msg) => write!(f, "AWS service error: {}", msg),
            GenFillError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for GenFillError {}

impl From<ValidationError> for GenFillError {
    fn from(err: ValidationError) -> Self {
        GenFillError::ValidationError {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<std::io::Error> for GenFillError {
    fn from(err: std::io::Error) -> Self {
        GenFillError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenFillError>;
