//! Error types for PathBuilder

use std::fmt;

/// Errors that can occur during path construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBuilderError {
    /// Required parameter is missing
    MissingRequiredParameter(String),

    /// A parameter contains characters that would break the path
    InvalidParameter { name: String, value: String },
}

impl fmt::Display for PathBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathBuilderError::MissingRequiredParameter(param) => {
                write!(f, "Missing required parameter: {param}")
            }
            PathBuilderError::InvalidParameter { name, value } => {
                write!(f, "Invalid value for parameter {name}: '{value}'")
            }
        }
    }
}

impl std::error::Error for PathBuilderError {}
