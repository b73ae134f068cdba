//! Content Layer Error Types

use thiserror::Error;

use crate::services::NodeModelError;

/// Content mapping errors
#[derive(Error, Debug)]
pub enum ContentError {
    /// No registered provider could supply a mapper for the type
    #[error("No content mapper found for type: {content_type}")]
    MapperNotFound { content_type: String },

    /// The opaque data item could not be interpreted by the mapper
    #[error("Invalid content data: {reason}")]
    InvalidData { reason: String },

    /// The data belongs to another site than the one requested
    #[error("Content belongs to site '{actual}', expected '{expected}'")]
    SiteMismatch { expected: String, actual: String },

    /// Node resolution through the model failed
    #[error(transparent)]
    Model(#[from] NodeModelError),
}

impl ContentError {
    /// Create a mapper not found error
    pub fn mapper_not_found(content_type: impl Into<String>) -> Self {
        Self::MapperNotFound {
            content_type: content_type.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }

    /// Create a site mismatch error
    pub fn site_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::SiteMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
