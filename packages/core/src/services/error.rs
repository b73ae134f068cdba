//! Service Layer Error Types
//!
//! This module defines the error types of the tree mutation engine.
//! Structural and precondition violations fail fast; validation problems
//! are aggregated into one error carrying every field-tagged issue so
//! callers can display them together.

use std::fmt;

use thiserror::Error;

use crate::behaviors::UnknownNodeTypeError;
use crate::io::IoError;
use crate::models::NodeError;

/// One field-tagged validation problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeValidationIssue {
    /// Property key or logical field the issue belongs to
    pub field: String,

    /// Human-readable description
    pub message: String,
}

impl NodeValidationIssue {
    /// Create an issue
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Tree mutation errors
#[derive(Error, Debug)]
pub enum NodeModelError {
    /// Node-level violation (bad key, missing widget, no root)
    #[error(transparent)]
    Node(#[from] NodeError),

    /// A type name that is not registered
    #[error(transparent)]
    UnknownNodeType(#[from] UnknownNodeTypeError),

    /// Node lookup by id missed
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Aggregated validation failure; every issue is field-tagged
    #[error("Node validation failed with {} issue(s)", .issues.len())]
    ValidationFailed { issues: Vec<NodeValidationIssue> },

    /// A subtree reorder did not cover the stored nodes exactly
    #[error("Node order mismatch: {context} (missing {missing:?}, extra {extra:?})")]
    OrderingMismatch {
        /// Stored node ids absent from the order map
        missing: Vec<String>,
        /// Order map ids that are not children of their supposed parent
        extra: Vec<String>,
        /// What exactly did not add up
        context: String,
    },

    /// Storage boundary failure
    #[error(transparent)]
    Io(#[from] IoError),
}

impl NodeModelError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a validation failed error
    pub fn validation_failed(issues: Vec<NodeValidationIssue>) -> Self {
        Self::ValidationFailed { issues }
    }

    /// Create an ordering mismatch error
    pub fn ordering_mismatch(missing: Vec<String>, extra: Vec<String>) -> Self {
        Self::OrderingMismatch {
            missing,
            extra,
            context: "order map does not cover the stored nodes".to_string(),
        }
    }

    /// Create an ordering mismatch error for a malformed encoding
    pub fn ordering_broken(context: impl Into<String>) -> Self {
        Self::OrderingMismatch {
            missing: Vec::new(),
            extra: Vec::new(),
            context: context.into(),
        }
    }

    /// Map a storage miss on a node id to the service-level error
    pub(crate) fn from_io(error: IoError) -> Self {
        match error {
            IoError::NodeNotFound { id } => Self::NodeNotFound { id },
            other => Self::Io(other),
        }
    }
}
