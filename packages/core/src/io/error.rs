//! Storage Adapter Error Types

use thiserror::Error;

/// Errors of the storage boundary
///
/// Covers lookups that miss and adapter-specific failures. Business-rule
/// violations are handled by the service-layer error types.
#[derive(Error, Debug)]
pub enum IoError {
    /// No site with the given id
    #[error("Site not found: {id}")]
    SiteNotFound { id: String },

    /// The site exists but not in the requested revision
    #[error("Site {site} has no revision '{revision}'")]
    RevisionNotFound { site: String, revision: String },

    /// No node with the given id in the requested site/revision
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// A node exists but is of another type than requested
    #[error("Node {id} is a '{actual}', expected '{expected}'")]
    NodeTypeMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// No trash entry with the given id
    #[error("Trash node not found: {id}")]
    TrashNodeNotFound { id: String },

    /// Adapter-specific failure (I/O, encoding, locking)
    #[error("Storage operation failed: {context}")]
    Storage { context: String },
}

impl IoError {
    /// Create a site not found error
    pub fn site_not_found(id: impl Into<String>) -> Self {
        Self::SiteNotFound { id: id.into() }
    }

    /// Create a revision not found error
    pub fn revision_not_found(site: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::RevisionNotFound {
            site: site.into(),
            revision: revision.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a node type mismatch error
    pub fn node_type_mismatch(
        id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::NodeTypeMismatch {
            id: id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a trash node not found error
    pub fn trash_node_not_found(id: impl Into<String>) -> Self {
        Self::TrashNodeNotFound { id: id.into() }
    }

    /// Create a generic storage error
    pub fn storage(context: impl Into<String>) -> Self {
        Self::Storage {
            context: context.into(),
        }
    }
}
