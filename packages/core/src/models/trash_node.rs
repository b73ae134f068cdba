//! Trash Node
//!
//! A removed node is kept aside as a trash entry so it can be restored
//! later. The entry carries its own trash id (assigned by the storage
//! adapter), the removal timestamp and the node as it was at removal time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::node::Node;

/// A soft-deleted node, outside the live tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashNode {
    /// Trash-assigned id, independent from the node id
    id: String,

    /// When the node was removed
    removed: DateTime<Utc>,

    /// The removed node, including its properties and former position
    node: Node,
}

impl TrashNode {
    /// Create a trash entry for a removed node
    pub fn new(id: impl Into<String>, removed: DateTime<Utc>, node: Node) -> Self {
        Self {
            id: id.into(),
            removed,
            node,
        }
    }

    /// Trash id of this entry
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Removal timestamp
    pub fn removed(&self) -> DateTime<Utc> {
        self.removed
    }

    /// The removed node
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Take the removed node out of the entry
    pub fn into_node(self) -> Node {
        self.node
    }
}
