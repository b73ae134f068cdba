//! Tree Mutation Events
//!
//! The model fires events around every write so surrounding layers (cache
//! warmers, search indexers, audit logs) can observe tree changes without
//! coupling to the model. Events follow the observer pattern: a single
//! optional sink, invoked synchronously before and after the write.
//!
//! Emission is best-effort by contract: a missing sink, or a sink that
//! errors, never affects the outcome of the operation itself.

use serde::{Deserialize, Serialize};

use crate::models::Node;

/// Event fired before a node write
pub const EVENT_SAVE_PRE: &str = "node.save.pre";
/// Event fired after a node write
pub const EVENT_SAVE_POST: &str = "node.save.post";
/// Event fired before a node removal
pub const EVENT_REMOVE_PRE: &str = "node.remove.pre";
/// Event fired after a node removal
pub const EVENT_REMOVE_POST: &str = "node.remove.post";
/// Event fired before a subtree reorder
pub const EVENT_ORDER_PRE: &str = "node.order.pre";
/// Event fired after a subtree reorder
pub const EVENT_ORDER_POST: &str = "node.order.post";
/// Event fired before a publish
pub const EVENT_PUBLISH_PRE: &str = "node.publish.pre";
/// Event fired after a publish
pub const EVENT_PUBLISH_POST: &str = "node.publish.post";
/// Event fired before a trash restore
pub const EVENT_RESTORE_PRE: &str = "node.restore.pre";
/// Event fired after a trash restore
pub const EVENT_RESTORE_POST: &str = "node.restore.post";

/// What a tree mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventAction {
    Save,
    Remove,
    Order,
    Publish,
    Restore,
}

/// Payload of a tree mutation event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvent {
    /// What happened
    pub action: EventAction,

    /// The nodes involved, as they were when the event fired
    pub nodes: Vec<Node>,

    /// Human-readable summary, e.g. `Saving page "About"`
    pub description: String,
}

impl NodeEvent {
    /// Create an event payload
    pub fn new(action: EventAction, nodes: Vec<Node>, description: impl Into<String>) -> Self {
        Self {
            action,
            nodes,
            description: description.into(),
        }
    }
}

/// Observer of tree mutations
///
/// Implementations may fan events out however they like; errors are logged
/// and swallowed by the model.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn trigger_event(&self, name: &str, event: &NodeEvent) -> anyhow::Result<()>;
}
