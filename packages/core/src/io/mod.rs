//! Storage Boundary
//!
//! The core operates purely on in-memory node graphs supplied by a
//! pluggable storage adapter. This module defines the `NodeIo` trait that
//! abstracts persistence, the explicit per-request `NodeCache`, the tree
//! mutation events, and an in-memory reference adapter used by the tests.
//!
//! # Architecture
//!
//! - **Abstraction point**: between `NodeModel` (business logic) and
//!   whatever holds the data (files, a database, memory)
//! - **Synchronous**: all operations are blocking calls executed to
//!   completion within one request; cross-process concurrency is the
//!   adapter's responsibility
//! - **No owned encoding**: persisted representations round-trip through
//!   the adapter without the core knowing the format

use std::collections::BTreeSet;

use crate::models::{Node, TrashNode};

mod cache;
mod error;
pub mod events;
mod memory;

pub use cache::NodeCache;
pub use error::IoError;
pub use events::{EventAction, EventSink, NodeEvent};
pub use memory::{MemoryNodeIo, DEFAULT_REVISION};

/// Abstraction layer for node persistence
///
/// The model calls these; it never implements persistence itself. Nodes
/// returned by single-node getters come with their parent chain
/// materialized (live `parent_node` links) so property inheritance works;
/// bulk getters return plain nodes without links.
pub trait NodeIo: Send + Sync {
    /// All site root nodes, over all revisions
    fn get_sites(&self) -> Result<Vec<Node>, IoError>;

    /// Named revisions a site holds
    fn get_revisions(&self, site: &str) -> Result<BTreeSet<String>, IoError>;

    /// Root node of a site in a revision
    fn get_site(&self, site: &str, revision: &str) -> Result<Node, IoError>;

    /// A node by id, optionally verifying its type and loading children
    ///
    /// `children_depth` of 0 skips children; `n` loads `n` levels. The
    /// parent chain is always materialized.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when absent, `NodeTypeMismatch` when `node_type` is
    /// given and does not match.
    fn get_node(
        &self,
        site: &str,
        revision: &str,
        id: &str,
        node_type: Option<&str>,
        children_depth: usize,
    ) -> Result<Node, IoError>;

    /// Direct children of a path, ordered, loading `depth` levels
    fn get_children(
        &self,
        site: &str,
        revision: &str,
        path: &str,
        depth: usize,
    ) -> Result<Vec<Node>, IoError>;

    /// Every node of a site revision, unordered, without live links
    fn get_nodes(&self, site: &str, revision: &str) -> Result<Vec<Node>, IoError>;

    /// Every node of a given type, unordered, without live links
    fn get_nodes_by_type(
        &self,
        site: &str,
        revision: &str,
        node_type: &str,
    ) -> Result<Vec<Node>, IoError>;

    /// Every descendant of a path, unordered, without live links
    fn get_nodes_by_path(
        &self,
        site: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<Node>, IoError>;

    /// Write a node, assigning an id on first save
    ///
    /// Adapters also assign a default revision and an append-at-end order
    /// index when those are unset.
    fn set_node(&self, node: &mut Node) -> Result<(), IoError>;

    /// Delete a node, moving it (and with `recursive` its subtree) to trash
    fn remove_node(&self, node: &Node, recursive: bool) -> Result<(), IoError>;

    /// All trash entries of a site
    fn get_trash_nodes(&self, site: &str) -> Result<Vec<TrashNode>, IoError>;

    /// A trash entry by its trash id
    fn get_trash_node(&self, site: &str, trash_id: &str) -> Result<TrashNode, IoError>;

    /// Put trash entries back into the live tree
    ///
    /// Entries are processed in the given order; the model sorts them so
    /// parents restore before children. `new_parent` is a materialized path
    /// overriding each entry's original position.
    fn restore_trash_nodes(
        &self,
        site: &str,
        revision: &str,
        trash_nodes: Vec<TrashNode>,
        new_parent: Option<&str>,
    ) -> Result<(), IoError>;

    /// Copy a node (and with `recursive` its subtree) into another revision
    fn publish(&self, node: &Node, revision: &str, recursive: bool) -> Result<(), IoError>;
}
