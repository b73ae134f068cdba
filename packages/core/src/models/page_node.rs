//! Type-Safe PageNode Wrapper

use crate::models::node::{Node, NodeError, TYPE_PAGE};
use crate::models::property::{KEY_SEPARATOR, PROPERTY_LAYOUT};

/// Type-safe wrapper for page nodes
///
/// Pages are the regular content vertices of a tree; on top of the generic
/// bag they carry a per-locale layout name consumed by the rendering layer.
pub struct PageNode {
    node: Node,
}

impl PageNode {
    /// Wrap a universal node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidNodeType` when the node is not a page.
    pub fn from_node(node: Node) -> Result<Self, NodeError> {
        if node.node_type() != TYPE_PAGE {
            return Err(NodeError::invalid_node_type(TYPE_PAGE, node.node_type()));
        }
        Ok(Self { node })
    }

    /// Reference to the underlying node
    pub fn as_node(&self) -> &Node {
        &self.node
    }

    /// Mutable reference to the underlying node
    pub fn as_node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Convert back to the universal node, consuming the wrapper
    pub fn into_node(self) -> Node {
        self.node
    }

    /// Layout name for a locale, inherited down the tree
    pub fn layout(&self, locale: &str) -> Option<&str> {
        let key = format!("{PROPERTY_LAYOUT}{KEY_SEPARATOR}{locale}");
        self.node.get(&key)
    }

    /// Set the layout name for a locale
    pub fn set_layout(&mut self, locale: &str, layout: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_LAYOUT}{KEY_SEPARATOR}{locale}");
        self.node.set(&key, layout)
    }
}
