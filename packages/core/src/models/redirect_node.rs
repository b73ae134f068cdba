//! Type-Safe RedirectNode Wrapper

use crate::models::node::{Node, NodeError, TYPE_REDIRECT};
use crate::models::property::{KEY_SEPARATOR, PROPERTY_REDIRECT_NODE, PROPERTY_REDIRECT_URL};

/// Type-safe wrapper for redirect nodes
///
/// A redirect sends the visitor either to an external URL or to another
/// node of the tree, per locale. When both are set the URL wins.
pub struct RedirectNode {
    node: Node,
}

impl RedirectNode {
    /// Wrap a universal node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidNodeType` when the node is not a redirect.
    pub fn from_node(node: Node) -> Result<Self, NodeError> {
        if node.node_type() != TYPE_REDIRECT {
            return Err(NodeError::invalid_node_type(
                TYPE_REDIRECT,
                node.node_type(),
            ));
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

    /// Target URL for a locale
    pub fn redirect_url(&self, locale: &str) -> Option<&str> {
        let key = format!("{PROPERTY_REDIRECT_URL}{KEY_SEPARATOR}{locale}");
        self.node.get(&key)
    }

    /// Set the target URL for a locale
    pub fn set_redirect_url(&mut self, locale: &str, url: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_REDIRECT_URL}{KEY_SEPARATOR}{locale}");
        self.node.set(&key, url)
    }

    /// Target node id for a locale
    pub fn redirect_node(&self, locale: &str) -> Option<&str> {
        let key = format!("{PROPERTY_REDIRECT_NODE}{KEY_SEPARATOR}{locale}");
        self.node.get(&key)
    }

    /// Set the target node id for a locale
    pub fn set_redirect_node(&mut self, locale: &str, node_id: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_REDIRECT_NODE}{KEY_SEPARATOR}{locale}");
        self.node.set(&key, node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_targets() {
        let mut node = Node::new(TYPE_REDIRECT.to_string(), false);
        node.set_id("moved");
        let mut redirect = RedirectNode::from_node(node).unwrap();

        redirect.set_redirect_url("en", "http://example.com/new").unwrap();
        redirect.set_redirect_node("nl", "about").unwrap();

        assert_eq!(redirect.redirect_url("en"), Some("http://example.com/new"));
        assert_eq!(redirect.redirect_url("nl"), None);
        assert_eq!(redirect.redirect_node("nl"), Some("about"));
    }
}
