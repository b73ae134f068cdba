//! Type-Safe HomeNode Wrapper

use crate::models::node::{Node, NodeError, TYPE_HOME};

/// Type-safe wrapper for home page nodes
///
/// A home page routes to `/` in every locale; the validator keeps it unique
/// per site and locale.
pub struct HomeNode {
    node: Node,
}

impl HomeNode {
    /// Wrap a universal node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidNodeType` when the node is not a home page.
    pub fn from_node(node: Node) -> Result<Self, NodeError> {
        if node.node_type() != TYPE_HOME {
            return Err(NodeError::invalid_node_type(TYPE_HOME, node.node_type()));
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

    /// The home route, `/` regardless of locale
    pub fn route(&self) -> &'static str {
        "/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_routes_to_slash() {
        let mut node = Node::new(TYPE_HOME.to_string(), false);
        node.set_id("homepage");
        let home = HomeNode::from_node(node).unwrap();

        assert_eq!(home.route(), "/");
        assert_eq!(home.as_node().route("nl", false), Some("/".to_string()));
    }
}
