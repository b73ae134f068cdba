//! Type-Safe ReferenceNode Wrapper
//!
//! A reference node proxies another node of the tree: it appears at its own
//! position (menus, breadcrumbs) but borrows name, description, image and
//! route from the node it references whenever it does not override them
//! locally. The resolved target is a transient link set by the caller; it is
//! never persisted with the node.

use crate::models::node::{Node, NodeError, TYPE_REFERENCE};
use crate::models::property::PROPERTY_REFERENCE_NODE;

/// Type-safe wrapper for reference nodes
pub struct ReferenceNode {
    node: Node,

    /// Resolved referenced node, transient
    referenced: Option<Box<Node>>,
}

impl ReferenceNode {
    /// Wrap a universal node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidNodeType` when the node is not a reference.
    pub fn from_node(node: Node) -> Result<Self, NodeError> {
        if node.node_type() != TYPE_REFERENCE {
            return Err(NodeError::invalid_node_type(
                TYPE_REFERENCE,
                node.node_type(),
            ));
        }
        Ok(Self {
            node,
            referenced: None,
        })
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

    /// Id of the referenced node
    pub fn referenced_node_id(&self) -> Option<&str> {
        self.node.get(PROPERTY_REFERENCE_NODE)
    }

    /// Point this reference at another node
    pub fn set_referenced_node_id(&mut self, node_id: &str) -> Result<(), NodeError> {
        self.node.set(PROPERTY_REFERENCE_NODE, node_id)
    }

    /// Attach the resolved referenced node
    pub fn set_referenced_node(&mut self, node: Node) {
        self.referenced = Some(Box::new(node));
    }

    /// The resolved referenced node, when attached
    pub fn referenced_node(&self) -> Option<&Node> {
        self.referenced.as_deref()
    }

    /// Localized name, delegating to the referenced node when unset locally
    pub fn name(&self, locale: &str, context: Option<&str>) -> String {
        if self.node.get_local(&format!("name.{locale}")).is_some() {
            return self.node.name(locale, context);
        }
        match &self.referenced {
            Some(target) => target.name(locale, context),
            None => self.node.name(locale, context),
        }
    }

    /// Localized description meta, delegating when unset locally
    pub fn description(&self, locale: &str) -> Option<String> {
        if let Some(description) = self.node.meta(locale, "description") {
            return Some(description.to_string());
        }
        self.referenced
            .as_ref()
            .and_then(|target| target.meta(locale, "description"))
            .map(str::to_string)
    }

    /// Localized image meta, delegating when unset locally
    pub fn image(&self, locale: &str) -> Option<String> {
        if let Some(image) = self.node.meta(locale, "image") {
            return Some(image.to_string());
        }
        self.referenced
            .as_ref()
            .and_then(|target| target.meta(locale, "image"))
            .map(str::to_string)
    }

    /// Localized route, delegating when unset locally
    pub fn route(&self, locale: &str) -> Option<String> {
        if let Some(route) = self.node.route(locale, false) {
            return Some(route);
        }
        self.referenced
            .as_ref()
            .and_then(|target| target.route(locale, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::node::TYPE_PAGE;

    fn reference_with_target() -> ReferenceNode {
        let mut target = Node::new(TYPE_PAGE.to_string(), false);
        target.set_id("about");
        target.set_name("en", "About us", None).unwrap();
        target.set_route("en", "/about").unwrap();
        target.set_meta("en", "description", "Who we are").unwrap();

        let mut node = Node::new(TYPE_REFERENCE.to_string(), false);
        node.set_id("about-ref");
        let mut reference = ReferenceNode::from_node(node).unwrap();
        reference.set_referenced_node_id("about").unwrap();
        reference.set_referenced_node(target);
        reference
    }

    #[test]
    fn test_delegates_when_locally_unset() {
        let reference = reference_with_target();

        assert_eq!(reference.name("en", None), "About us");
        assert_eq!(reference.route("en"), Some("/about".to_string()));
        assert_eq!(reference.description("en"), Some("Who we are".to_string()));
        assert_eq!(reference.image("en"), None);
    }

    #[test]
    fn test_local_values_win() {
        let mut reference = reference_with_target();
        reference
            .as_node_mut()
            .set_name("en", "See also", None)
            .unwrap();
        reference.as_node_mut().set_route("en", "/see-also").unwrap();

        assert_eq!(reference.name("en", None), "See also");
        assert_eq!(reference.route("en"), Some("/see-also".to_string()));
    }

    #[test]
    fn test_without_resolved_target_falls_back_to_self() {
        let mut node = Node::new(TYPE_REFERENCE.to_string(), false);
        node.set_id("dangling");
        let reference = ReferenceNode::from_node(node).unwrap();

        assert_eq!(reference.name("en", None), "dangling");
        assert_eq!(reference.route("en"), None);
    }
}
