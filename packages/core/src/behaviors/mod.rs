//! Node Type System
//!
//! Every node carries a wire-stable type name; this module maps those names
//! to the behavior that differs per type: the factory constructing a fresh
//! node and the default inherit policy of its properties. All tree
//! construction flows through the registry so the name/policy pairing stays
//! in one place.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{Node, TYPE_HOME, TYPE_PAGE, TYPE_REDIRECT, TYPE_REFERENCE, TYPE_SITE};

/// Lookup of a type name that is not registered
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown node type: {name}")]
pub struct UnknownNodeTypeError {
    /// The type name that was looked up
    pub name: String,
}

/// Behavior descriptor of one node type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    name: String,
    default_inherit: bool,
}

impl NodeType {
    /// Define a node type
    pub fn new(name: impl Into<String>, default_inherit: bool) -> Self {
        Self {
            name: name.into(),
            default_inherit,
        }
    }

    /// Wire-stable type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default inherit policy for properties of nodes of this type
    pub fn default_inherit(&self) -> bool {
        self.default_inherit
    }

    /// Construct a fresh, unsaved node of this type
    pub fn create_node(&self) -> Node {
        Node::new(self.name.clone(), self.default_inherit)
    }
}

/// Registry of the known node types
///
/// # Examples
///
/// ```rust
/// use canopy_core::behaviors::NodeTypeManager;
///
/// let types = NodeTypeManager::with_default_types();
/// let page = types.get_node_type("page").unwrap().create_node();
/// assert_eq!(page.node_type(), "page");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeTypeManager {
    types: BTreeMap<String, NodeType>,
}

impl NodeTypeManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in types
    ///
    /// Sites propagate their properties to the tree below by default; the
    /// other types keep properties node-local unless marked inheritable.
    pub fn with_default_types() -> Self {
        let mut manager = Self::new();
        manager.add_node_type(NodeType::new(TYPE_SITE, true));
        manager.add_node_type(NodeType::new(TYPE_PAGE, false));
        manager.add_node_type(NodeType::new(TYPE_REDIRECT, false));
        manager.add_node_type(NodeType::new(TYPE_REFERENCE, false));
        manager.add_node_type(NodeType::new(TYPE_HOME, false));
        manager
    }

    /// Register a node type, replacing a previous one with the same name
    pub fn add_node_type(&mut self, node_type: NodeType) {
        self.types.insert(node_type.name().to_string(), node_type);
    }

    /// Look up a node type by name
    ///
    /// # Errors
    ///
    /// Returns `UnknownNodeTypeError` when the name is not registered.
    pub fn get_node_type(&self, name: &str) -> Result<&NodeType, UnknownNodeTypeError> {
        self.types.get(name).ok_or_else(|| UnknownNodeTypeError {
            name: name.to_string(),
        })
    }

    /// Unregister a node type, returning it when it was registered
    pub fn remove_node_type(&mut self, name: &str) -> Option<NodeType> {
        self.types.remove(name)
    }

    /// All registered node types, keyed by name
    pub fn node_types(&self) -> &BTreeMap<String, NodeType> {
        &self.types
    }

    /// Construct a fresh node of a registered type
    ///
    /// # Errors
    ///
    /// Returns `UnknownNodeTypeError` when the name is not registered.
    pub fn create_node(&self, name: &str) -> Result<Node, UnknownNodeTypeError> {
        Ok(self.get_node_type(name)?.create_node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_types_registered() {
        let manager = NodeTypeManager::with_default_types();
        assert_eq!(manager.node_types().len(), 5);
        assert!(manager.get_node_type(TYPE_SITE).unwrap().default_inherit());
        assert!(!manager.get_node_type(TYPE_PAGE).unwrap().default_inherit());
    }

    #[test]
    fn test_unknown_type_errors() {
        let manager = NodeTypeManager::with_default_types();
        let error = manager.get_node_type("gallery").unwrap_err();
        assert_eq!(error.name, "gallery");
    }

    #[test]
    fn test_add_and_remove() {
        let mut manager = NodeTypeManager::new();
        manager.add_node_type(NodeType::new("gallery", false));
        assert!(manager.get_node_type("gallery").is_ok());

        let removed = manager.remove_node_type("gallery").unwrap();
        assert_eq!(removed.name(), "gallery");
        assert!(manager.get_node_type("gallery").is_err());
    }

    #[test]
    fn test_factory_applies_default_inherit() {
        let manager = NodeTypeManager::with_default_types();
        let mut site = manager.create_node(TYPE_SITE).unwrap();
        site.set_id("home");
        site.set("theme", "forest").unwrap();
        assert!(site.property("theme").unwrap().inherit);
    }
}
