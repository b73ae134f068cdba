//! Type-Safe SiteNode Wrapper
//!
//! A site is the root of a content tree. Besides the generic property bag it
//! owns the widget instance table of the whole tree (`widget.<instanceId>`
//! properties mapping an instance to its widget type), the localization
//! method, the auto-publish flag and the per-locale base URLs.
//!
//! The wrapper follows the universal-node pattern: storage keeps using the
//! plain `Node`, the wrapper is a compile-time convenience layer.
//!
//! # Examples
//!
//! ```rust
//! use canopy_core::models::{Node, SiteNode, TYPE_SITE};
//!
//! let mut node = Node::new(TYPE_SITE.to_string(), true);
//! node.set_id("home");
//! let mut site = SiteNode::from_node(node).unwrap();
//!
//! let widget_id = site.create_widget("text").unwrap();
//! assert_eq!(site.widget_type(widget_id), Some("text"));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::models::node::{Node, NodeError, TYPE_SITE};
use crate::models::property::{
    parse_bool, KEY_SEPARATOR, L10N_COPY, PROPERTY_AUTOPUBLISH, PROPERTY_L10N, PROPERTY_URL,
    PROPERTY_WIDGET,
};

/// Type-safe wrapper for site nodes
pub struct SiteNode {
    node: Node,

    /// Named revisions this site holds, filled by the storage adapter
    revisions: BTreeSet<String>,

    /// Offset added to newly allocated widget instance ids
    widget_id_offset: u64,
}

impl SiteNode {
    /// Wrap a universal node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidNodeType` when the node is not a site.
    pub fn from_node(node: Node) -> Result<Self, NodeError> {
        if node.node_type() != TYPE_SITE {
            return Err(NodeError::invalid_node_type(TYPE_SITE, node.node_type()));
        }
        Ok(Self {
            node,
            revisions: BTreeSet::new(),
            widget_id_offset: 0,
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

    /// Named revisions of this site
    pub fn revisions(&self) -> &BTreeSet<String> {
        &self.revisions
    }

    /// Replace the revision set; called by storage adapters
    pub fn set_revisions(&mut self, revisions: BTreeSet<String>) {
        self.revisions = revisions;
    }

    /// Set the allocation offset for new widget instance ids
    pub fn set_widget_id_offset(&mut self, offset: u64) {
        self.widget_id_offset = offset;
    }

    /// All widget instances of this site, instance id to widget type
    ///
    /// Instances live in the two-segment `widget.<instanceId>` properties of
    /// the site node itself.
    pub fn available_widgets(&self) -> BTreeMap<u64, String> {
        let prefix = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}");
        self.node
            .properties()
            .iter()
            .filter(|(_, property)| !property.is_cleared())
            .filter_map(|(key, property)| {
                let instance = key.strip_prefix(&prefix)?;
                // Three-segment keys are instance properties, not the table.
                let instance: u64 = instance.parse().ok()?;
                Some((instance, property.value.clone()))
            })
            .collect()
    }

    /// Widget type of an instance id
    pub fn widget_type(&self, widget_id: u64) -> Option<&str> {
        let key = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}");
        self.node.get_local(&key)
    }

    /// Allocate a new widget instance of the given type
    ///
    /// The new id is one past the highest allocated instance id, shifted by
    /// the widget id offset. The instance is registered on the site node;
    /// persisting it is up to the caller.
    pub fn create_widget(&mut self, widget_type: &str) -> Result<u64, NodeError> {
        let max = self.available_widgets().keys().max().copied().unwrap_or(0);
        let widget_id = self.widget_id_offset + max + 1;
        let key = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}");
        self.node.set(&key, widget_type)?;
        Ok(widget_id)
    }

    /// Localization method of this site, `copy` unless set to `unique`
    pub fn localization_method(&self) -> &str {
        self.node.get_or(PROPERTY_L10N, L10N_COPY)
    }

    /// Set the localization method (`copy` or `unique`)
    pub fn set_localization_method(&mut self, method: &str) -> Result<(), NodeError> {
        self.node.set(PROPERTY_L10N, method)
    }

    /// Whether saved nodes are published to the live revision automatically
    pub fn is_auto_publish(&self) -> bool {
        self.node
            .get(PROPERTY_AUTOPUBLISH)
            .map(parse_bool)
            .unwrap_or(false)
    }

    /// Base URL of this site for a locale
    pub fn base_url(&self, locale: &str) -> Option<&str> {
        let key = format!("{PROPERTY_URL}{KEY_SEPARATOR}{locale}");
        self.node.get(&key)
    }

    /// Set the base URL for a locale
    pub fn set_base_url(&mut self, locale: &str, url: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_URL}{KEY_SEPARATOR}{locale}");
        self.node.set(&key, url)
    }

    /// All configured base URLs, keyed by locale
    pub fn base_urls(&self) -> BTreeMap<String, String> {
        let prefix = format!("{PROPERTY_URL}{KEY_SEPARATOR}");
        self.node
            .properties()
            .iter()
            .filter(|(key, property)| key.starts_with(&prefix) && !property.is_cleared())
            .map(|(key, property)| (key[prefix.len()..].to_string(), property.value.clone()))
            .collect()
    }
}
