//! Node Data Structures
//!
//! This module defines the core `Node` struct for Canopy's content tree.
//!
//! # Architecture
//!
//! - **Universal Node**: a single struct represents all content types
//!   (site, page, redirect, reference, home); the type name drives behavior
//!   through the `NodeTypeManager`
//! - **Flat property bag**: all configuration lives in dotted key/value
//!   properties with an optional inherit flag per property
//! - **Materialized path**: the ancestor chain is encoded in `parent_path`,
//!   segments joined by `-`, enabling prefix queries on descendants
//!
//! # Property inheritance
//!
//! `get` resolves a key against the node itself and then against the live
//! parent chain. A property only propagates past a node when that node marks
//! it inheritable: once an ancestor holds the key without the inherit flag,
//! the lookup is blocked there and values further up never leak through.
//!
//! # Examples
//!
//! ```rust
//! use canopy_core::models::Node;
//!
//! let mut page = Node::new("page".to_string(), false);
//! page.set("name.en", "About us").unwrap();
//! assert_eq!(page.get("name.en"), Some("About us"));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::property::{
    format_widget_ids, parse_bool, parse_widget_ids, NodeProperty, BOOL_TRUE, INHERIT_PREFIX,
    KEY_SEPARATOR, LOCALES_ALL, PATH_SEPARATOR, PROPERTY_HIDE_BREADCRUMB, PROPERTY_HIDE_MENU,
    PROPERTY_HIDE_SITEMAP, PROPERTY_LOCALES, PROPERTY_META, PROPERTY_NAME, PROPERTY_PUBLISH,
    PROPERTY_PUBLISH_START, PROPERTY_PUBLISH_STOP, PROPERTY_ROUTE, PROPERTY_SECURITY,
    PROPERTY_THEME, PROPERTY_WIDGET, PROPERTY_WIDGETS, PUBLISH_DATE_FORMAT, SECURITY_ANONYMOUS,
    SECURITY_AUTHENTICATED, SECURITY_EVERYBODY,
};
use crate::security::SecurityContext;

/// Type name of a site node (tree root)
pub const TYPE_SITE: &str = "site";

/// Type name of a regular page node
pub const TYPE_PAGE: &str = "page";

/// Type name of a redirect node
pub const TYPE_REDIRECT: &str = "redirect";

/// Type name of a reference node
pub const TYPE_REFERENCE: &str = "reference";

/// Type name of a home page node
pub const TYPE_HOME: &str = "home";

/// Errors raised by node-level operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// Property key is empty or otherwise unusable
    #[error("Invalid property key: {key:?}")]
    InvalidKey { key: String },

    /// A widget id was expected in a region list but is not there
    #[error("Widget {widget_id} not found in region {region}")]
    WidgetNotFound { region: String, widget_id: u64 },

    /// A widget reorder was not a permutation of the current region list
    #[error("Widget order mismatch in region {region}: missing {missing:?}, extra {extra:?}")]
    WidgetOrderMismatch {
        region: String,
        missing: Vec<u64>,
        extra: Vec<u64>,
    },

    /// Path or root queried on a node that has neither an id nor a parent
    #[error("Node has no root: it has not been placed in a tree nor saved")]
    NoRoot,

    /// A typed wrapper was created from a node of another type
    #[error("Invalid node type: expected '{expected}', got '{actual}'")]
    InvalidNodeType { expected: String, actual: String },
}

impl NodeError {
    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Create a widget not found error
    pub fn widget_not_found(region: impl Into<String>, widget_id: u64) -> Self {
        Self::WidgetNotFound {
            region: region.into(),
            widget_id,
        }
    }

    /// Create an invalid node type error
    pub fn invalid_node_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidNodeType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// A vertex of the content tree
///
/// # Fields
///
/// - `node_type`: wire-stable type name, immutable after construction
/// - `id`: unset until the storage adapter assigns one on first save,
///   immutable afterwards
/// - `parent_path`: materialized ancestor chain (`"home-about"`), empty for
///   a root node
/// - `order_index`: 1-based position among siblings, dense per sibling group
/// - `revision`: named snapshot this node belongs to
/// - `properties`: flat key/value bag, see [`NodeProperty`]
///
/// The live `parent_node` link exists only in memory: storage adapters
/// rebuild it when materializing a chain and it is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    node_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default)]
    parent_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    order_index: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,

    #[serde(default)]
    properties: BTreeMap<String, NodeProperty>,

    /// Live link to the in-memory parent, for recursive lookups only
    #[serde(skip)]
    parent_node: Option<Box<Node>>,

    /// Children loaded by a depth-limited fetch; `None` means "not fetched"
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Node>>,

    /// Per-type default for the inherit flag of newly set properties
    #[serde(skip)]
    default_inherit: bool,
}

impl Node {
    /// Create a new, unsaved node of the given type
    ///
    /// Use `NodeTypeManager::create_node` in application code so the type
    /// name and default inherit policy stay consistent with the registry.
    pub fn new(node_type: String, default_inherit: bool) -> Self {
        Self {
            node_type,
            id: None,
            parent_path: String::new(),
            order_index: None,
            revision: None,
            properties: BTreeMap::new(),
            parent_node: None,
            children: None,
            default_inherit,
        }
    }

    /// Wire-stable type name of this node
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Storage-assigned id, unset before the first save
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Assign the storage id
    ///
    /// Called by storage adapters on first save; the id is immutable once
    /// set and later calls are ignored.
    pub fn set_id(&mut self, id: impl Into<String>) {
        if self.id.is_none() {
            self.id = Some(id.into());
        }
    }

    /// Materialized path of the ancestor chain, empty for a root
    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    /// Move this node under another materialized path
    ///
    /// Descendant paths are not rewritten here; tree-level moves go through
    /// `NodeModel` which keeps the subtree consistent.
    pub fn set_parent_path(&mut self, path: impl Into<String>) {
        self.parent_path = path.into();
    }

    /// 1-based position among siblings
    pub fn order_index(&self) -> Option<u32> {
        self.order_index
    }

    /// Set the sibling position
    pub fn set_order_index(&mut self, order_index: u32) {
        self.order_index = Some(order_index);
    }

    /// Revision this node belongs to
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Set the revision context
    pub fn set_revision(&mut self, revision: impl Into<String>) {
        self.revision = Some(revision.into());
    }

    /// Live parent link, when the chain has been materialized
    pub fn parent_node(&self) -> Option<&Node> {
        self.parent_node.as_deref()
    }

    /// Attach the live parent link and align the materialized path with it
    pub fn set_parent_node(&mut self, parent: Node) {
        if let Ok(path) = parent.path() {
            self.parent_path = path;
        }
        self.parent_node = Some(Box::new(parent));
    }

    /// Detach the live parent link, keeping the materialized path
    pub fn take_parent_node(&mut self) -> Option<Node> {
        self.parent_node.take().map(|boxed| *boxed)
    }

    /// Loaded children, `None` when they have not been fetched
    pub fn children(&self) -> Option<&[Node]> {
        self.children.as_deref()
    }

    /// Mutable access to the loaded children
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.children.as_mut()
    }

    /// Replace the loaded children
    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = Some(children);
    }

    /// Drop the loaded children, back to the "not fetched" state
    pub fn clear_children(&mut self) {
        self.children = None;
    }

    /// Default inherit policy of this node's type
    pub fn default_inherit(&self) -> bool {
        self.default_inherit
    }

    /// Restore the default inherit policy after deserialization
    ///
    /// Serde cannot recover this from the wire format; adapters set it from
    /// the `NodeTypeManager` when materializing nodes.
    pub fn set_default_inherit(&mut self, default_inherit: bool) {
        self.default_inherit = default_inherit;
    }

    /// Whether this node is a tree root (a site)
    pub fn is_root(&self) -> bool {
        self.parent_path.is_empty()
    }

    /// Full materialized path of this node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::NoRoot` on a node without an id.
    pub fn path(&self) -> Result<String, NodeError> {
        let id = self.id.as_deref().ok_or(NodeError::NoRoot)?;
        if self.parent_path.is_empty() {
            Ok(id.to_string())
        } else {
            Ok(format!("{}{}{}", self.parent_path, PATH_SEPARATOR, id))
        }
    }

    /// Id of the root node of this node's tree
    ///
    /// # Errors
    ///
    /// Returns `NodeError::NoRoot` on a node with neither id nor parent.
    pub fn root_node_id(&self) -> Result<String, NodeError> {
        if let Some(root) = self.parent_path.split(PATH_SEPARATOR).next() {
            if !root.is_empty() {
                return Ok(root.to_string());
            }
        }
        self.id.clone().ok_or(NodeError::NoRoot)
    }

    /// Id of the direct parent, `None` for a root node
    pub fn parent_node_id(&self) -> Option<&str> {
        self.parent_path
            .rsplit(PATH_SEPARATOR)
            .next()
            .filter(|segment| !segment.is_empty())
    }

    /// Depth of this node, 0 for a root
    pub fn level(&self) -> usize {
        if self.parent_path.is_empty() {
            0
        } else {
            self.parent_path.split(PATH_SEPARATOR).count()
        }
    }

    //
    // PROPERTY ENGINE
    //

    /// Raw property bag
    pub fn properties(&self) -> &BTreeMap<String, NodeProperty> {
        &self.properties
    }

    /// Raw property by key, local only
    pub fn property(&self, key: &str) -> Option<&NodeProperty> {
        self.properties.get(key)
    }

    /// Insert a property verbatim, keeping its inherit flag
    ///
    /// Bypasses the setter rules; used by storage adapters and the clone
    /// pass which copy existing, already-validated properties.
    pub fn set_raw_property(&mut self, property: NodeProperty) {
        self.properties.insert(property.key.clone(), property);
    }

    /// Remove a property, local only
    pub fn remove_property(&mut self, key: &str) -> Option<NodeProperty> {
        self.properties.remove(key)
    }

    /// Set a property with automatic inherit resolution
    ///
    /// - an empty key is rejected with `NodeError::InvalidKey`
    /// - a key starting with `inherit:` is stored without the prefix and
    ///   forced inheritable
    /// - otherwise the node type's default inherit policy applies to new
    ///   properties
    ///
    /// Setting an empty value deletes the local property. When no local
    /// value exists but an ancestor provides an inheritable one, an explicit
    /// empty override is stored instead so descendants see "cleared" rather
    /// than re-inheriting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), NodeError> {
        self.set_property(key, value, None)
    }

    /// Set a property with an explicit inherit flag
    ///
    /// An explicit `true` escalates the stored flag of an existing property;
    /// an explicit `false` never downgrades it.
    pub fn set_with_inherit(
        &mut self,
        key: &str,
        value: &str,
        inherit: bool,
    ) -> Result<(), NodeError> {
        self.set_property(key, value, Some(inherit))
    }

    fn set_property(
        &mut self,
        key: &str,
        value: &str,
        inherit: Option<bool>,
    ) -> Result<(), NodeError> {
        if key.is_empty() {
            return Err(NodeError::invalid_key(key));
        }

        let (key, inherit) = match key.strip_prefix(INHERIT_PREFIX) {
            Some(stripped) if !stripped.is_empty() => (stripped, Some(true)),
            Some(_) => return Err(NodeError::invalid_key(key)),
            None => (key, inherit),
        };

        if value.is_empty() {
            if self.properties.remove(key).is_some() {
                return Ok(());
            }
            // Shadow an inheritable ancestor value with an explicit override,
            // inheritable itself so deeper descendants see "cleared" too.
            let inherits_value = self
                .parent_node
                .as_ref()
                .and_then(|parent| parent.lookup(key, true))
                .is_some();
            if inherits_value {
                self.properties
                    .insert(key.to_string(), NodeProperty::new(key, "", true));
            }
            return Ok(());
        }

        match self.properties.get_mut(key) {
            Some(property) => {
                property.value = value.to_string();
                if inherit == Some(true) {
                    property.inherit = true;
                }
            }
            None => {
                let inherit = inherit.unwrap_or(self.default_inherit);
                self.properties
                    .insert(key.to_string(), NodeProperty::new(key, value, inherit));
            }
        }
        Ok(())
    }

    /// Resolve a property against this node and its ancestors
    ///
    /// An ancestor only contributes when every node between it and this one
    /// that carries the key marks it inheritable; a non-inheriting holder
    /// blocks the chain. An explicit empty override resolves as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key, false)
    }

    /// The value this node would inherit from its ancestors, ignoring any
    /// local property
    pub fn inherited(&self, key: &str) -> Option<&str> {
        self.parent_node
            .as_ref()
            .and_then(|parent| parent.lookup(key, true))
    }

    /// Resolve a property against this node only
    pub fn get_local(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .filter(|property| !property.is_cleared())
            .map(|property| property.value.as_str())
    }

    /// Resolve a property with a fallback default
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    fn lookup(&self, key: &str, require_inherit: bool) -> Option<&str> {
        if let Some(property) = self.properties.get(key) {
            if require_inherit && !property.inherit {
                // Blocked: a local, non-inheriting holder hides ancestors.
                return None;
            }
            if property.is_cleared() {
                return None;
            }
            return Some(property.value.as_str());
        }
        self.parent_node
            .as_ref()
            .and_then(|parent| parent.lookup(key, true))
    }

    /// Resolve a boolean property
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key).map(parse_bool).unwrap_or(false)
    }

    //
    // NAME / ROUTE / META / THEME ACCESSORS
    //

    /// Localized name, with context fallback
    ///
    /// Resolution order: `name.<locale>.<context>`, `name.<locale>`, id.
    pub fn name(&self, locale: &str, context: Option<&str>) -> String {
        if let Some(context) = context {
            let key =
                format!("{PROPERTY_NAME}{KEY_SEPARATOR}{locale}{KEY_SEPARATOR}{context}");
            if let Some(name) = self.get(&key) {
                return name.to_string();
            }
        }
        let key = format!("{PROPERTY_NAME}{KEY_SEPARATOR}{locale}");
        match self.get(&key) {
            Some(name) => name.to_string(),
            None => self.id.clone().unwrap_or_default(),
        }
    }

    /// Set the localized name
    pub fn set_name(
        &mut self,
        locale: &str,
        name: &str,
        context: Option<&str>,
    ) -> Result<(), NodeError> {
        let key = match context {
            Some(context) => {
                format!("{PROPERTY_NAME}{KEY_SEPARATOR}{locale}{KEY_SEPARATOR}{context}")
            }
            None => format!("{PROPERTY_NAME}{KEY_SEPARATOR}{locale}"),
        };
        self.set(&key, name)
    }

    /// Localized route of this node
    ///
    /// Sites and home pages always route to `/`. For other types the
    /// explicit `route.<locale>` property wins; with `return_default` a
    /// generated `/nodes/<id>/<locale>` route is returned for saved nodes.
    pub fn route(&self, locale: &str, return_default: bool) -> Option<String> {
        if self.node_type == TYPE_SITE || self.node_type == TYPE_HOME {
            return Some("/".to_string());
        }
        let key = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}{locale}");
        if let Some(route) = self.get(&key) {
            return Some(route.to_string());
        }
        if return_default {
            if let Some(id) = &self.id {
                return Some(format!("/nodes/{id}/{locale}"));
            }
        }
        None
    }

    /// Set the localized route
    pub fn set_route(&mut self, locale: &str, route: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}{locale}");
        self.set(&key, route)
    }

    /// All locally set routes, keyed by locale
    pub fn routes(&self) -> BTreeMap<String, String> {
        let prefix = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}");
        self.properties
            .iter()
            .filter(|(key, property)| key.starts_with(&prefix) && !property.is_cleared())
            .map(|(key, property)| (key[prefix.len()..].to_string(), property.value.clone()))
            .collect()
    }

    /// Localized meta value
    pub fn meta(&self, locale: &str, name: &str) -> Option<&str> {
        let key = format!("{PROPERTY_META}{KEY_SEPARATOR}{locale}{KEY_SEPARATOR}{name}");
        self.get(&key)
    }

    /// Set a localized meta value
    pub fn set_meta(&mut self, locale: &str, name: &str, value: &str) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_META}{KEY_SEPARATOR}{locale}{KEY_SEPARATOR}{name}");
        self.set(&key, value)
    }

    /// All meta values of a locale, inherited ancestors merged in
    pub fn metas(&self, locale: &str) -> BTreeMap<String, String> {
        let prefix = format!("{PROPERTY_META}{KEY_SEPARATOR}{locale}{KEY_SEPARATOR}");
        self.collect_metas(&prefix, false)
    }

    fn collect_metas(&self, prefix: &str, require_inherit: bool) -> BTreeMap<String, String> {
        let mut metas = match self.parent_node.as_ref() {
            Some(parent) => parent.collect_metas(prefix, true),
            None => BTreeMap::new(),
        };
        for (key, property) in &self.properties {
            if let Some(name) = key.strip_prefix(prefix) {
                if (require_inherit && !property.inherit) || property.is_cleared() {
                    metas.remove(name);
                } else {
                    metas.insert(name.to_string(), property.value.clone());
                }
            }
        }
        metas
    }

    /// Theme name, inherited down the tree
    pub fn theme(&self) -> Option<&str> {
        self.get(PROPERTY_THEME)
    }

    /// Set the theme name
    pub fn set_theme(&mut self, theme: &str) -> Result<(), NodeError> {
        self.set(PROPERTY_THEME, theme)
    }

    //
    // WIDGETS
    //

    /// Ordered widget instance ids of a region
    pub fn widgets(&self, region: &str) -> Vec<u64> {
        let key = format!("{PROPERTY_WIDGETS}{KEY_SEPARATOR}{region}");
        self.get(&key).map(parse_widget_ids).unwrap_or_default()
    }

    /// Replace the widget list of a region
    pub fn set_widgets(&mut self, region: &str, widget_ids: &[u64]) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_WIDGETS}{KEY_SEPARATOR}{region}");
        self.set(&key, &format_widget_ids(widget_ids))
    }

    /// Append a widget instance to a region
    ///
    /// The local list is seeded from the inherited one on the first local
    /// write, so ancestors keep their own region untouched.
    pub fn add_widget(&mut self, region: &str, widget_id: u64) -> Result<(), NodeError> {
        let mut ids = self.widgets(region);
        ids.push(widget_id);
        self.set_widgets(region, &ids)
    }

    /// Remove a widget instance from a region
    ///
    /// Also purges every `widget.<id>.*` property of the instance.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::WidgetNotFound` when the id is not in the region.
    pub fn delete_widget(&mut self, region: &str, widget_id: u64) -> Result<(), NodeError> {
        let ids = self.widgets(region);
        if !ids.contains(&widget_id) {
            return Err(NodeError::widget_not_found(region, widget_id));
        }
        let remaining: Vec<u64> = ids.into_iter().filter(|id| *id != widget_id).collect();
        self.set_widgets(region, &remaining)?;

        let prefix = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}{KEY_SEPARATOR}");
        let purged: Vec<String> = self
            .properties
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in purged {
            self.properties.remove(&key);
        }
        Ok(())
    }

    /// Reorder the widget list of a region
    ///
    /// # Errors
    ///
    /// Returns `NodeError::WidgetOrderMismatch` naming the offending ids
    /// when `order` is not a permutation of the current list.
    pub fn order_widgets(&mut self, region: &str, order: &[u64]) -> Result<(), NodeError> {
        let current = self.widgets(region);
        let missing: Vec<u64> = current
            .iter()
            .filter(|id| !order.contains(id))
            .copied()
            .collect();
        let extra: Vec<u64> = order
            .iter()
            .filter(|id| !current.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(NodeError::WidgetOrderMismatch {
                region: region.to_string(),
                missing,
                extra,
            });
        }
        self.set_widgets(region, order)
    }

    /// Single widget instance property, inherited lookup
    pub fn widget_property(&self, widget_id: u64, name: &str) -> Option<&str> {
        let key = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}{KEY_SEPARATOR}{name}");
        self.get(&key)
    }

    /// Set a widget instance property
    pub fn set_widget_property(
        &mut self,
        widget_id: u64,
        name: &str,
        value: &str,
    ) -> Result<(), NodeError> {
        let key = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}{KEY_SEPARATOR}{name}");
        self.set(&key, value)
    }

    /// All local properties of a widget instance, keys without the prefix
    pub fn widget_properties(&self, widget_id: u64) -> BTreeMap<String, String> {
        let prefix = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}{widget_id}{KEY_SEPARATOR}");
        self.properties
            .iter()
            .filter(|(key, property)| key.starts_with(&prefix) && !property.is_cleared())
            .map(|(key, property)| (key[prefix.len()..].to_string(), property.value.clone()))
            .collect()
    }

    //
    // PUBLICATION / SECURITY / LOCALES / VISIBILITY
    //

    /// Whether this node is published at the given time
    ///
    /// The `publish` flag gates everything; the optional `publish.start` and
    /// `publish.stop` window narrows it. Malformed window values are treated
    /// as unbounded (the validator reports them before they are saved).
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        if !self.get_flag(PROPERTY_PUBLISH) {
            return false;
        }
        if let Some(start) = self
            .get(PROPERTY_PUBLISH_START)
            .and_then(parse_publish_date)
        {
            if now < start {
                return false;
            }
        }
        if let Some(stop) = self.get(PROPERTY_PUBLISH_STOP).and_then(parse_publish_date) {
            if now >= stop {
                return false;
            }
        }
        true
    }

    /// Mark this node published or unpublished
    pub fn set_published(&mut self, published: bool) -> Result<(), NodeError> {
        self.set(PROPERTY_PUBLISH, if published { BOOL_TRUE } else { "" })
    }

    /// Whether the given security context may see this node
    ///
    /// The inherited `security` property is `everybody` (default),
    /// `anonymous`, `authenticated`, or a comma-separated permission list of
    /// which every permission must be granted.
    pub fn is_allowed(&self, context: &dyn SecurityContext) -> bool {
        match self.get(PROPERTY_SECURITY) {
            None => true,
            Some(SECURITY_EVERYBODY) => true,
            Some(SECURITY_ANONYMOUS) => !context.is_authenticated(),
            Some(SECURITY_AUTHENTICATED) => context.is_authenticated(),
            Some(permissions) => {
                context.is_authenticated()
                    && permissions
                        .split(',')
                        .map(str::trim)
                        .filter(|permission| !permission.is_empty())
                        .all(|permission| context.is_permission_granted(permission))
            }
        }
    }

    /// Set the security constraint
    pub fn set_security(&mut self, security: &str) -> Result<(), NodeError> {
        self.set(PROPERTY_SECURITY, security)
    }

    /// Whether this node is available in the given locale
    ///
    /// The inherited `locales` property is `all` (default) or a
    /// comma-separated locale list.
    pub fn is_available_in_locale(&self, locale: &str) -> bool {
        match self.get(PROPERTY_LOCALES) {
            None => true,
            Some(LOCALES_ALL) => true,
            Some(locales) => locales
                .split(',')
                .map(str::trim)
                .any(|entry| entry == locale),
        }
    }

    /// Restrict the node to a set of locales
    pub fn set_available_locales(&mut self, locales: &str) -> Result<(), NodeError> {
        self.set(PROPERTY_LOCALES, locales)
    }

    /// Whether this node is hidden in menus
    pub fn is_hidden_in_menu(&self) -> bool {
        self.get_flag(PROPERTY_HIDE_MENU)
    }

    /// Whether this node is hidden in breadcrumb trails
    pub fn is_hidden_in_breadcrumbs(&self) -> bool {
        self.get_flag(PROPERTY_HIDE_BREADCRUMB)
    }

    /// Whether this node is hidden in the sitemap
    pub fn is_hidden_in_sitemap(&self) -> bool {
        self.get_flag(PROPERTY_HIDE_SITEMAP)
    }
}

fn parse_publish_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, PUBLISH_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str) -> Node {
        let mut node = Node::new(TYPE_PAGE.to_string(), false);
        node.set_id(id);
        node
    }

    #[test]
    fn test_set_and_get_local() {
        let mut node = page("about");
        node.set("name.en", "About").unwrap();

        assert_eq!(node.get("name.en"), Some("About"));
        assert_eq!(node.get_local("name.en"), Some("About"));
        assert_eq!(node.get("name.nl"), None);
    }

    #[test]
    fn test_set_rejects_empty_key() {
        let mut node = page("about");
        assert_eq!(node.set("", "value"), Err(NodeError::invalid_key("")));
    }

    #[test]
    fn test_set_empty_value_removes_property() {
        let mut node = page("about");
        node.set("name.en", "About").unwrap();
        node.set("name.en", "").unwrap();

        assert_eq!(node.get_local("name.en"), None);
        assert!(node.property("name.en").is_none());
    }

    #[test]
    fn test_inherit_prefix_forces_flag() {
        let mut node = page("about");
        node.set("inherit:theme", "forest").unwrap();

        let property = node.property("theme").unwrap();
        assert_eq!(property.value, "forest");
        assert!(property.inherit);
    }

    #[test]
    fn test_inherit_flag_never_downgrades() {
        let mut node = page("about");
        node.set_with_inherit("theme", "forest", true).unwrap();
        node.set_with_inherit("theme", "meadow", false).unwrap();

        let property = node.property("theme").unwrap();
        assert_eq!(property.value, "meadow");
        assert!(property.inherit);
    }

    #[test]
    fn test_default_inherit_applies_to_new_properties() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("theme", "forest").unwrap();
        assert!(site.property("theme").unwrap().inherit);

        let mut node = page("about");
        node.set("theme", "meadow").unwrap();
        assert!(!node.property("theme").unwrap().inherit);
    }

    #[test]
    fn test_inherited_lookup() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("theme", "forest").unwrap();

        let mut child = page("about");
        child.set_parent_node(site);

        assert_eq!(child.get("theme"), Some("forest"));
        assert_eq!(child.get_local("theme"), None);
    }

    #[test]
    fn test_non_inheriting_parent_value_is_invisible_to_children() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set_with_inherit("banner", "spring sale", false).unwrap();

        let mut child = page("about");
        child.set_parent_node(site);

        assert_eq!(child.get("banner"), None);
    }

    #[test]
    fn test_blocking_ancestor_hides_deeper_values() {
        // home (inherit) -> about (no inherit) -> team
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("banner", "spring sale").unwrap();

        let mut about = page("about");
        about.set_parent_node(site);
        about
            .set_with_inherit("banner", "about only", false)
            .unwrap();
        assert_eq!(about.get("banner"), Some("about only"));

        let mut team = page("team");
        team.set_parent_node(about);

        // The non-inheriting holder blocks the chain; the site value does
        // not leak through.
        assert_eq!(team.get("banner"), None);
    }

    #[test]
    fn test_ancestors_without_the_key_are_transparent() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("banner", "spring sale").unwrap();

        let mut about = page("about");
        about.set_parent_node(site);

        let mut team = page("team");
        team.set_parent_node(about);

        assert_eq!(team.get("banner"), Some("spring sale"));
    }

    #[test]
    fn test_clear_inherited_value_stores_override() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("banner", "spring sale").unwrap();

        let mut about = page("about");
        about.set_parent_node(site);
        about.set("banner", "").unwrap();

        // Cleared for itself...
        assert_eq!(about.get("banner"), None);
        let override_property = about.property("banner").unwrap();
        assert!(override_property.is_cleared());
        assert!(override_property.inherit);

        // ...and for descendants.
        let mut team = page("team");
        team.set_parent_node(about.clone());
        assert_eq!(team.get("banner"), None);
    }

    #[test]
    fn test_clear_without_inheritable_ancestor_is_noop() {
        let mut node = page("about");
        node.set("banner", "").unwrap();
        assert!(node.property("banner").is_none());
    }

    #[test]
    fn test_path_round_trip() {
        let mut node = page("c");
        node.set_parent_path("a-b");

        assert_eq!(node.path().unwrap(), "a-b-c");
        assert_eq!(node.root_node_id().unwrap(), "a");
        assert_eq!(node.parent_node_id(), Some("b"));
        assert_eq!(node.level(), 2);
    }

    #[test]
    fn test_root_path() {
        let node = page("home");
        assert_eq!(node.path().unwrap(), "home");
        assert_eq!(node.root_node_id().unwrap(), "home");
        assert_eq!(node.parent_node_id(), None);
        assert_eq!(node.level(), 0);
    }

    #[test]
    fn test_new_node_has_no_root() {
        let node = Node::new(TYPE_PAGE.to_string(), false);
        assert_eq!(node.path(), Err(NodeError::NoRoot));
        assert_eq!(node.root_node_id(), Err(NodeError::NoRoot));
    }

    #[test]
    fn test_name_fallbacks() {
        let mut node = page("about");
        assert_eq!(node.name("en", None), "about");

        node.set_name("en", "About", None).unwrap();
        assert_eq!(node.name("en", None), "About");
        assert_eq!(node.name("en", Some("menu")), "About");

        node.set_name("en", "About us", Some("menu")).unwrap();
        assert_eq!(node.name("en", Some("menu")), "About us");
        assert_eq!(node.name("en", None), "About");
    }

    #[test]
    fn test_route_default_and_override() {
        let mut node = page("team");
        assert_eq!(node.route("en", true), Some("/nodes/team/en".to_string()));
        assert_eq!(node.route("en", false), None);

        node.set_route("en", "/about/team").unwrap();
        assert_eq!(node.route("en", true), Some("/about/team".to_string()));
    }

    #[test]
    fn test_site_routes_to_slash() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        assert_eq!(site.route("en", false), Some("/".to_string()));

        let mut home = Node::new(TYPE_HOME.to_string(), false);
        home.set_id("homepage");
        assert_eq!(home.route("en", false), Some("/".to_string()));
    }

    #[test]
    fn test_metas_merge_inherited() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set_meta("en", "author", "Canopy").unwrap();

        let mut child = page("about");
        child.set_parent_node(site);
        child.set_meta("en", "description", "About us").unwrap();

        let metas = child.metas("en");
        assert_eq!(metas.get("author").map(String::as_str), Some("Canopy"));
        assert_eq!(
            metas.get("description").map(String::as_str),
            Some("About us")
        );
    }

    #[test]
    fn test_widget_list_round_trip() {
        let mut node = page("about");
        node.set_widgets("column1", &[1, 2, 3]).unwrap();
        assert_eq!(node.widgets("column1"), vec![1, 2, 3]);

        node.add_widget("column1", 7).unwrap();
        assert_eq!(node.widgets("column1"), vec![1, 2, 3, 7]);
    }

    #[test]
    fn test_delete_widget_purges_instance_properties() {
        let mut node = page("about");
        node.set_widgets("column1", &[1, 2, 3]).unwrap();
        node.set_widget_property(2, "title", "Latest news").unwrap();
        node.set_widget_property(2, "limit", "5").unwrap();

        node.delete_widget("column1", 2).unwrap();

        assert_eq!(node.widgets("column1"), vec![1, 3]);
        assert!(node.widget_properties(2).is_empty());

        // Deleting again is an error.
        assert_eq!(
            node.delete_widget("column1", 2),
            Err(NodeError::widget_not_found("column1", 2))
        );
    }

    #[test]
    fn test_order_widgets_requires_permutation() {
        let mut node = page("about");
        node.set_widgets("column1", &[1, 2, 3]).unwrap();

        node.order_widgets("column1", &[3, 1, 2]).unwrap();
        assert_eq!(node.widgets("column1"), vec![3, 1, 2]);

        let error = node.order_widgets("column1", &[3, 1]).unwrap_err();
        assert_eq!(
            error,
            NodeError::WidgetOrderMismatch {
                region: "column1".to_string(),
                missing: vec![2],
                extra: vec![],
            }
        );

        let error = node.order_widgets("column1", &[3, 1, 2, 9]).unwrap_err();
        assert_eq!(
            error,
            NodeError::WidgetOrderMismatch {
                region: "column1".to_string(),
                missing: vec![],
                extra: vec![9],
            }
        );
    }

    #[test]
    fn test_publish_window() {
        let mut node = page("about");
        let now = NaiveDateTime::parse_from_str("2024-06-15 12:00:00", PUBLISH_DATE_FORMAT)
            .unwrap()
            .and_utc();

        assert!(!node.is_published(now));

        node.set_published(true).unwrap();
        assert!(node.is_published(now));

        node.set(PROPERTY_PUBLISH_START, "2024-07-01 00:00:00")
            .unwrap();
        assert!(!node.is_published(now));

        node.set(PROPERTY_PUBLISH_START, "2024-06-01 00:00:00")
            .unwrap();
        node.set(PROPERTY_PUBLISH_STOP, "2024-06-10 00:00:00")
            .unwrap();
        assert!(!node.is_published(now));

        node.set(PROPERTY_PUBLISH_STOP, "2024-06-20 00:00:00")
            .unwrap();
        assert!(node.is_published(now));
    }

    struct Member;

    impl SecurityContext for Member {
        fn is_authenticated(&self) -> bool {
            true
        }

        fn is_permission_granted(&self, permission: &str) -> bool {
            permission == "cms.node.view"
        }
    }

    #[test]
    fn test_security_constraints() {
        use crate::security::AnonymousContext;

        let mut node = page("about");
        assert!(node.is_allowed(&AnonymousContext));
        assert!(node.is_allowed(&Member));

        node.set_security("authenticated").unwrap();
        assert!(!node.is_allowed(&AnonymousContext));
        assert!(node.is_allowed(&Member));

        node.set_security("anonymous").unwrap();
        assert!(node.is_allowed(&AnonymousContext));
        assert!(!node.is_allowed(&Member));

        // Every permission in a list must be granted.
        node.set_security("cms.node.view").unwrap();
        assert!(node.is_allowed(&Member));
        node.set_security("cms.node.view,cms.node.manage").unwrap();
        assert!(!node.is_allowed(&Member));
    }

    #[test]
    fn test_locale_availability() {
        let mut node = page("about");
        assert!(node.is_available_in_locale("en"));

        node.set_available_locales("en,nl").unwrap();
        assert!(node.is_available_in_locale("nl"));
        assert!(!node.is_available_in_locale("fr"));

        node.set_available_locales(LOCALES_ALL).unwrap();
        assert!(node.is_available_in_locale("fr"));
    }

    #[test]
    fn test_serialization_skips_live_links() {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");

        let mut node = page("about");
        node.set_parent_node(site);
        node.set("name.en", "About").unwrap();

        let json = serde_json::to_string(&node).unwrap();
        let deserialized: Node = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id(), Some("about"));
        assert_eq!(deserialized.parent_path(), "home");
        assert!(deserialized.parent_node().is_none());
        assert_eq!(deserialized.get_local("name.en"), Some("About"));
    }
}
