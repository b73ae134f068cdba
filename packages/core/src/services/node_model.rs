//! Node Model - Tree Mutation Engine
//!
//! This module provides the main business logic layer for the content tree:
//!
//! - node construction through the type registry
//! - validation-before-write with pre/post events around every save
//! - cloning (deep, with widget instance remapping and route policy)
//! - subtree reordering from a pre-order child-count encoding
//! - removal with reparenting of orphaned children
//! - trash restore, publishing, breadcrumbs and list flattening
//!
//! Persistence is delegated to a `NodeIo` collaborator; the model owns the
//! explicit per-request cache and invalidates it after every write.
//!
//! # Atomicity
//!
//! Clone, reorder and remove are multi-step operations without a
//! transaction: an IO error mid-way leaves partial writes behind. This is a
//! documented contract, not an oversight; adapters that can do better wrap
//! the calls in their own transaction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::behaviors::NodeTypeManager;
use crate::io::events::{
    EVENT_ORDER_POST, EVENT_ORDER_PRE, EVENT_PUBLISH_POST, EVENT_PUBLISH_PRE, EVENT_REMOVE_POST,
    EVENT_REMOVE_PRE, EVENT_RESTORE_POST, EVENT_RESTORE_PRE, EVENT_SAVE_POST, EVENT_SAVE_PRE,
};
use crate::io::{EventAction, EventSink, NodeCache, NodeEvent, NodeIo, DEFAULT_REVISION};
use crate::models::property::{
    format_widget_ids, parse_widget_ids, NodeProperty, KEY_SEPARATOR, PATH_SEPARATOR,
    PROPERTY_NAME, PROPERTY_ROUTE, PROPERTY_WIDGET, PROPERTY_WIDGETS,
};
use crate::models::{Node, SiteNode, TrashNode};
use crate::services::error::NodeModelError;
use crate::services::validator::NodeValidator;

/// Suffix of property keys holding a node reference, repaired after clones
const NODE_REFERENCE_SUFFIX: &str = ".node";

/// One step of a breadcrumb trail, root first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Localized node name
    pub name: String,

    /// Absolute URL of the node
    pub url: String,
}

/// Pre-order subtree encoding for [`NodeModel::order_nodes`]
///
/// Each entry pairs a node id with the number of entries that follow it as
/// its direct children.
pub type NodeOrder = [(String, usize)];

struct OrderFrame {
    saved_order: u32,
    path: String,
    remaining: usize,
}

/// Core service for tree construction and mutation
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use canopy_core::behaviors::NodeTypeManager;
/// use canopy_core::io::MemoryNodeIo;
/// use canopy_core::services::NodeModel;
///
/// let model = NodeModel::new(
///     Arc::new(MemoryNodeIo::new()),
///     NodeTypeManager::with_default_types(),
/// );
///
/// let mut site = model.create_node("site", None).unwrap();
/// site.set_name("en", "My site", None).unwrap();
/// model.set_node(&mut site, "Creating the site").unwrap();
/// assert!(site.id().is_some());
/// ```
pub struct NodeModel {
    io: Arc<dyn NodeIo>,
    types: NodeTypeManager,
    validator: NodeValidator,
    events: Option<Arc<dyn EventSink>>,
    cache: Mutex<NodeCache>,
}

impl NodeModel {
    /// Create a model over a storage adapter and a type registry
    pub fn new(io: Arc<dyn NodeIo>, types: NodeTypeManager) -> Self {
        Self {
            io,
            types,
            validator: NodeValidator::new(),
            events: None,
            cache: Mutex::new(NodeCache::new()),
        }
    }

    /// Attach an event sink observing tree mutations
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// The type registry this model constructs nodes with
    pub fn node_type_manager(&self) -> &NodeTypeManager {
        &self.types
    }

    //
    // CONSTRUCTION AND LOOKUP
    //

    /// Create a fresh, unsaved node of a registered type
    ///
    /// With a parent, the node is linked under it and takes over its
    /// revision context; no properties are inherited automatically.
    pub fn create_node(
        &self,
        node_type: &str,
        parent: Option<&Node>,
    ) -> Result<Node, NodeModelError> {
        let mut node = self.types.create_node(node_type)?;
        if let Some(parent) = parent {
            if let Some(revision) = parent.revision() {
                node.set_revision(revision);
            }
            node.set_parent_node(parent.clone());
        }
        Ok(node)
    }

    /// All site root nodes
    pub fn get_sites(&self) -> Result<Vec<Node>, NodeModelError> {
        Ok(self.io.get_sites()?)
    }

    /// Root node of a site, wrapped with its revision set
    pub fn get_site(&self, site: &str, revision: &str) -> Result<SiteNode, NodeModelError> {
        let mut node = self
            .io
            .get_site(site, revision)
            .map_err(NodeModelError::from_io)?;
        self.apply_type_defaults(&mut node);
        let mut wrapped = SiteNode::from_node(node)?;
        wrapped.set_revisions(self.io.get_revisions(site)?);
        Ok(wrapped)
    }

    /// A node by id, parent chain materialized, read through the cache
    pub fn get_node(
        &self,
        site: &str,
        revision: &str,
        id: &str,
    ) -> Result<Node, NodeModelError> {
        {
            let cache = self.cache.lock().expect("node cache poisoned");
            if let Some(hit) = cache.get_node(site, revision, id) {
                return Ok(hit.clone());
            }
        }
        let mut node = self
            .io
            .get_node(site, revision, id, None, 0)
            .map_err(NodeModelError::from_io)?;
        self.apply_type_defaults(&mut node);
        self.cache
            .lock()
            .expect("node cache poisoned")
            .set_node(site, revision, node.clone());
        Ok(node)
    }

    /// A node by id with `depth` levels of children loaded
    pub fn get_node_with_children(
        &self,
        site: &str,
        revision: &str,
        id: &str,
        depth: usize,
    ) -> Result<Node, NodeModelError> {
        let mut node = self
            .io
            .get_node(site, revision, id, None, depth)
            .map_err(NodeModelError::from_io)?;
        self.apply_type_defaults(&mut node);
        Ok(node)
    }

    /// Ordered direct children of a path
    pub fn get_children(
        &self,
        site: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<Node>, NodeModelError> {
        let mut children = self.io.get_children(site, revision, path, 1)?;
        for child in &mut children {
            self.apply_type_defaults(child);
        }
        Ok(children)
    }

    /// Every node of a site revision
    pub fn get_nodes(&self, site: &str, revision: &str) -> Result<Vec<Node>, NodeModelError> {
        Ok(self.io.get_nodes(site, revision)?)
    }

    /// Every node of a given type
    pub fn get_nodes_by_type(
        &self,
        site: &str,
        revision: &str,
        node_type: &str,
    ) -> Result<Vec<Node>, NodeModelError> {
        Ok(self.io.get_nodes_by_type(site, revision, node_type)?)
    }

    //
    // VALIDATION AND SAVE
    //

    /// Validate a node against its tree
    ///
    /// Normalizes route values in place and aggregates every issue into a
    /// single `ValidationFailed` error.
    pub fn validate_node(&self, node: &mut Node) -> Result<(), NodeModelError> {
        let issues = self.validator.validate(node, self.io.as_ref())?;
        if !issues.is_empty() {
            return Err(NodeModelError::validation_failed(issues));
        }
        Ok(())
    }

    /// Validate and persist a node, firing save events around the write
    ///
    /// The storage adapter assigns an id on first save.
    pub fn set_node(&self, node: &mut Node, description: &str) -> Result<(), NodeModelError> {
        self.validate_node(node)?;

        self.fire(
            EVENT_SAVE_PRE,
            &NodeEvent::new(EventAction::Save, vec![node.clone()], description),
        );
        self.io.set_node(node)?;
        self.invalidate_cache();
        self.fire(
            EVENT_SAVE_POST,
            &NodeEvent::new(EventAction::Save, vec![node.clone()], description),
        );
        Ok(())
    }

    /// Persist a node without validation or events
    ///
    /// Internal writes of multi-step operations go through here; the data
    /// being written is derived from nodes that were validated when they
    /// entered the tree.
    fn save_raw(&self, node: &mut Node) -> Result<(), NodeModelError> {
        self.io.set_node(node)?;
        self.invalidate_cache();
        Ok(())
    }

    //
    // CLONE
    //

    /// Clone a node, optionally with its whole subtree
    ///
    /// - `recursive` clones every descendant under the fresh copy
    /// - `reorder` inserts the clone right after the source and shifts the
    ///   following siblings; without it the source position is copied
    /// - `keep_original_name` skips the " (clone)" suffix on the top node
    /// - `clone_routes` keeps explicit routes; `None` resolves to true only
    ///   when cloning a whole site, avoiding route collisions below one
    /// - `new_parent` grafts the clone elsewhere in the tree
    ///
    /// Widget instances that are not shared with the parent get fresh ids
    /// allocated from the destination site; `widget.<id>.*` properties
    /// follow. After a full-site clone every `*.node` reference inside the
    /// new tree is rewritten to its cloned counterpart, and the destination
    /// site is re-persisted to commit allocated widget instances.
    ///
    /// Not atomic: an IO failure aborts mid-way and leaves partial writes.
    pub fn clone_node(
        &self,
        node: &Node,
        recursive: bool,
        reorder: bool,
        keep_original_name: bool,
        clone_routes: Option<bool>,
        new_parent: Option<&Node>,
    ) -> Result<Node, NodeModelError> {
        let source_path = node.path()?;
        let source_site_id = node.root_node_id()?;
        let revision = node.revision().unwrap_or(DEFAULT_REVISION).to_string();
        let clone_routes = clone_routes.unwrap_or(node.is_root());

        let parent_path = match new_parent {
            Some(parent) => parent.path()?,
            None => node.parent_path().to_string(),
        };

        // For clones below a root, widget types resolve from the source
        // site and fresh instances allocate on the destination site. A site
        // clone owns a fresh widget namespace and keeps every id verbatim.
        let source_site = if node.is_root() {
            None
        } else {
            Some(SiteNode::from_node(
                self.io
                    .get_site(&source_site_id, &revision)
                    .map_err(NodeModelError::from_io)?,
            )?)
        };
        let mut dest_site = match parent_path.split(PATH_SEPARATOR).next() {
            Some(root) if !root.is_empty() => Some(SiteNode::from_node(
                self.io
                    .get_site(root, &revision)
                    .map_err(NodeModelError::from_io)?,
            )?),
            _ => None,
        };

        debug!(source = %source_path, parent = %parent_path, recursive, "cloning node");

        let description = format!("Cloning node '{source_path}'");
        self.fire(
            EVENT_SAVE_PRE,
            &NodeEvent::new(EventAction::Save, vec![node.clone()], description.as_str()),
        );

        let mut translation: BTreeMap<String, String> = BTreeMap::new();
        let mut clone = self.clone_subtree(
            node,
            &source_site_id,
            &revision,
            &parent_path,
            reorder,
            keep_original_name,
            clone_routes,
            recursive,
            source_site.as_ref(),
            &mut dest_site,
            &mut translation,
        )?;

        if node.is_root() && recursive {
            self.repair_node_references(&mut clone, &revision, &translation)?;
        }

        // Commit widget instances allocated on the destination site.
        if let Some(mut site) = dest_site {
            self.save_raw(site.as_node_mut())?;
        }

        self.fire(
            EVENT_SAVE_POST,
            &NodeEvent::new(EventAction::Save, vec![clone.clone()], description.as_str()),
        );
        Ok(clone)
    }

    #[allow(clippy::too_many_arguments)]
    fn clone_subtree(
        &self,
        source: &Node,
        source_site_id: &str,
        revision: &str,
        parent_path: &str,
        reorder: bool,
        keep_original_name: bool,
        clone_routes: bool,
        recursive: bool,
        source_site: Option<&SiteNode>,
        dest_site: &mut Option<SiteNode>,
        translation: &mut BTreeMap<String, String>,
    ) -> Result<Node, NodeModelError> {
        let node_type = self.types.get_node_type(source.node_type())?;
        let mut clone = node_type.create_node();
        clone.set_revision(revision);
        clone.set_parent_path(parent_path);
        if let Some(order) = source.order_index() {
            clone.set_order_index(order);
        }

        let siblings = if parent_path.is_empty() {
            Vec::new()
        } else {
            let dest_root = parent_path
                .split(PATH_SEPARATOR)
                .next()
                .expect("non-empty parent path");
            self.io.get_children(dest_root, revision, parent_path, 1)?
        };

        if reorder {
            let insert_at = source.order_index().unwrap_or(0) + 1;
            clone.set_order_index(insert_at);
            for sibling in &siblings {
                if sibling.order_index().unwrap_or(0) >= insert_at {
                    let mut shifted = sibling.clone();
                    shifted.take_parent_node();
                    shifted.set_order_index(shifted.order_index().unwrap_or(0) + 1);
                    self.save_raw(&mut shifted)?;
                }
            }
        }

        self.clone_node_properties(
            source,
            &mut clone,
            &siblings,
            keep_original_name,
            clone_routes,
            source_site,
            dest_site,
        )?;

        self.save_raw(&mut clone)?;
        if let (Some(source_id), Some(clone_id)) = (source.id(), clone.id()) {
            translation.insert(source_id.to_string(), clone_id.to_string());
        }

        if recursive {
            let source_path = source.path()?;
            let clone_path = clone.path()?;
            let children = self
                .io
                .get_children(source_site_id, revision, &source_path, 1)?;
            for child in children {
                self.clone_subtree(
                    &child,
                    source_site_id,
                    revision,
                    &clone_path,
                    false,
                    true,
                    clone_routes,
                    true,
                    source_site,
                    dest_site,
                    translation,
                )?;
            }
        }
        Ok(clone)
    }

    /// Copy the property bag of `source` onto `clone` with the remap rules
    #[allow(clippy::too_many_arguments)]
    fn clone_node_properties(
        &self,
        source: &Node,
        clone: &mut Node,
        siblings: &[Node],
        keep_original_name: bool,
        clone_routes: bool,
        source_site: Option<&SiteNode>,
        dest_site: &mut Option<SiteNode>,
    ) -> Result<(), NodeModelError> {
        let widgets_prefix = format!("{PROPERTY_WIDGETS}{KEY_SEPARATOR}");
        let widget_prefix = format!("{PROPERTY_WIDGET}{KEY_SEPARATOR}");
        let route_prefix = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}");
        let name_prefix = format!("{PROPERTY_NAME}{KEY_SEPARATOR}");

        // First pass: widget regions, building the instance translation.
        let mut widget_map: BTreeMap<u64, u64> = BTreeMap::new();
        for (key, property) in source.properties() {
            if !key.starts_with(&widgets_prefix) {
                continue;
            }
            let inherited: Vec<u64> = source
                .inherited(key)
                .map(parse_widget_ids)
                .unwrap_or_default();
            let mut remapped = Vec::new();
            for widget_id in parse_widget_ids(&property.value) {
                if inherited.contains(&widget_id) {
                    // Shared with the parent: keep the inherited instance.
                    remapped.push(widget_id);
                    continue;
                }
                let widget_type = source_site
                    .and_then(|site| site.widget_type(widget_id))
                    .map(str::to_string);
                match (widget_type, dest_site.as_mut()) {
                    (Some(widget_type), Some(site)) => {
                        let new_id = site.create_widget(&widget_type)?;
                        widget_map.insert(widget_id, new_id);
                        remapped.push(new_id);
                    }
                    // Site clones (and unknown instances) keep their ids.
                    _ => remapped.push(widget_id),
                }
            }
            clone.set_raw_property(NodeProperty::new(
                key,
                format_widget_ids(&remapped),
                property.inherit,
            ));
        }

        // Second pass: everything else.
        for (key, property) in source.properties() {
            if key.starts_with(&widgets_prefix) {
                continue;
            }

            if let Some(rest) = key.strip_prefix(&widget_prefix) {
                let mut segments = rest.splitn(2, KEY_SEPARATOR);
                let instance = segments.next().unwrap_or_default();
                match (instance.parse::<u64>().ok(), segments.next()) {
                    (Some(widget_id), Some(name)) => {
                        let widget_id = widget_map.get(&widget_id).copied().unwrap_or(widget_id);
                        clone.set_raw_property(NodeProperty::new(
                            format!("{widget_prefix}{widget_id}{KEY_SEPARATOR}{name}"),
                            property.value.clone(),
                            property.inherit,
                        ));
                    }
                    // Two-segment keys are the site's widget table.
                    _ => clone.set_raw_property(property.clone()),
                }
                continue;
            }

            if key.starts_with(&route_prefix) {
                if clone_routes {
                    clone.set_raw_property(property.clone());
                }
                continue;
            }

            if let Some(locale) = key.strip_prefix(&name_prefix) {
                if !keep_original_name && !locale.contains(KEY_SEPARATOR) {
                    let existing: Vec<String> = siblings
                        .iter()
                        .map(|sibling| sibling.name(locale, None))
                        .collect();
                    clone.set_raw_property(NodeProperty::new(
                        key,
                        clone_name(&existing, &property.value),
                        property.inherit,
                    ));
                    continue;
                }
            }

            clone.set_raw_property(property.clone());
        }
        Ok(())
    }

    /// Rewrite `*.node` references inside a cloned tree to the new ids
    fn repair_node_references(
        &self,
        clone: &mut Node,
        revision: &str,
        translation: &BTreeMap<String, String>,
    ) -> Result<(), NodeModelError> {
        let clone_id = clone
            .id()
            .expect("clone was saved before reference repair")
            .to_string();
        let clone_path = clone.path()?;

        let mut nodes = self.io.get_nodes_by_path(&clone_id, revision, &clone_path)?;
        nodes.push(clone.clone());

        for mut fix in nodes {
            let referencing: Vec<(String, NodeProperty)> = fix
                .properties()
                .iter()
                .filter(|(key, _)| key.ends_with(NODE_REFERENCE_SUFFIX))
                .map(|(key, property)| (key.clone(), property.clone()))
                .collect();

            let mut changed = false;
            for (key, property) in referencing {
                if let Some(new_id) = translation.get(&property.value) {
                    fix.set_raw_property(NodeProperty::new(key, new_id.clone(), property.inherit));
                    changed = true;
                }
            }
            if changed {
                let fixed_id = fix.id().map(str::to_string);
                self.save_raw(&mut fix)?;
                if fixed_id.as_deref() == Some(clone_id.as_str()) {
                    *clone = fix;
                }
            }
        }
        Ok(())
    }

    //
    // REORDER
    //

    /// Reorder (and possibly reparent) the whole subtree under a parent
    ///
    /// `order` is a pre-order flattening: each entry's count says how many
    /// of the following entries are that entry's direct children. Every
    /// stored descendant of the parent must appear exactly once.
    ///
    /// # Errors
    ///
    /// `OrderingMismatch` when stored nodes are missing from the encoding,
    /// when entries name nodes that are not descendants of the parent, or
    /// when the child counts do not add up.
    pub fn order_nodes(
        &self,
        site: &str,
        revision: &str,
        parent_id: &str,
        order: &NodeOrder,
    ) -> Result<(), NodeModelError> {
        let parent = self.get_node(site, revision, parent_id)?;
        let parent_path = parent.path()?;

        let mut pool: BTreeMap<String, Node> = self
            .io
            .get_nodes_by_path(site, revision, &parent_path)?
            .into_iter()
            .filter_map(|node| {
                let id = node.id().map(|id| id.to_string());
                id.map(|id| (id, node))
            })
            .collect();

        let mut frames: Vec<OrderFrame> = Vec::new();
        let mut current_path = parent_path.clone();
        let mut order_index: u32 = 1;
        let mut changed: Vec<Node> = Vec::new();

        for (node_id, child_count) in order {
            let Some(mut node) = pool.remove(node_id) else {
                return Err(NodeModelError::ordering_mismatch(
                    Vec::new(),
                    vec![node_id.clone()],
                ));
            };

            let moved = node.parent_path() != current_path
                || node.order_index() != Some(order_index);
            node.set_parent_path(current_path.as_str());
            node.set_order_index(order_index);
            let node_path = node.path()?;
            if moved {
                changed.push(node);
            }

            if *child_count > 0 {
                frames.push(OrderFrame {
                    saved_order: order_index,
                    path: current_path.clone(),
                    remaining: *child_count,
                });
                current_path = node_path;
                order_index = 1;
            } else {
                order_index += 1;
                // A finished entry consumes one slot of the enclosing frame;
                // a finished frame consumes one of its own parent.
                while let Some(top) = frames.last_mut() {
                    top.remaining -= 1;
                    if top.remaining == 0 {
                        order_index = top.saved_order + 1;
                        current_path = top.path.clone();
                        frames.pop();
                    } else {
                        break;
                    }
                }
            }
        }

        if !frames.is_empty() {
            return Err(NodeModelError::ordering_broken(
                "child counts exceed the provided entries",
            ));
        }
        if !pool.is_empty() {
            let mut missing: Vec<String> = pool.into_keys().collect();
            missing.sort();
            return Err(NodeModelError::ordering_mismatch(missing, Vec::new()));
        }

        debug!(parent = %parent_path, nodes = changed.len(), "reordering subtree");
        let description = format!("Reordering nodes under '{parent_path}'");
        self.fire(
            EVENT_ORDER_PRE,
            &NodeEvent::new(EventAction::Order, changed.clone(), description.as_str()),
        );
        for node in &mut changed {
            self.save_raw(node)?;
        }
        self.fire(
            EVENT_ORDER_POST,
            &NodeEvent::new(EventAction::Order, changed, description.as_str()),
        );
        Ok(())
    }

    //
    // REMOVE / TRASH / PUBLISH
    //

    /// Remove a node from the live tree
    ///
    /// Recursive removal deletes the whole subtree depth-first. Flat
    /// removal promotes the direct children to the removed node's parent,
    /// interleaving them at the removed position, and closes the order gap
    /// for the later siblings. Removed nodes land in the site's trash.
    ///
    /// Not atomic: an IO failure aborts mid-way and leaves partial writes.
    pub fn remove_node(&self, node: &Node, recursive: bool) -> Result<(), NodeModelError> {
        let site = node.root_node_id()?;
        let revision = node.revision().unwrap_or(DEFAULT_REVISION).to_string();
        let path = node.path()?;

        let description = format!("Removing node '{path}'");
        self.fire(
            EVENT_REMOVE_PRE,
            &NodeEvent::new(EventAction::Remove, vec![node.clone()], description.as_str()),
        );

        // A root has no parent to promote children to.
        if recursive || node.is_root() {
            self.io.remove_node(node, true)?;
        } else {
            let children = self.io.get_children(&site, &revision, &path, 1)?;
            let siblings = self
                .io
                .get_children(&site, &revision, node.parent_path(), 1)?;
            let removed_order = node.order_index().unwrap_or(1);
            let promoted = children.len() as i64;

            for (index, child) in children.into_iter().enumerate() {
                let mut child = child;
                let old_path = child.path()?;
                child.take_parent_node();
                child.set_parent_path(node.parent_path());
                child.set_order_index(removed_order + index as u32);
                self.save_raw(&mut child)?;

                // The subtree below keeps its shape; only the path prefix
                // changes.
                let new_path = child.path()?;
                for mut descendant in self.io.get_nodes_by_path(&site, &revision, &old_path)? {
                    let suffix = descendant.parent_path()[old_path.len()..].to_string();
                    descendant.set_parent_path(format!("{new_path}{suffix}"));
                    self.save_raw(&mut descendant)?;
                }
            }

            let delta = promoted - 1;
            if delta != 0 {
                for sibling in siblings {
                    if sibling.id() == node.id() {
                        continue;
                    }
                    let Some(order) = sibling.order_index() else {
                        continue;
                    };
                    if order > removed_order {
                        let mut shifted = sibling;
                        shifted.take_parent_node();
                        shifted.set_order_index((order as i64 + delta) as u32);
                        self.save_raw(&mut shifted)?;
                    }
                }
            }

            self.io.remove_node(node, false)?;
        }

        self.invalidate_cache();
        self.fire(
            EVENT_REMOVE_POST,
            &NodeEvent::new(EventAction::Remove, vec![node.clone()], description.as_str()),
        );
        Ok(())
    }

    /// All trash entries of a site
    pub fn get_trash_nodes(&self, site: &str) -> Result<Vec<TrashNode>, NodeModelError> {
        Ok(self.io.get_trash_nodes(site)?)
    }

    /// A trash entry by its trash id
    pub fn get_trash_node(
        &self,
        site: &str,
        trash_id: &str,
    ) -> Result<TrashNode, NodeModelError> {
        Ok(self.io.get_trash_node(site, trash_id)?)
    }

    /// Restore trash entries into the live tree
    ///
    /// Entries are sorted by their original path and order before the
    /// adapter restores them, so parents come back before their children
    /// and sibling order is preserved.
    pub fn restore_trash_nodes(
        &self,
        site: &str,
        revision: &str,
        mut trash_nodes: Vec<TrashNode>,
        new_parent: Option<&Node>,
    ) -> Result<(), NodeModelError> {
        trash_nodes.sort_by_key(|entry| {
            (
                entry.node().path().unwrap_or_default(),
                entry.node().order_index().unwrap_or(0),
            )
        });
        let new_parent_path = new_parent.map(Node::path).transpose()?;

        let description = format!("Restoring {} node(s) from trash", trash_nodes.len());
        let nodes: Vec<Node> = trash_nodes.iter().map(|entry| entry.node().clone()).collect();
        self.fire(
            EVENT_RESTORE_PRE,
            &NodeEvent::new(EventAction::Restore, nodes.clone(), description.as_str()),
        );

        self.io
            .restore_trash_nodes(site, revision, trash_nodes, new_parent_path.as_deref())?;
        self.invalidate_cache();

        self.fire(
            EVENT_RESTORE_POST,
            &NodeEvent::new(EventAction::Restore, nodes, description.as_str()),
        );
        Ok(())
    }

    /// Restore trash entries referenced by their trash ids
    pub fn restore_trash_nodes_by_id(
        &self,
        site: &str,
        revision: &str,
        trash_ids: &[String],
        new_parent: Option<&Node>,
    ) -> Result<(), NodeModelError> {
        let mut entries = Vec::with_capacity(trash_ids.len());
        for trash_id in trash_ids {
            entries.push(self.io.get_trash_node(site, trash_id)?);
        }
        self.restore_trash_nodes(site, revision, entries, new_parent)
    }

    /// Copy a node (and with `recursive` its subtree) into another revision
    pub fn publish(
        &self,
        node: &Node,
        revision: &str,
        recursive: bool,
    ) -> Result<(), NodeModelError> {
        let path = node.path()?;
        let description = format!("Publishing node '{path}' to revision '{revision}'");
        self.fire(
            EVENT_PUBLISH_PRE,
            &NodeEvent::new(EventAction::Publish, vec![node.clone()], description.as_str()),
        );
        self.io.publish(node, revision, recursive)?;
        self.invalidate_cache();
        self.fire(
            EVENT_PUBLISH_POST,
            &NodeEvent::new(EventAction::Publish, vec![node.clone()], description.as_str()),
        );
        Ok(())
    }

    //
    // DERIVED VIEWS
    //

    /// Breadcrumb trail of a node, root first
    ///
    /// Walks the materialized parent chain, skipping nodes hidden in
    /// breadcrumbs. URLs are the base URL joined with each node's route.
    pub fn breadcrumbs(&self, node: &Node, locale: &str, base_url: &str) -> Vec<Breadcrumb> {
        let mut trail = Vec::new();
        let mut current = Some(node);
        while let Some(step) = current {
            if !step.is_hidden_in_breadcrumbs() {
                if let Some(route) = step.route(locale, true) {
                    trail.push(Breadcrumb {
                        name: step.name(locale, None),
                        url: format!("{base_url}{route}"),
                    });
                }
            }
            current = step.parent_node();
        }
        trail.reverse();
        trail
    }

    /// Flat pre-order list of a site's nodes for pickers
    ///
    /// Entries are (node id, name) pairs; names are indented with dashes by
    /// depth below the site root.
    pub fn node_list(
        &self,
        site: &str,
        revision: &str,
        locale: &str,
    ) -> Result<Vec<(String, String)>, NodeModelError> {
        let nodes = self.io.get_nodes(site, revision)?;

        let mut by_parent: BTreeMap<String, Vec<&Node>> = BTreeMap::new();
        for node in &nodes {
            if node.is_root() {
                continue;
            }
            by_parent
                .entry(node.parent_path().to_string())
                .or_default()
                .push(node);
        }
        for children in by_parent.values_mut() {
            children.sort_by_key(|node| {
                (
                    node.order_index().unwrap_or(u32::MAX),
                    node.id().unwrap_or_default().to_string(),
                )
            });
        }

        let mut list = Vec::new();
        flatten_into(&by_parent, site, 0, locale, &mut list);
        Ok(list)
    }

    //
    // INTERNALS
    //

    /// Restore the per-type default inherit policy on fetched nodes
    fn apply_type_defaults(&self, node: &mut Node) {
        if let Ok(node_type) = self.types.get_node_type(node.node_type()) {
            node.set_default_inherit(node_type.default_inherit());
        }
        if let Some(children) = node.children_mut() {
            let mut children = std::mem::take(children);
            for child in &mut children {
                self.apply_type_defaults(child);
            }
            node.set_children(children);
        }
    }

    fn invalidate_cache(&self) {
        self.cache.lock().expect("node cache poisoned").invalidate();
    }

    /// Best-effort event emission; a missing or failing sink never affects
    /// the operation
    fn fire(&self, name: &str, event: &NodeEvent) {
        if let Some(sink) = &self.events {
            if let Err(error) = sink.trigger_event(name, event) {
                warn!(event = name, %error, "event sink failed");
            }
        }
    }
}

/// Pick a " (clone)" suffixed name that is unique among the given names
fn clone_name(existing: &[String], original: &str) -> String {
    let mut candidate = format!("{original} (clone)");
    let mut index = 2;
    while existing.iter().any(|name| name == &candidate) {
        candidate = format!("{original} (clone {index})");
        index += 1;
    }
    candidate
}

fn flatten_into(
    by_parent: &BTreeMap<String, Vec<&Node>>,
    path: &str,
    level: usize,
    locale: &str,
    list: &mut Vec<(String, String)>,
) {
    let Some(children) = by_parent.get(path) else {
        return;
    };
    for child in children {
        let Some(id) = child.id() else { continue };
        let name = child.name(locale, None);
        let entry = if level == 0 {
            name
        } else {
            format!("{} {}", "-".repeat(level), name)
        };
        list.push((id.to_string(), entry));
        if let Ok(child_path) = child.path() {
            flatten_into(by_parent, &child_path, level + 1, locale, list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_name_suffixes() {
        assert_eq!(clone_name(&[], "About"), "About (clone)");

        let existing = vec!["About".to_string(), "About (clone)".to_string()];
        assert_eq!(clone_name(&existing, "About"), "About (clone 2)");

        let existing = vec![
            "About (clone)".to_string(),
            "About (clone 2)".to_string(),
        ];
        assert_eq!(clone_name(&existing, "About"), "About (clone 3)");
    }
}
