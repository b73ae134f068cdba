//! In-Memory Storage Adapter
//!
//! Reference implementation of `NodeIo` backed by plain maps. It is the
//! adapter every integration test runs against and shows real adapters
//! what is expected of them: id assignment, default revision, parent
//! chain materialization, per-site trash and revision-copy publishing
//! all live here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::io::{IoError, NodeIo};
use crate::models::property::PATH_SEPARATOR;
use crate::models::{Node, TrashNode};

/// Revision assigned to nodes saved without one
pub const DEFAULT_REVISION: &str = "draft";

#[derive(Default)]
struct SiteRecord {
    /// revision -> node id -> node (stored without live links)
    revisions: BTreeMap<String, BTreeMap<String, Node>>,

    /// trash id -> entry
    trash: BTreeMap<String, TrashNode>,
}

#[derive(Default)]
struct MemoryStore {
    sites: BTreeMap<String, SiteRecord>,
}

/// In-memory `NodeIo` adapter
///
/// # Examples
///
/// ```rust
/// use canopy_core::io::{MemoryNodeIo, NodeIo};
/// use canopy_core::models::Node;
///
/// let io = MemoryNodeIo::new();
/// let mut site = Node::new("site".to_string(), true);
/// io.set_node(&mut site).unwrap();
/// assert!(site.id().is_some());
/// ```
#[derive(Default)]
pub struct MemoryNodeIo {
    inner: Mutex<MemoryStore>,
}

impl MemoryNodeIo {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn with_revision<'a>(
        store: &'a MemoryStore,
        site: &str,
        revision: &str,
    ) -> Result<&'a BTreeMap<String, Node>, IoError> {
        let record = store
            .sites
            .get(site)
            .ok_or_else(|| IoError::site_not_found(site))?;
        record
            .revisions
            .get(revision)
            .ok_or_else(|| IoError::revision_not_found(site, revision))
    }

    /// Clone a node and attach its live parent chain from the stored map
    fn materialize(nodes: &BTreeMap<String, Node>, node: &Node, children_depth: usize) -> Node {
        let mut result = node.clone();
        if let Some(parent) = Self::build_chain(nodes, node.parent_path()) {
            result.set_parent_node(parent);
        }
        if children_depth > 0 {
            if let Ok(path) = result.path() {
                result.set_children(Self::collect_children(nodes, &path, children_depth));
            }
        }
        result
    }

    /// Build the root-to-parent chain for a materialized path
    fn build_chain(nodes: &BTreeMap<String, Node>, parent_path: &str) -> Option<Node> {
        if parent_path.is_empty() {
            return None;
        }
        let mut chain: Option<Node> = None;
        for segment in parent_path.split(PATH_SEPARATOR) {
            let mut ancestor = nodes.get(segment)?.clone();
            if let Some(previous) = chain.take() {
                ancestor.set_parent_node(previous);
            }
            chain = Some(ancestor);
        }
        chain
    }

    fn collect_children(nodes: &BTreeMap<String, Node>, path: &str, depth: usize) -> Vec<Node> {
        let mut children: Vec<Node> = nodes
            .values()
            .filter(|node| node.parent_path() == path)
            .cloned()
            .collect();
        children.sort_by_key(|node| {
            (
                node.order_index().unwrap_or(u32::MAX),
                node.id().unwrap_or_default().to_string(),
            )
        });
        if depth > 1 {
            for child in &mut children {
                if let Ok(child_path) = child.path() {
                    child.set_children(Self::collect_children(nodes, &child_path, depth - 1));
                }
            }
        }
        children
    }

    fn is_descendant_path(path: &str, ancestor_path: &str) -> bool {
        path == ancestor_path
            || path.starts_with(&format!("{ancestor_path}{PATH_SEPARATOR}"))
    }

    /// Strip transient state before storing
    fn detach(node: &Node) -> Node {
        let mut stored = node.clone();
        stored.take_parent_node();
        stored.clear_children();
        stored
    }
}

impl NodeIo for MemoryNodeIo {
    fn get_sites(&self) -> Result<Vec<Node>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let mut sites = Vec::new();
        for (site_id, record) in &store.sites {
            for nodes in record.revisions.values() {
                if let Some(root) = nodes.get(site_id) {
                    sites.push(root.clone());
                }
            }
        }
        Ok(sites)
    }

    fn get_revisions(&self, site: &str) -> Result<BTreeSet<String>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let record = store
            .sites
            .get(site)
            .ok_or_else(|| IoError::site_not_found(site))?;
        Ok(record.revisions.keys().cloned().collect())
    }

    fn get_site(&self, site: &str, revision: &str) -> Result<Node, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        let root = nodes
            .get(site)
            .ok_or_else(|| IoError::node_not_found(site))?;
        Ok(Self::materialize(nodes, root, 0))
    }

    fn get_node(
        &self,
        site: &str,
        revision: &str,
        id: &str,
        node_type: Option<&str>,
        children_depth: usize,
    ) -> Result<Node, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        let node = nodes.get(id).ok_or_else(|| IoError::node_not_found(id))?;
        if let Some(expected) = node_type {
            if node.node_type() != expected {
                return Err(IoError::node_type_mismatch(id, expected, node.node_type()));
            }
        }
        Ok(Self::materialize(nodes, node, children_depth))
    }

    fn get_children(
        &self,
        site: &str,
        revision: &str,
        path: &str,
        depth: usize,
    ) -> Result<Vec<Node>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        let chain = Self::build_chain(nodes, path);
        let mut children = Self::collect_children(nodes, path, depth.max(1));
        if let Some(parent) = chain {
            for child in &mut children {
                child.set_parent_node(parent.clone());
            }
        }
        Ok(children)
    }

    fn get_nodes(&self, site: &str, revision: &str) -> Result<Vec<Node>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        Ok(nodes.values().cloned().collect())
    }

    fn get_nodes_by_type(
        &self,
        site: &str,
        revision: &str,
        node_type: &str,
    ) -> Result<Vec<Node>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        Ok(nodes
            .values()
            .filter(|node| node.node_type() == node_type)
            .cloned()
            .collect())
    }

    fn get_nodes_by_path(
        &self,
        site: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<Node>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let nodes = Self::with_revision(&store, site, revision)?;
        let prefix = format!("{path}{PATH_SEPARATOR}");
        Ok(nodes
            .values()
            .filter(|node| {
                node.parent_path() == path || node.parent_path().starts_with(&prefix)
            })
            .cloned()
            .collect())
    }

    fn set_node(&self, node: &mut Node) -> Result<(), IoError> {
        let mut store = self.inner.lock().expect("memory store poisoned");

        if node.revision().is_none() {
            node.set_revision(DEFAULT_REVISION);
        }
        let revision = node.revision().expect("revision just set").to_string();

        if node.id().is_none() {
            node.set_id(Uuid::new_v4().to_string());
        }

        let site_id = if node.is_root() {
            node.id().expect("id just set").to_string()
        } else {
            node.parent_path()
                .split(PATH_SEPARATOR)
                .next()
                .expect("non-empty parent path")
                .to_string()
        };

        if !node.is_root() && !store.sites.contains_key(&site_id) {
            return Err(IoError::site_not_found(&site_id));
        }

        let record = store.sites.entry(site_id).or_default();
        let nodes = record.revisions.entry(revision).or_default();

        if node.order_index().is_none() {
            let next = nodes
                .values()
                .filter(|sibling| sibling.parent_path() == node.parent_path())
                .filter_map(|sibling| sibling.order_index())
                .max()
                .unwrap_or(0)
                + 1;
            node.set_order_index(next);
        }

        let id = node.id().expect("id just set").to_string();
        nodes.insert(id, Self::detach(node));
        Ok(())
    }

    fn remove_node(&self, node: &Node, recursive: bool) -> Result<(), IoError> {
        let mut store = self.inner.lock().expect("memory store poisoned");

        let site_id = node
            .root_node_id()
            .map_err(|_| IoError::storage("cannot remove a node without a root"))?;
        let revision = node.revision().unwrap_or(DEFAULT_REVISION).to_string();
        let path = node
            .path()
            .map_err(|_| IoError::storage("cannot remove an unsaved node"))?;
        let id = node.id().expect("path implies id").to_string();

        let record = store
            .sites
            .get_mut(&site_id)
            .ok_or_else(|| IoError::site_not_found(&site_id))?;
        let nodes = record
            .revisions
            .get_mut(&revision)
            .ok_or_else(|| IoError::revision_not_found(&site_id, &revision))?;

        let mut removed = Vec::new();
        match nodes.remove(&id) {
            Some(stored) => removed.push(stored),
            None => return Err(IoError::node_not_found(&id)),
        }
        if recursive {
            let descendant_ids: Vec<String> = nodes
                .values()
                .filter(|candidate| Self::is_descendant_path(candidate.parent_path(), &path))
                .filter_map(|candidate| candidate.id().map(str::to_string))
                .collect();
            for descendant_id in descendant_ids {
                if let Some(stored) = nodes.remove(&descendant_id) {
                    removed.push(stored);
                }
            }
        }

        let now = Utc::now();
        for stored in removed {
            let trash_id = Uuid::new_v4().to_string();
            record
                .trash
                .insert(trash_id.clone(), TrashNode::new(trash_id, now, stored));
        }
        Ok(())
    }

    fn get_trash_nodes(&self, site: &str) -> Result<Vec<TrashNode>, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let record = store
            .sites
            .get(site)
            .ok_or_else(|| IoError::site_not_found(site))?;
        Ok(record.trash.values().cloned().collect())
    }

    fn get_trash_node(&self, site: &str, trash_id: &str) -> Result<TrashNode, IoError> {
        let store = self.inner.lock().expect("memory store poisoned");
        let record = store
            .sites
            .get(site)
            .ok_or_else(|| IoError::site_not_found(site))?;
        record
            .trash
            .get(trash_id)
            .cloned()
            .ok_or_else(|| IoError::trash_node_not_found(trash_id))
    }

    fn restore_trash_nodes(
        &self,
        site: &str,
        revision: &str,
        trash_nodes: Vec<TrashNode>,
        new_parent: Option<&str>,
    ) -> Result<(), IoError> {
        let mut store = self.inner.lock().expect("memory store poisoned");
        let record = store
            .sites
            .get_mut(site)
            .ok_or_else(|| IoError::site_not_found(site))?;

        for entry in trash_nodes {
            let trash_id = entry.id().to_string();
            let entry = record
                .trash
                .remove(&trash_id)
                .ok_or_else(|| IoError::trash_node_not_found(&trash_id))?;

            let mut node = entry.into_node();
            node.set_revision(revision);
            if let Some(parent) = new_parent {
                node.set_parent_path(parent);
            }

            let nodes = record.revisions.entry(revision.to_string()).or_default();

            // Fall back to the site root when the original parent is gone.
            if let Some(parent_id) = node.parent_node_id() {
                if !nodes.contains_key(parent_id) {
                    node.set_parent_path(site);
                }
            }

            let next = nodes
                .values()
                .filter(|sibling| sibling.parent_path() == node.parent_path())
                .filter_map(|sibling| sibling.order_index())
                .max()
                .unwrap_or(0)
                + 1;
            node.set_order_index(next);

            let id = node
                .id()
                .ok_or_else(|| IoError::storage("trash entry holds an unsaved node"))?
                .to_string();
            nodes.insert(id, Self::detach(&node));
        }
        Ok(())
    }

    fn publish(&self, node: &Node, revision: &str, recursive: bool) -> Result<(), IoError> {
        let mut store = self.inner.lock().expect("memory store poisoned");

        let site_id = node
            .root_node_id()
            .map_err(|_| IoError::storage("cannot publish a node without a root"))?;
        let source_revision = node.revision().unwrap_or(DEFAULT_REVISION).to_string();
        let path = node
            .path()
            .map_err(|_| IoError::storage("cannot publish an unsaved node"))?;
        let id = node.id().expect("path implies id").to_string();

        let record = store
            .sites
            .get_mut(&site_id)
            .ok_or_else(|| IoError::site_not_found(&site_id))?;
        let source = record
            .revisions
            .get(&source_revision)
            .ok_or_else(|| IoError::revision_not_found(&site_id, &source_revision))?;

        let mut published: Vec<Node> = Vec::new();

        // Ancestors must exist in the target revision for path integrity.
        for segment in node.parent_path().split(PATH_SEPARATOR) {
            if segment.is_empty() {
                continue;
            }
            if let Some(ancestor) = source.get(segment) {
                published.push(ancestor.clone());
            }
        }

        let subject = source.get(&id).ok_or_else(|| IoError::node_not_found(&id))?;
        published.push(subject.clone());

        if recursive {
            published.extend(
                source
                    .values()
                    .filter(|candidate| Self::is_descendant_path(candidate.parent_path(), &path))
                    .cloned(),
            );
        }

        let target = record.revisions.entry(revision.to_string()).or_default();
        for mut copy in published {
            copy.set_revision(revision);
            if let Some(copy_id) = copy.id().map(str::to_string) {
                target.insert(copy_id, copy);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TYPE_PAGE, TYPE_SITE};

    fn saved_site(io: &MemoryNodeIo) -> Node {
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        io.set_node(&mut site).unwrap();
        site
    }

    fn saved_child(io: &MemoryNodeIo, parent: &Node, id: &str) -> Node {
        let mut node = Node::new(TYPE_PAGE.to_string(), false);
        node.set_id(id);
        node.set_parent_path(parent.path().unwrap());
        node.set_revision(DEFAULT_REVISION);
        io.set_node(&mut node).unwrap();
        node
    }

    #[test]
    fn test_set_node_assigns_id_and_revision() {
        let io = MemoryNodeIo::new();
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        io.set_node(&mut site).unwrap();

        assert!(site.id().is_some());
        assert_eq!(site.revision(), Some(DEFAULT_REVISION));
    }

    #[test]
    fn test_set_node_assigns_dense_order() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        let a = saved_child(&io, &site, "a");
        let b = saved_child(&io, &site, "b");

        assert_eq!(a.order_index(), Some(1));
        assert_eq!(b.order_index(), Some(2));
    }

    #[test]
    fn test_get_node_materializes_parent_chain() {
        let io = MemoryNodeIo::new();
        let mut site = Node::new(TYPE_SITE.to_string(), true);
        site.set_id("home");
        site.set("theme", "forest").unwrap();
        io.set_node(&mut site).unwrap();
        let about = saved_child(&io, &site, "about");
        saved_child(&io, &about, "team");

        let team = io
            .get_node("home", DEFAULT_REVISION, "team", None, 0)
            .unwrap();
        assert_eq!(team.parent_path(), "home-about");
        assert_eq!(team.get("theme"), Some("forest"));
    }

    #[test]
    fn test_get_node_type_check() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        saved_child(&io, &site, "about");

        let error = io
            .get_node("home", DEFAULT_REVISION, "about", Some(TYPE_SITE), 0)
            .unwrap_err();
        assert!(matches!(error, IoError::NodeTypeMismatch { .. }));
    }

    #[test]
    fn test_get_children_ordered_with_depth() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        let about = saved_child(&io, &site, "about");
        saved_child(&io, &site, "contact");
        saved_child(&io, &about, "team");

        let children = io.get_children("home", DEFAULT_REVISION, "home", 2).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id(), Some("about"));
        let grandchildren = children[0].children().unwrap();
        assert_eq!(grandchildren.len(), 1);
        assert_eq!(grandchildren[0].id(), Some("team"));
    }

    #[test]
    fn test_remove_recursive_trashes_subtree() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        let about = saved_child(&io, &site, "about");
        saved_child(&io, &about, "team");

        io.remove_node(&about, true).unwrap();

        assert!(matches!(
            io.get_node("home", DEFAULT_REVISION, "about", None, 0),
            Err(IoError::NodeNotFound { .. })
        ));
        assert_eq!(io.get_trash_nodes("home").unwrap().len(), 2);
    }

    #[test]
    fn test_restore_trash_node() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        let about = saved_child(&io, &site, "about");
        io.remove_node(&about, false).unwrap();

        let trash = io.get_trash_nodes("home").unwrap();
        io.restore_trash_nodes("home", DEFAULT_REVISION, trash, None)
            .unwrap();

        let restored = io
            .get_node("home", DEFAULT_REVISION, "about", None, 0)
            .unwrap();
        assert_eq!(restored.parent_path(), "home");
        assert!(io.get_trash_nodes("home").unwrap().is_empty());
    }

    #[test]
    fn test_publish_copies_into_revision() {
        let io = MemoryNodeIo::new();
        let site = saved_site(&io);
        let about = saved_child(&io, &site, "about");
        saved_child(&io, &about, "team");

        io.publish(&about, "live", true).unwrap();

        let published = io.get_node("home", "live", "team", None, 0).unwrap();
        assert_eq!(published.revision(), Some("live"));
        // The draft copy is untouched.
        assert!(io
            .get_node("home", DEFAULT_REVISION, "team", None, 0)
            .is_ok());
        assert_eq!(
            io.get_revisions("home").unwrap(),
            [DEFAULT_REVISION.to_string(), "live".to_string()]
                .into_iter()
                .collect()
        );
    }
}
