//! Node Content Mapper
//!
//! The canonical `ContentMapper`: maps a node of the tree to a `Content`
//! record. The data item is either a node id or an already-serialized node
//! object; items whose root does not match the requested site are rejected.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::content::{Content, ContentError, ContentMapper};
use crate::models::property::{PROPERTY_PUBLISH_START, PUBLISH_DATE_FORMAT};
use crate::models::Node;
use crate::services::NodeModel;

/// Content type name served by the node mapper
pub const CONTENT_TYPE_NODE: &str = "node";

/// Maps nodes to `Content` records
///
/// - title: localized node name
/// - teaser: `meta.<locale>.description`
/// - url: the site's base URL joined with the node route
/// - image: `meta.<locale>.image`
/// - date: publish start, when set
pub struct NodeContentMapper {
    model: Arc<NodeModel>,
    revision: String,
}

impl NodeContentMapper {
    /// Create a mapper resolving nodes in the given revision
    pub fn new(model: Arc<NodeModel>, revision: impl Into<String>) -> Self {
        Self {
            model,
            revision: revision.into(),
        }
    }

    fn resolve(&self, site: &str, data: &Value) -> Result<Node, ContentError> {
        match data {
            Value::String(id) => Ok(self.model.get_node(site, &self.revision, id)?),
            Value::Object(_) => serde_json::from_value(data.clone())
                .map_err(|error| ContentError::invalid_data(error.to_string())),
            other => Err(ContentError::invalid_data(format!(
                "expected a node id or node object, got {other}"
            ))),
        }
    }
}

impl ContentMapper for NodeContentMapper {
    fn map(&self, site: &str, locale: &str, data: &Value) -> Result<Content, ContentError> {
        let node = self.resolve(site, data)?;

        let root = node
            .root_node_id()
            .map_err(|error| ContentError::invalid_data(error.to_string()))?;
        if root != site {
            return Err(ContentError::site_mismatch(site, root));
        }

        let site_node = self.model.get_site(site, &self.revision)?;
        let base_url = site_node
            .base_url(locale)
            .map(str::to_string)
            .unwrap_or_default();
        let url = node
            .route(locale, true)
            .map(|route| format!("{base_url}{route}"));

        let date = node
            .get(PROPERTY_PUBLISH_START)
            .and_then(|value| NaiveDateTime::parse_from_str(value, PUBLISH_DATE_FORMAT).ok())
            .map(|naive| naive.and_utc());

        Ok(Content {
            content_type: CONTENT_TYPE_NODE.to_string(),
            title: node.name(locale, None),
            teaser: node.meta(locale, "description").map(str::to_string),
            url,
            image: node.meta(locale, "image").map(str::to_string),
            date,
            data: serde_json::to_value(&node)
                .map_err(|error| ContentError::invalid_data(error.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::behaviors::NodeTypeManager;
    use crate::io::{MemoryNodeIo, DEFAULT_REVISION};
    use crate::models::TYPE_SITE;

    fn model_with_page() -> Arc<NodeModel> {
        let model = Arc::new(NodeModel::new(
            Arc::new(MemoryNodeIo::new()),
            NodeTypeManager::with_default_types(),
        ));

        let mut site = model.create_node(TYPE_SITE, None).unwrap();
        site.set_id("home");
        site.set("url.en", "http://example.com").unwrap();
        model.set_node(&mut site, "Creating site").unwrap();

        let mut about = model.create_node("page", Some(&site)).unwrap();
        about.set_id("about");
        about.set_name("en", "About us", None).unwrap();
        about.set_route("en", "/about").unwrap();
        about.set_meta("en", "description", "Who we are").unwrap();
        about
            .set("publish.start", "2024-06-01 08:00:00")
            .unwrap();
        model.set_node(&mut about, "Creating page").unwrap();

        model
    }

    #[test]
    fn test_maps_node_by_id() {
        let model = model_with_page();
        let mapper = NodeContentMapper::new(model, DEFAULT_REVISION);

        let content = mapper
            .map("home", "en", &Value::String("about".to_string()))
            .unwrap();

        assert_eq!(content.content_type, CONTENT_TYPE_NODE);
        assert_eq!(content.title, "About us");
        assert_eq!(content.teaser.as_deref(), Some("Who we are"));
        assert_eq!(content.url.as_deref(), Some("http://example.com/about"));
        assert!(content.date.is_some());
        assert!(content.data.is_object());
    }

    #[test]
    fn test_rejects_foreign_site_data() {
        let model = model_with_page();

        let mut other = model.create_node(TYPE_SITE, None).unwrap();
        other.set_id("other");
        model
            .set_node(&mut other, "Creating second site")
            .unwrap();

        let about = model.get_node("home", DEFAULT_REVISION, "about").unwrap();
        let serialized = serde_json::to_value(&about).unwrap();

        let mapper = NodeContentMapper::new(model, DEFAULT_REVISION);
        let error = mapper.map("other", "en", &serialized).unwrap_err();
        assert!(matches!(error, ContentError::SiteMismatch { .. }));
    }

    #[test]
    fn test_rejects_unusable_data() {
        let model = model_with_page();
        let mapper = NodeContentMapper::new(model, DEFAULT_REVISION);

        let error = mapper.map("home", "en", &Value::from(42)).unwrap_err();
        assert!(matches!(error, ContentError::InvalidData { .. }));
    }
}
