//! Node Validator
//!
//! Validates a node against its tree before a save is allowed to commit:
//! route uniqueness under the same root, home page uniqueness per locale,
//! and publish window sanity. Issues are collected rather than failing at
//! the first, so callers can display them together.
//!
//! Route property values are normalized in place (slug-safe segments,
//! forced leading slash, no trailing slash) as a documented side effect of
//! validation.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::io::{IoError, NodeIo};
use crate::models::property::{
    KEY_SEPARATOR, LOCALES_ALL, PROPERTY_LOCALES, PROPERTY_PUBLISH_START, PROPERTY_PUBLISH_STOP,
    PROPERTY_ROUTE, PUBLISH_DATE_FORMAT,
};
use crate::models::{Node, NodeProperty, TYPE_HOME};
use crate::services::error::NodeValidationIssue;

static SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());

/// Validates nodes against sibling data before writes
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeValidator;

impl NodeValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a node, returning every issue found
    ///
    /// Normalizes local route values in place. Uniqueness checks are
    /// skipped for a node that is not placed in a tree yet (a brand-new
    /// root); everything else still runs.
    pub fn validate(
        &self,
        node: &mut Node,
        io: &dyn NodeIo,
    ) -> Result<Vec<NodeValidationIssue>, IoError> {
        let mut issues = Vec::new();

        self.normalize_routes(node);
        self.validate_publish_dates(node, &mut issues);

        let Ok(site) = node.root_node_id() else {
            return Ok(issues);
        };
        let Some(revision) = node.revision() else {
            return Ok(issues);
        };
        let revision = revision.to_string();

        let others: Vec<Node> = match io.get_nodes(&site, &revision) {
            Ok(nodes) => nodes
                .into_iter()
                .filter(|other| other.id() != node.id())
                .collect(),
            // A site saved into a fresh revision has nothing to collide with.
            Err(IoError::SiteNotFound { .. }) | Err(IoError::RevisionNotFound { .. }) => Vec::new(),
            Err(error) => return Err(error),
        };

        self.validate_route_uniqueness(node, &others, &mut issues);
        if node.node_type() == TYPE_HOME {
            self.validate_home_uniqueness(node, &others, &mut issues);
        }

        Ok(issues)
    }

    /// Normalize every local route property to a slug-safe absolute path
    fn normalize_routes(&self, node: &mut Node) {
        let prefix = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}");
        let routes: Vec<(String, NodeProperty)> = node
            .properties()
            .iter()
            .filter(|(key, property)| key.starts_with(&prefix) && !property.is_cleared())
            .map(|(key, property)| (key.clone(), property.clone()))
            .collect();
        for (key, mut property) in routes {
            property.value = normalize_route(&property.value);
            node.set_raw_property(NodeProperty::new(key, property.value, property.inherit));
        }
    }

    fn validate_route_uniqueness(
        &self,
        node: &Node,
        others: &[Node],
        issues: &mut Vec<NodeValidationIssue>,
    ) {
        let prefix = format!("{PROPERTY_ROUTE}{KEY_SEPARATOR}");
        for (locale, route) in node.routes() {
            let key = format!("{prefix}{locale}");
            for other in others {
                let Some(other_route) = other.get_local(&key) else {
                    continue;
                };
                if normalize_route(other_route) == route {
                    issues.push(NodeValidationIssue::new(
                        key.clone(),
                        format!(
                            "Route '{}' is already used by node '{}'",
                            route,
                            other.id().unwrap_or("?")
                        ),
                    ));
                    break;
                }
            }
        }
    }

    fn validate_home_uniqueness(
        &self,
        node: &Node,
        others: &[Node],
        issues: &mut Vec<NodeValidationIssue>,
    ) {
        for other in others {
            if other.node_type() != TYPE_HOME {
                continue;
            }
            if locales_overlap(node, other) {
                issues.push(NodeValidationIssue::new(
                    PROPERTY_LOCALES,
                    format!(
                        "Site already has a home page for an overlapping locale: node '{}'",
                        other.id().unwrap_or("?")
                    ),
                ));
                break;
            }
        }
    }

    fn validate_publish_dates(&self, node: &Node, issues: &mut Vec<NodeValidationIssue>) {
        let start = self.validate_publish_date(node, PROPERTY_PUBLISH_START, issues);
        let stop = self.validate_publish_date(node, PROPERTY_PUBLISH_STOP, issues);
        if let (Some(start), Some(stop)) = (start, stop) {
            if start >= stop {
                issues.push(NodeValidationIssue::new(
                    PROPERTY_PUBLISH_STOP,
                    "Publish stop date must be after the start date",
                ));
            }
        }
    }

    fn validate_publish_date(
        &self,
        node: &Node,
        key: &str,
        issues: &mut Vec<NodeValidationIssue>,
    ) -> Option<NaiveDateTime> {
        let value = node.get_local(key)?;
        match NaiveDateTime::parse_from_str(value, PUBLISH_DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                issues.push(NodeValidationIssue::new(
                    key,
                    format!("Invalid date '{value}', expected {PUBLISH_DATE_FORMAT}"),
                ));
                None
            }
        }
    }
}

/// Normalize a route to a slug-safe absolute path
///
/// Each segment is lowercased and reduced to `a-z0-9_-`; empty segments
/// vanish. The result always has a leading slash and never a trailing one.
pub fn normalize_route(route: &str) -> String {
    let mut segments = Vec::new();
    for segment in route.split('/') {
        let lowercased = segment.to_lowercase();
        let slug = SLUG_PATTERN.replace_all(&lowercased, "-");
        let slug = slug.trim_matches('-');
        if !slug.is_empty() {
            segments.push(slug.to_string());
        }
    }
    format!("/{}", segments.join("/"))
}

/// Whether two nodes can be visible in at least one common locale
fn locales_overlap(left: &Node, right: &Node) -> bool {
    let left_locales = left.get(PROPERTY_LOCALES).unwrap_or(LOCALES_ALL);
    let right_locales = right.get(PROPERTY_LOCALES).unwrap_or(LOCALES_ALL);
    if left_locales == LOCALES_ALL || right_locales == LOCALES_ALL {
        return true;
    }
    left_locales
        .split(',')
        .map(str::trim)
        .any(|locale| right.is_available_in_locale(locale))
}
