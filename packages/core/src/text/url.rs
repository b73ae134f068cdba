//! URL Rewriting
//!
//! Rewrites `href` and `src` attributes in stored rich text to absolute
//! URLs. Scheme-absolute, protocol-relative, `mailto:`, `tel:` and bare
//! fragment values are left alone; site-absolute paths get the base URL
//! prefixed; everything else resolves relative to the current node's route
//! with `.`/`..` normalization.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::{TextContext, TextParser};

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Rewrites anchor and image URLs to absolute ones
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlTextParser;

impl UrlTextParser {
    /// Create a URL parser
    pub fn new() -> Self {
        Self
    }
}

impl TextParser for UrlTextParser {
    fn parse(&self, text: &str, context: &TextContext) -> String {
        ATTRIBUTE_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                let attribute = &caps[1];
                let (quote, value) = match caps.get(2) {
                    Some(value) => ('"', value.as_str()),
                    None => ('\'', caps.get(3).map_or("", |m| m.as_str())),
                };
                let resolved = resolve_url(value, context);
                format!("{attribute}={quote}{resolved}{quote}")
            })
            .into_owned()
    }
}

/// Resolve one URL value against the context
fn resolve_url(value: &str, context: &TextContext) -> String {
    if value.is_empty()
        || value.starts_with('#')
        || value.starts_with("mailto:")
        || value.starts_with("tel:")
        || value.starts_with("//")
        || value.contains("://")
    {
        return value.to_string();
    }

    let base = context.base_url.trim_end_matches('/');

    if let Some(absolute) = value.strip_prefix('/') {
        return format!("{base}/{absolute}");
    }

    // Relative values resolve against the current node's route, treated as
    // a directory.
    let route = context
        .node
        .as_ref()
        .and_then(|node| node.route(&context.locale, true))
        .unwrap_or_else(|| "/".to_string());
    let normalized = normalize_path(&format!("{route}/{value}"));
    format!("{base}{normalized}")
}

/// Collapse `.` and `..` segments into a clean absolute path
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, TYPE_PAGE};

    fn context() -> TextContext {
        let mut node = Node::new(TYPE_PAGE.to_string(), false);
        node.set_id("team");
        node.set_parent_path("home-about");
        node.set_route("en", "/about/team").unwrap();

        TextContext::new("en", "http://example.com").with_node(node)
    }

    #[test]
    fn test_untouched_schemes() {
        let parser = UrlTextParser::new();
        let context = context();

        for value in [
            "http://other.com/x",
            "//cdn.example.com/x.png",
            "mailto:info@example.com",
            "tel:+3212345678",
            "#section",
        ] {
            let text = format!("<a href=\"{value}\">x</a>");
            assert_eq!(parser.parse(&text, &context), text);
        }
    }

    #[test]
    fn test_site_absolute_gets_base_url() {
        let parser = UrlTextParser::new();
        assert_eq!(
            parser.parse("<a href=\"/contact\">x</a>", &context()),
            "<a href=\"http://example.com/contact\">x</a>"
        );
    }

    #[test]
    fn test_relative_resolution() {
        let parser = UrlTextParser::new();
        let context = context();

        assert_eq!(
            parser.parse("<img src=\"./photo.jpg\"/>", &context),
            "<img src=\"http://example.com/about/team/photo.jpg\"/>"
        );
        assert_eq!(
            parser.parse("<a href=\"../history\">x</a>", &context),
            "<a href=\"http://example.com/about/history\">x</a>"
        );
        assert_eq!(
            parser.parse("<a href=\"members\">x</a>", &context),
            "<a href=\"http://example.com/about/team/members\">x</a>"
        );
    }

    #[test]
    fn test_single_quoted_attributes() {
        let parser = UrlTextParser::new();
        assert_eq!(
            parser.parse("<a href='/contact'>x</a>", &context()),
            "<a href='http://example.com/contact'>x</a>"
        );
    }
}
