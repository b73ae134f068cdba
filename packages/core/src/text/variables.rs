//! Variable Resolution
//!
//! `VariablesTextParser` scans text for `%...%` tokens and hands each one
//! to an ordered chain of `VariableParser`s, stopping at the first that
//! resolves it. Tokens nobody resolves pass through unchanged; a malformed
//! or unknown variable is a silent no-op by design.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::content::ContentFacade;
use crate::services::NodeModel;
use crate::text::{TextContext, TextParser};

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([a-zA-Z0-9_.\-]+)%").unwrap());

/// Resolves one family of variables
pub trait VariableParser: Send + Sync {
    /// Resolve a tokenized variable (split on `.`), or `None` to pass
    fn parse_variable(&self, tokens: &[&str], context: &TextContext) -> Option<String>;
}

/// Rewrites `%...%` tokens through a chain of variable parsers
pub struct VariablesTextParser {
    parsers: Vec<Box<dyn VariableParser>>,
}

impl VariablesTextParser {
    /// Create a parser with the given resolution chain
    pub fn new(parsers: Vec<Box<dyn VariableParser>>) -> Self {
        Self { parsers }
    }

    fn resolve(&self, variable: &str, context: &TextContext) -> Option<String> {
        let tokens: Vec<&str> = variable.split('.').collect();
        self.parsers
            .iter()
            .find_map(|parser| parser.parse_variable(&tokens, context))
    }
}

impl TextParser for VariablesTextParser {
    fn parse(&self, text: &str, context: &TextContext) -> String {
        VARIABLE_PATTERN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                match self.resolve(&caps[1], context) {
                    Some(value) => value,
                    // Unresolved tokens stay verbatim.
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Resolves `node.<id>.<name|url|link>` against the tree
pub struct NodeVariableParser {
    model: Arc<NodeModel>,
}

impl NodeVariableParser {
    /// Create a parser resolving nodes through the model
    pub fn new(model: Arc<NodeModel>) -> Self {
        Self { model }
    }
}

impl VariableParser for NodeVariableParser {
    fn parse_variable(&self, tokens: &[&str], context: &TextContext) -> Option<String> {
        let ["node", id, attribute] = tokens else {
            return None;
        };
        let site = context.site.as_ref()?.id()?;
        let node = self.model.get_node(site, &context.revision, id).ok()?;

        match *attribute {
            "name" => Some(node.name(&context.locale, None)),
            "url" => {
                let route = node.route(&context.locale, true)?;
                Some(format!("{}{route}", context.base_url))
            }
            "link" => {
                let route = node.route(&context.locale, true)?;
                let name = node.name(&context.locale, None);
                Some(format!(
                    "<a href=\"{}{route}\">{name}</a>",
                    context.base_url
                ))
            }
            _ => None,
        }
    }
}

/// Resolves `site.<name|url>` against the active site
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteVariableParser;

impl VariableParser for SiteVariableParser {
    fn parse_variable(&self, tokens: &[&str], context: &TextContext) -> Option<String> {
        let ["site", attribute] = tokens else {
            return None;
        };
        match *attribute {
            "name" => Some(context.site.as_ref()?.name(&context.locale, None)),
            "url" => Some(context.base_url.clone()),
            _ => None,
        }
    }
}

/// Resolves `context.<key>` from the free-form variable map
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextVariableParser;

impl VariableParser for ContextVariableParser {
    fn parse_variable(&self, tokens: &[&str], context: &TextContext) -> Option<String> {
        let (head, rest) = tokens.split_first()?;
        if *head != "context" || rest.is_empty() {
            return None;
        }
        context.variables.get(&rest.join(".")).cloned()
    }
}

/// Resolves `content.<type>.<id>.<title|url|teaser>` through the facade
pub struct ContentVariableParser {
    facade: Arc<ContentFacade>,
}

impl ContentVariableParser {
    /// Create a parser resolving content through the facade
    pub fn new(facade: Arc<ContentFacade>) -> Self {
        Self { facade }
    }
}

impl VariableParser for ContentVariableParser {
    fn parse_variable(&self, tokens: &[&str], context: &TextContext) -> Option<String> {
        let ["content", content_type, id, attribute] = tokens else {
            return None;
        };
        let site = context.site.as_ref()?.id()?;
        let content = self
            .facade
            .get_content(
                content_type,
                site,
                &context.locale,
                &Value::String((*id).to_string()),
            )
            .ok()?;

        match *attribute {
            "title" => Some(content.title),
            "url" => content.url,
            "teaser" => content.teaser,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapParser;

    impl VariableParser for MapParser {
        fn parse_variable(&self, tokens: &[&str], _context: &TextContext) -> Option<String> {
            (tokens == ["answer"]).then(|| "42".to_string())
        }
    }

    #[test]
    fn test_resolved_token_is_replaced() {
        let parser = VariablesTextParser::new(vec![Box::new(MapParser)]);
        let context = TextContext::new("en", "http://example.com");

        assert_eq!(
            parser.parse("The answer is %answer%.", &context),
            "The answer is 42."
        );
    }

    #[test]
    fn test_unresolved_token_stays_verbatim() {
        let parser = VariablesTextParser::new(vec![Box::new(MapParser)]);
        let context = TextContext::new("en", "http://example.com");

        assert_eq!(
            parser.parse("Unknown %question% here", &context),
            "Unknown %question% here"
        );
    }

    #[test]
    fn test_context_variables() {
        let parser = VariablesTextParser::new(vec![Box::new(ContextVariableParser)]);
        let context = TextContext::new("en", "http://example.com")
            .with_variable("user.name", "Robin");

        assert_eq!(
            parser.parse("Hello %context.user.name%!", &context),
            "Hello Robin!"
        );
        assert_eq!(parser.parse("%context%", &context), "%context%");
    }

    mod node_variables {
        use super::*;
        use crate::behaviors::NodeTypeManager;
        use crate::content::{ContentMapper, ContentMapperProvider, NodeContentMapper};
        use crate::io::{MemoryNodeIo, DEFAULT_REVISION};
        use crate::models::TYPE_SITE;

        fn model_with_about_page() -> (Arc<NodeModel>, TextContext) {
            let model = Arc::new(NodeModel::new(
                Arc::new(MemoryNodeIo::new()),
                NodeTypeManager::with_default_types(),
            ));

            let mut site = model.create_node(TYPE_SITE, None).unwrap();
            site.set_id("home");
            site.set_name("en", "My site", None).unwrap();
            model.set_node(&mut site, "Creating site").unwrap();

            let mut about = model.create_node("page", Some(&site)).unwrap();
            about.set_id("about");
            about.set_name("en", "About us", None).unwrap();
            about.set_route("en", "/about").unwrap();
            model.set_node(&mut about, "Creating page").unwrap();

            let context = TextContext::new("en", "http://example.com")
                .with_site(site)
                .with_revision(DEFAULT_REVISION);
            (model, context)
        }

        #[test]
        fn test_node_url_variable_resolves() {
            let (model, context) = model_with_about_page();
            let parser = VariablesTextParser::new(vec![Box::new(NodeVariableParser::new(model))]);

            assert_eq!(
                parser.parse("Visit %node.about.url%", &context),
                "Visit http://example.com/about"
            );
            assert_eq!(
                parser.parse("See %node.about.link%", &context),
                "See <a href=\"http://example.com/about\">About us</a>"
            );
        }

        #[test]
        fn test_unresolvable_node_stays_verbatim() {
            let (model, context) = model_with_about_page();
            let parser = VariablesTextParser::new(vec![Box::new(NodeVariableParser::new(model))]);

            assert_eq!(
                parser.parse("Visit %node.ghost.url%", &context),
                "Visit %node.ghost.url%"
            );
        }

        #[test]
        fn test_site_variables() {
            let (_, context) = model_with_about_page();
            let parser = VariablesTextParser::new(vec![Box::new(SiteVariableParser)]);

            assert_eq!(parser.parse("%site.name%", &context), "My site");
            assert_eq!(parser.parse("%site.url%", &context), "http://example.com");
        }

        struct NodeMapperProvider {
            mapper: Arc<dyn ContentMapper>,
        }

        impl ContentMapperProvider for NodeMapperProvider {
            fn content_mapper(&self, content_type: &str) -> Option<Arc<dyn ContentMapper>> {
                (content_type == "node").then(|| self.mapper.clone())
            }
        }

        #[test]
        fn test_content_variable_through_facade() {
            let (model, context) = model_with_about_page();

            let mut facade = ContentFacade::new();
            facade.add_provider(Arc::new(NodeMapperProvider {
                mapper: Arc::new(NodeContentMapper::new(model, DEFAULT_REVISION)),
            }));

            let parser =
                VariablesTextParser::new(vec![Box::new(ContentVariableParser::new(Arc::new(
                    facade,
                )))]);

            assert_eq!(
                parser.parse("%content.node.about.title%", &context),
                "About us"
            );
            // A type nobody maps stays verbatim.
            assert_eq!(
                parser.parse("%content.article.about.title%", &context),
                "%content.article.about.title%"
            );
        }
    }
}
