//! Text Rewriting Pipeline
//!
//! Stored rich text is rewritten before display: `%...%` variables are
//! resolved against the node tree and relative URLs are made absolute
//! against the current node and site. Parsers run in a configurable chain,
//! each receiving the active node/locale/base-URL context.
//!
//! Unresolvable variables are deliberately left verbatim: user-authored
//! content must never break rendering.

use std::collections::BTreeMap;

use crate::models::Node;

mod url;
mod variables;

pub use url::UrlTextParser;
pub use variables::{
    ContentVariableParser, ContextVariableParser, NodeVariableParser, SiteVariableParser,
    VariableParser, VariablesTextParser,
};

/// Rendering context a text parser runs in
#[derive(Debug, Clone, Default)]
pub struct TextContext {
    /// Root node of the active site
    pub site: Option<Node>,

    /// Node the text belongs to
    pub node: Option<Node>,

    /// Active locale
    pub locale: String,

    /// Base URL of the active site for the locale
    pub base_url: String,

    /// Revision nodes are resolved in
    pub revision: String,

    /// Free-form values for the context variable parser
    pub variables: BTreeMap<String, String>,
}

impl TextContext {
    /// Create a context for a locale and base URL
    pub fn new(locale: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Attach the active site
    pub fn with_site(mut self, site: Node) -> Self {
        self.site = Some(site);
        self
    }

    /// Attach the current node
    pub fn with_node(mut self, node: Node) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the revision nodes resolve in
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Add a free-form variable
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// One step of the text rewriting pipeline
pub trait TextParser: Send + Sync {
    /// Rewrite the text for the given context
    fn parse(&self, text: &str, context: &TextContext) -> String;
}

/// Runs an ordered list of sub-parsers over the text
#[derive(Default)]
pub struct ChainTextParser {
    parsers: Vec<Box<dyn TextParser>>,
}

impl ChainTextParser {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parser to the chain
    pub fn add_parser(&mut self, parser: Box<dyn TextParser>) {
        self.parsers.push(parser);
    }
}

impl TextParser for ChainTextParser {
    fn parse(&self, text: &str, context: &TextContext) -> String {
        self.parsers
            .iter()
            .fold(text.to_string(), |text, parser| parser.parse(&text, context))
    }
}
