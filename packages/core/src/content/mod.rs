//! Content Mapping
//!
//! Listings, search results and variable lookups all need a uniform view of
//! heterogeneous data items: the `Content` record (title, teaser, url,
//! image, date). A `ContentMapper` turns an opaque data item of one content
//! type into that record; the `ContentFacade` locates the mapper for a type
//! by scanning the registered providers and caches the answer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod error;
mod node_mapper;

pub use error::ContentError;
pub use node_mapper::NodeContentMapper;

/// Denormalized description of one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Content type name this record was mapped from
    pub content_type: String,

    /// Display title
    pub title: String,

    /// Short introduction text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teaser: Option<String>,

    /// Absolute URL of the item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Illustration URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Publication date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    /// The mapped item itself, for consumers needing more than the record
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub data: Value,
}

/// Maps opaque data items of one content type to `Content` records
pub trait ContentMapper: Send + Sync {
    /// Map one data item for a site and locale
    fn map(&self, site: &str, locale: &str, data: &Value) -> Result<Content, ContentError>;
}

/// Source of content mappers, registered with the facade
///
/// Providers are the IO side of the content subsystem: each knows which
/// content types it can serve and yields a mapper for those.
pub trait ContentMapperProvider: Send + Sync {
    /// A mapper for the type, or `None` when this provider does not know it
    fn content_mapper(&self, content_type: &str) -> Option<Arc<dyn ContentMapper>>;
}

/// Lazy registry resolving content types to mappers
///
/// The first lookup for a type linear-scans the providers in registration
/// order and caches the winning mapper by type name.
///
/// # Examples
///
/// ```rust
/// use canopy_core::content::ContentFacade;
///
/// let facade = ContentFacade::new();
/// assert!(facade.get_mapper("article").is_err());
/// ```
#[derive(Default)]
pub struct ContentFacade {
    providers: Vec<Arc<dyn ContentMapperProvider>>,
    mappers: Mutex<HashMap<String, Arc<dyn ContentMapper>>>,
}

impl ContentFacade {
    /// Create a facade without providers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider; later providers are consulted last
    pub fn add_provider(&mut self, provider: Arc<dyn ContentMapperProvider>) {
        self.providers.push(provider);
    }

    /// Resolve the mapper for a content type
    ///
    /// # Errors
    ///
    /// Returns `ContentError::MapperNotFound` naming the type when no
    /// provider yields a mapper.
    pub fn get_mapper(&self, content_type: &str) -> Result<Arc<dyn ContentMapper>, ContentError> {
        {
            let mappers = self.mappers.lock().expect("mapper cache poisoned");
            if let Some(mapper) = mappers.get(content_type) {
                return Ok(mapper.clone());
            }
        }
        for provider in &self.providers {
            if let Some(mapper) = provider.content_mapper(content_type) {
                self.mappers
                    .lock()
                    .expect("mapper cache poisoned")
                    .insert(content_type.to_string(), mapper.clone());
                return Ok(mapper);
            }
        }
        Err(ContentError::mapper_not_found(content_type))
    }

    /// Resolve a mapper and map a data item in one call
    pub fn get_content(
        &self,
        content_type: &str,
        site: &str,
        locale: &str,
        data: &Value,
    ) -> Result<Content, ContentError> {
        self.get_mapper(content_type)?.map(site, locale, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticMapper;

    impl ContentMapper for StaticMapper {
        fn map(&self, _site: &str, _locale: &str, data: &Value) -> Result<Content, ContentError> {
            Ok(Content {
                content_type: "static".to_string(),
                title: data.as_str().unwrap_or("untitled").to_string(),
                teaser: None,
                url: None,
                image: None,
                date: None,
                data: data.clone(),
            })
        }
    }

    struct CountingProvider {
        lookups: AtomicUsize,
    }

    impl ContentMapperProvider for CountingProvider {
        fn content_mapper(&self, content_type: &str) -> Option<Arc<dyn ContentMapper>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            (content_type == "static").then(|| Arc::new(StaticMapper) as Arc<dyn ContentMapper>)
        }
    }

    #[test]
    fn test_missing_mapper_names_the_type() {
        let facade = ContentFacade::new();
        let error = facade.get_mapper("article").unwrap_err();
        assert!(matches!(
            error,
            ContentError::MapperNotFound { content_type } if content_type == "article"
        ));
    }

    #[test]
    fn test_mapper_lookup_is_cached() {
        let provider = Arc::new(CountingProvider {
            lookups: AtomicUsize::new(0),
        });
        let mut facade = ContentFacade::new();
        facade.add_provider(provider.clone());

        facade.get_mapper("static").unwrap();
        facade.get_mapper("static").unwrap();
        facade.get_mapper("static").unwrap();

        assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_content_maps_through() {
        let provider = Arc::new(CountingProvider {
            lookups: AtomicUsize::new(0),
        });
        let mut facade = ContentFacade::new();
        facade.add_provider(provider);

        let content = facade
            .get_content("static", "home", "en", &Value::String("Hello".to_string()))
            .unwrap();
        assert_eq!(content.title, "Hello");
    }
}
