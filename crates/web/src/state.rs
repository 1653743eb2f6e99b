use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::LastModified;
use crate::source::ResourceSource;
use crate::templates::TemplateCache;

/// Shared, read-only request state. The template cache is the only part
/// that fills in after startup.
#[derive(Clone)]
pub struct WebState {
    pub source: Arc<ResourceSource>,
    pub templates: Arc<TemplateCache>,
    pub last_modified: LastModified,
}

impl WebState {
    pub fn new(source: ResourceSource) -> Self {
        let source = Arc::new(source);
        Self {
            templates: Arc::new(TemplateCache::new(Arc::clone(&source))),
            source,
            last_modified: LastModified::now(),
        }
    }

    /// Picks embedded or filesystem mode once, see [`ResourceSource::detect`].
    pub fn detect(web_root: impl Into<PathBuf>) -> Self {
        Self::new(ResourceSource::detect(web_root))
    }

    pub fn with_last_modified(mut self, last_modified: LastModified) -> Self {
        self.last_modified = last_modified;
        self
    }
}
