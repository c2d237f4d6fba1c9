// Helper Registry
//
// Factory-based registry mapping configuration tags to helper constructors

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::BoxFuture;
use nodesync_core::{Config, Error, NodeHelper, Result};

use crate::haproxy::{self, HaproxyHelper};
use crate::s3policy::{self, S3PolicyHelper};

/// Helper factory function type
///
/// The returned future owns whatever it needs from the config.
pub type HelperFactory =
    Box<dyn Fn(&Config) -> BoxFuture<'static, Result<Arc<dyn NodeHelper>>> + Send + Sync>;

/// Maps helper tags (as listed in `helpers`) to their constructors.
///
/// Building validates every tag up front, so a typo in the config stops
/// startup instead of silently dropping a helper.
pub struct HelperRegistry {
    factories: HashMap<String, HelperFactory>,
}

impl HelperRegistry {
    /// Create new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `haproxy` and `s3` helpers
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_factory(haproxy::HELPER_NAME, Box::new(haproxy_factory));
        registry.register_factory(s3policy::HELPER_NAME, Box::new(s3_factory));
        registry
    }

    /// Register a helper factory, replacing any factory with the same tag
    pub fn register_factory(&mut self, tag: &str, factory: HelperFactory) {
        self.factories.insert(tag.to_string(), factory);
    }

    /// Registered tags, sorted
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Construct the helpers named in `names`, in that order.
    ///
    /// Unknown and duplicate tags are configuration errors, as is any
    /// helper whose constructor fails.
    pub async fn build(
        &self,
        names: &[String],
        config: &Config,
    ) -> Result<Vec<Arc<dyn NodeHelper>>> {
        let mut seen = HashSet::new();
        for name in names {
            if !self.factories.contains_key(name) {
                return Err(Error::Config(format!(
                    "unknown helper '{name}', expected one of: {}",
                    self.tags().join(", ")
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("helper '{name}' is listed more than once")));
            }
        }

        if names.is_empty() {
            tracing::warn!("No helpers enabled, node changes will only be logged");
        }

        let mut helpers = Vec::with_capacity(names.len());
        for name in names {
            let helper = (self.factories[name])(config).await.map_err(|e| match e {
                Error::Config(msg) => Error::Config(format!("helper '{name}': {msg}")),
                other => Error::Config(format!("helper '{name}': {other}")),
            })?;
            tracing::info!(helper = %name, "Helper enabled");
            helpers.push(helper);
        }
        Ok(helpers)
    }
}

fn haproxy_factory(config: &Config) -> BoxFuture<'static, Result<Arc<dyn NodeHelper>>> {
    let helper = HaproxyHelper::new(&config.haproxy);
    Box::pin(async move {
        let helper: Arc<dyn NodeHelper> = Arc::new(helper?);
        Ok(helper)
    })
}

fn s3_factory(config: &Config) -> BoxFuture<'static, Result<Arc<dyn NodeHelper>>> {
    let s3 = config.s3.clone();
    Box::pin(async move {
        let helper: Arc<dyn NodeHelper> = Arc::new(S3PolicyHelper::new(&s3).await?);
        Ok(helper)
    })
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
