//! Runtime context shared by every command.
//!
//! Resolves the config once and opens the document store it describes, so
//! commands receive the store as an explicit dependency instead of reaching
//! for global state.

use crate::aggregator::{Aggregator, TaskTiming};
use crate::config::Config;
use crate::error::Result;
use crate::store::DocumentStore;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
}

impl AppContext {
    /// Resolve config (explicit path, `./pinboard.yaml`, or defaults) and open
    /// the directory store it names.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::resolve(config_path)?;
        let store = Arc::new(config.open_store());
        Ok(Self { config, store })
    }

    /// Context over an already-open store.
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(
            Arc::clone(&self.store),
            self.config.title_prefix.clone(),
            TaskTiming::from_config(&self.config),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, TimeWindow};
    use tempfile::TempDir;

    #[test]
    fn load_opens_configured_store_dir() {
        let temp = TempDir::new().unwrap();
        let store_dir = temp.path().join("docs");
        let config_path = temp.path().join("pinboard.yaml");
        std::fs::write(
            &config_path,
            format!("store_dir: {}\n", store_dir.display()),
        )
        .unwrap();

        let ctx = AppContext::load(Some(&config_path)).unwrap();
        ctx.aggregator()
            .submit(chrono::Utc::now(), &crate::protocol::TargetSpec::Broadcast, "ls")
            .unwrap();

        assert_eq!(ctx.store.list(&TimeWindow::all()).unwrap().len(), 1);
        assert!(store_dir.is_dir());
    }

    #[test]
    fn load_rejects_missing_explicit_config() {
        let temp = TempDir::new().unwrap();
        assert!(AppContext::load(Some(&temp.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn aggregator_uses_configured_prefix() {
        let mut config = Config::default();
        config.title_prefix = "ops:".to_string();
        let ctx = AppContext::with_store(config, Arc::new(MemoryStore::new()));

        let doc = ctx
            .aggregator()
            .submit(chrono::Utc::now(), &crate::protocol::TargetSpec::Wildcard, "id")
            .unwrap();

        assert_eq!(doc.title, "ops: @*:id");
    }
}
