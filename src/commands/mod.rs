pub mod classify;
pub mod memory;
pub mod observe;
pub mod retriage;
pub mod source_file;
pub mod triage;

use std::path::Path;

use anyhow::{Context, Result};
use sieve::config::{StoreBackend, TriageConfig};

/// Load configuration for a CLI run.
///
/// Without a config file the library defaults apply, except that the CLI
/// keeps its memory on disk so separate invocations build on each other.
pub fn load_config(path: Option<&Path>) -> Result<TriageConfig> {
    match path {
        Some(path) => TriageConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let mut config = TriageConfig::default();
            config.store.backend = StoreBackend::Sqlite;
            Ok(config)
        }
    }
}
