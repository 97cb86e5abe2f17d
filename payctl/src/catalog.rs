//! Payload catalog providers.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// Source of the known payload names.
///
/// Implementations are queried fresh on every call; nothing in the core
/// caches the result, so additions and removals are visible immediately.
pub trait Catalog: Send + Sync {
    fn list(&self) -> Result<Vec<String>>;
}

/// Catalog backed by a directory of `.py` payload scripts.
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Catalog for DirectoryCatalog {
    fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("read payload directory {}", self.dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("read payload directory {}", self.dir.display()))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("py") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        debug!(dir = %self.dir.display(), count = names.len(), "listed payloads");
        Ok(names)
    }
}
