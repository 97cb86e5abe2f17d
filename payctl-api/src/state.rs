//! Shared application state for the control API server.

use std::path::PathBuf;
use std::sync::Arc;

use payctl::catalog::{Catalog, DirectoryCatalog};
use payctl::config::PayctlConfig;
use payctl::execute::ProcessExecutor;
use payctl::guard::RunGuard;
use payctl::launch::Launcher;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub guard: Arc<RunGuard>,
    pub launcher: Arc<Launcher>,
    /// Append-only payload log followed by the tail endpoint.
    pub log_file: PathBuf,
}

impl AppState {
    pub fn new(config: &PayctlConfig) -> Self {
        let catalog: Arc<dyn Catalog> = Arc::new(DirectoryCatalog::new(&config.payload_dir));
        let executor = Arc::new(ProcessExecutor::new(
            config.payload_command.clone(),
            &config.payload_dir,
            &config.log_file,
        ));
        let guard = RunGuard::new();
        let launcher = Arc::new(Launcher::new(
            Arc::clone(&guard),
            Arc::clone(&catalog),
            executor,
        ));
        Self {
            catalog,
            guard,
            launcher,
            log_file: config.log_file.clone(),
        }
    }
}
