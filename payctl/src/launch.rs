//! Admission and dispatch of payload executions.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::execute::PayloadExecutor;
use crate::guard::RunGuard;

/// Payload scripts are addressed by file name; the extension may be omitted
/// in requests.
pub const PAYLOAD_SUFFIX: &str = ".py";

/// Append [`PAYLOAD_SUFFIX`] when absent. Idempotent.
pub fn canonical_name(requested: &str) -> String {
    if requested.ends_with(PAYLOAD_SUFFIX) {
        requested.to_string()
    } else {
        format!("{requested}{PAYLOAD_SUFFIX}")
    }
}

/// Why a launch request was refused. All variants are decided synchronously,
/// before any background work starts.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The catalog provider could not be queried.
    #[error("payload catalog unavailable: {0}")]
    Unavailable(String),

    /// The requested payload is not in the current catalog.
    #[error("unknown payload {0}")]
    NotFound(String),

    /// Another payload holds the run guard.
    #[error("payload {running} is already running")]
    Conflict { running: String },
}

/// Acknowledgement that a payload was admitted and is now executing in the
/// background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub name: String,
}

/// Validates, admits, and dispatches payload executions.
pub struct Launcher {
    guard: Arc<RunGuard>,
    catalog: Arc<dyn Catalog>,
    executor: Arc<dyn PayloadExecutor>,
}

impl Launcher {
    pub fn new(
        guard: Arc<RunGuard>,
        catalog: Arc<dyn Catalog>,
        executor: Arc<dyn PayloadExecutor>,
    ) -> Self {
        Self {
            guard,
            catalog,
            executor,
        }
    }

    /// Launch `requested` in the background.
    ///
    /// Returns as soon as the payload is admitted; execution continues on the
    /// blocking pool and the guard is released when it ends, whether the
    /// executor returns, errors, or panics. Must be called from within a
    /// Tokio runtime.
    #[instrument(skip(self))]
    pub fn launch(&self, requested: &str) -> Result<Started, LaunchError> {
        let name = canonical_name(requested);

        let known = self
            .catalog
            .list()
            .map_err(|err| LaunchError::Unavailable(format!("{err:#}")))?;
        if !known.iter().any(|known_name| known_name == &name) {
            return Err(LaunchError::NotFound(name));
        }

        let permit = self
            .guard
            .try_acquire(&name)
            .map_err(|busy| LaunchError::Conflict {
                running: busy.holder,
            })?;

        info!(payload = %name, "payload admitted");
        let executor = Arc::clone(&self.executor);
        tokio::task::spawn_blocking(move || {
            // The permit lives for the whole closure; its drop releases the
            // guard even if the executor unwinds.
            match executor.execute(permit.name()) {
                Ok(()) => info!(payload = %permit.name(), "payload finished"),
                Err(err) => {
                    let err = format!("{err:#}");
                    warn!(payload = %permit.name(), err = %err, "payload failed");
                }
            }
        });

        Ok(Started { name })
    }
}
