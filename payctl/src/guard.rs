//! Mutual exclusion over the single running payload.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

/// Consistent view of the guard state.
///
/// `name` is `Some` exactly when `running` is true; both fields come from a
/// single read under the guard's lock, so callers never see a torn pair.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunStatus {
    pub running: bool,
    pub name: Option<String>,
}

/// Returned by a failed acquire, naming the payload holding the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Busy {
    pub holder: String,
}

/// Tracks whether a payload is currently executing, and which one.
///
/// The advertised `running`/`name` pair is stored as one `Option<String>`
/// behind one mutex, so the two can only change together. Acquisition is
/// fail-fast: a held guard is reported as [`Busy`], never waited on.
#[derive(Debug, Default)]
pub struct RunGuard {
    current: Mutex<Option<String>>,
}

impl RunGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Atomically claim the guard for `name`.
    ///
    /// At most one concurrent caller succeeds. The returned [`RunPermit`]
    /// releases the guard when dropped.
    pub fn try_acquire(self: &Arc<Self>, name: &str) -> Result<RunPermit, Busy> {
        let mut current = self.lock();
        if let Some(holder) = current.as_ref() {
            return Err(Busy {
                holder: holder.clone(),
            });
        }
        *current = Some(name.to_string());
        debug!(payload = %name, "run guard acquired");
        Ok(RunPermit {
            guard: Arc::clone(self),
            name: name.to_string(),
        })
    }

    /// Read both fields as a consistent pair.
    pub fn snapshot(&self) -> RunStatus {
        let current = self.lock();
        RunStatus {
            running: current.is_some(),
            name: current.clone(),
        }
    }

    fn release(&self) {
        let mut current = self.lock();
        debug!(payload = ?current.as_deref(), "run guard released");
        *current = None;
    }

    // The critical sections never panic while holding the lock, so a poisoned
    // mutex can only mean a panic elsewhere on this thread; recover the data.
    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to execute one payload.
///
/// Dropping the permit releases the guard. Holding it across the execution
/// path makes release unconditional: normal completion, executor error, and
/// unwinding all run `Drop` exactly once.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
    name: String,
}

impl RunPermit {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}
