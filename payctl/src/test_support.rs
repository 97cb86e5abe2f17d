//! Scripted providers for exercising launch admission without real processes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::mpsc;

use crate::catalog::Catalog;
use crate::execute::PayloadExecutor;
use crate::guard::RunGuard;

/// Catalog with a mutable in-memory name list, for simulating catalog drift
/// between launches.
pub struct ScriptedCatalog {
    names: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            names: Mutex::new(names.iter().map(|name| name.to_string()).collect()),
        })
    }

    pub fn set(&self, names: &[&str]) {
        let mut current = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        *current = names.iter().map(|name| name.to_string()).collect();
    }
}

impl Catalog for ScriptedCatalog {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Catalog whose provider is down.
pub struct FailingCatalog;

impl Catalog for FailingCatalog {
    fn list(&self) -> Result<Vec<String>> {
        bail!("catalog offline")
    }
}

/// Executor that reports each start and then blocks until the gate sender is
/// dropped (or sent to), so tests can hold the guard open deliberately.
pub struct GatedExecutor {
    started: mpsc::Sender<String>,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedExecutor {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<String>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel(8);
        let (gate_tx, gate_rx) = mpsc::channel(8);
        (
            Arc::new(Self {
                started: started_tx,
                gate: Mutex::new(gate_rx),
            }),
            started_rx,
            gate_tx,
        )
    }
}

impl PayloadExecutor for GatedExecutor {
    fn execute(&self, name: &str) -> Result<()> {
        let _ = self.started.blocking_send(name.to_string());
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = gate.blocking_recv();
        Ok(())
    }
}

/// Executor whose payload always fails.
pub struct FailingExecutor;

impl PayloadExecutor for FailingExecutor {
    fn execute(&self, name: &str) -> Result<()> {
        bail!("payload {name} crashed")
    }
}

/// Executor that panics mid-run, for exercising the unwind cleanup path.
pub struct PanickingExecutor;

impl PayloadExecutor for PanickingExecutor {
    fn execute(&self, _name: &str) -> Result<()> {
        panic!("executor blew up")
    }
}

/// Poll the guard until it reports idle; false if it stays held for 5s.
pub async fn wait_until_idle(guard: &RunGuard) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if !guard.snapshot().running {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
