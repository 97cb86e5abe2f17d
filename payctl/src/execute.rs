//! Payload execution backends.
//!
//! The [`PayloadExecutor`] trait decouples launch admission from how a
//! payload actually runs. The production backend spawns the configured
//! interpreter as a child process; tests use scripted executors that never
//! fork.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

/// Abstraction over payload execution.
///
/// `execute` blocks until the payload finishes and is only ever invoked off
/// the request path (the launcher moves it onto the blocking pool). An `Err`
/// means the payload failed; the caller still owns guard reconciliation.
pub trait PayloadExecutor: Send + Sync {
    fn execute(&self, name: &str) -> Result<()>;
}

/// Executor that runs `<command...> <payload_dir>/<name>` as a child process.
///
/// The child's stdout and stderr are appended to the payload log file, which
/// is what the tail endpoint follows. No timeout is applied; the payload runs
/// until it exits.
pub struct ProcessExecutor {
    command: Vec<String>,
    payload_dir: PathBuf,
    log_file: PathBuf,
}

impl ProcessExecutor {
    pub fn new(
        command: Vec<String>,
        payload_dir: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command,
            payload_dir: payload_dir.into(),
            log_file: log_file.into(),
        }
    }

    fn open_log(&self) -> Result<std::fs::File> {
        if let Some(parent) = self.log_file.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_file)
            .with_context(|| format!("open payload log {}", self.log_file.display()))
    }
}

impl PayloadExecutor for ProcessExecutor {
    #[instrument(skip(self), fields(payload = %name))]
    fn execute(&self, name: &str) -> Result<()> {
        let script = self.payload_dir.join(name);
        let (program, args) = self
            .command
            .split_first()
            .context("payload command is empty")?;

        let log = self.open_log()?;
        let log_err = log.try_clone().context("clone log handle for stderr")?;

        info!(script = %script.display(), "spawning payload process");
        let status = Command::new(program)
            .args(args)
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .with_context(|| format!("spawn payload {name}"))?;

        if !status.success() {
            bail!("payload {name} exited with status {:?}", status.code());
        }
        debug!("payload process finished");
        Ok(())
    }
}
