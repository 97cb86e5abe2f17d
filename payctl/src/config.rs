//! Server configuration (`payctl.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Control service configuration (TOML).
///
/// `payctl.toml` configures payload discovery, execution, and logging; edits
/// take effect on restart. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PayctlConfig {
    /// Directory scanned for `.py` payload scripts.
    pub payload_dir: PathBuf,

    /// Append-only log file payloads write to and tail requests read from.
    pub log_file: PathBuf,

    /// Interpreter command used to run payloads; the script path is appended
    /// (e.g. `["python3"]`).
    pub payload_command: Vec<String>,
}

impl Default for PayctlConfig {
    fn default() -> Self {
        Self {
            payload_dir: PathBuf::from("payloads"),
            log_file: PathBuf::from("loot/payload.log"),
            payload_command: vec!["python3".to_string()],
        }
    }
}

impl PayctlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.payload_dir.as_os_str().is_empty() {
            return Err(anyhow!("payload_dir must not be empty"));
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(anyhow!("log_file must not be empty"));
        }
        if self.payload_command.is_empty() || self.payload_command[0].trim().is_empty() {
            return Err(anyhow!("payload_command must be a non-empty array"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PayctlConfig::default()`.
pub fn load_config(path: &Path) -> Result<PayctlConfig> {
    if !path.exists() {
        let cfg = PayctlConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PayctlConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
