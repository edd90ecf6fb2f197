//! Transfer configuration file.
//!
//! The file lists the BASIC sources to transfer and where the results go.
//! JSON and TOML are both accepted; the format is chosen by extension
//! (`.toml` means TOML, anything else is read as JSON):
//!
//! ```json
//! {
//!   "files": [["src/game.bas", "GAME.BAS"], ["src/title.bas", "TITLE.BAS"]],
//!   "proofDir": "proof",
//!   "output": "out/game.dsk",
//!   "headless": true
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the config file,
//! not the current directory, so a project can be built from anywhere.
//!
//! # Serde default values
//!
//! Only `files`, `proof_dir`, `output` and `headless` are required.  Tuning
//! fields use `#[serde(default = "...")]` so older config files keep working.
//! Unknown keys are rejected, which catches typos such as `proofdir`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::busy_wait::BusyWaitSettings;
use crate::application::pacing::Pacing;
use crate::application::transfer::{RetryPolicy, TransferSettings};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "create-dsk.config.json";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file parsed but breaks a rule the schema cannot express.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DskConfig {
    /// `[source_path, msx_name]` pairs, transferred in order.
    pub files: Vec<(PathBuf, String)>,
    /// Directory for timestamped disk snapshots and proof screenshots.
    #[serde(alias = "proofDir")]
    pub proof_dir: PathBuf,
    /// Final disk image.
    pub output: PathBuf,
    pub headless: bool,

    #[serde(default = "default_emulator_url", alias = "emulatorUrl")]
    pub emulator_url: String,
    /// Chrome or Chromium executable.  Searched on `PATH` when absent.
    #[serde(default, alias = "chromePath", skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level", alias = "logLevel")]
    pub log_level: String,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default, alias = "busyWait")]
    pub busy_wait: BusyWaitConfig,
    #[serde(default = "default_load_timeout_ms", alias = "loadTimeoutMs")]
    pub load_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts per file when loading the snapshot times out.  `0` is unlimited.
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms", alias = "backoffMs")]
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BusyWaitConfig {
    #[serde(default = "default_interval_ms", alias = "intervalMs")]
    pub interval_ms: u64,
    #[serde(default = "default_busy_timeout_ms", alias = "timeoutMs")]
    pub timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_emulator_url() -> String {
    "https://msxpen.com/".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_load_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_ms() -> u64 {
    1_000
}
fn default_interval_ms() -> u64 {
    500
}
fn default_busy_timeout_ms() -> u64 {
    120_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for BusyWaitConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DskConfig {
    /// Checks the rules serde cannot: at least one file, no empty names.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.files.is_empty() {
            return Err(ConfigError::Invalid("`files` must list at least one file".into()));
        }
        for (i, (path, name)) in self.files.iter().enumerate() {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("files[{i}]: empty source path")));
            }
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("files[{i}]: empty MSX file name")));
            }
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("`output` must not be empty".into()));
        }
        if self.proof_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("`proof_dir` must not be empty".into()));
        }
        Ok(())
    }

    /// Makes every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for (path, _) in &mut self.files {
            *path = base.join(&*path);
        }
        self.proof_dir = base.join(&self.proof_dir);
        self.output = base.join(&self.output);
        if let Some(chrome) = &mut self.chrome_path {
            if chrome.components().count() > 1 {
                *chrome = base.join(&*chrome);
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: (self.retry.max_attempts > 0).then_some(self.retry.max_attempts),
            backoff: Duration::from_millis(self.retry.backoff_ms),
        }
    }

    /// Orchestrator settings with the standard pacing.
    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            emulator_url: self.emulator_url.clone(),
            snapshot_dir: self.proof_dir.clone(),
            output: self.output.clone(),
            retry: self.retry_policy(),
            busy_wait: BusyWaitSettings {
                interval: Duration::from_millis(self.busy_wait.interval_ms),
                timeout: Duration::from_millis(self.busy_wait.timeout_ms),
            },
            load_timeout: Duration::from_millis(self.load_timeout_ms),
            pacing: Pacing::default(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses config text.  `toml` selects the TOML parser.
///
/// # Errors
///
/// [`ConfigError::Json`] / [`ConfigError::Toml`] on malformed input.
pub fn parse_config(content: &str, toml: bool) -> Result<DskConfig, ConfigError> {
    if toml {
        Ok(toml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

/// Loads, validates and resolves the config at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, a parse error if it is
/// malformed, [`ConfigError::Invalid`] if validation fails.
pub fn load_config(path: &Path) -> Result<DskConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg = parse_config(&content, is_toml(path))?;
    cfg.validate()?;

    let base = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    cfg.resolve_paths(&base);
    Ok(cfg)
}

/// Reads every source file as UTF-8, paired with its MSX name.
///
/// # Errors
///
/// [`ConfigError::Io`] naming the first file that cannot be read.
pub fn read_sources(cfg: &DskConfig) -> Result<Vec<(String, String)>, ConfigError> {
    cfg.files
        .iter()
        .map(|(path, name)| {
            std::fs::read_to_string(path)
                .map(|text| (text, name.clone()))
                .map_err(|source| ConfigError::Io { path: path.clone(), source })
        })
        .collect()
}

/// Creates the proof directory (and parents) if it does not exist.
///
/// # Errors
///
/// [`ConfigError::Io`] on file-system failure.
pub fn ensure_proof_dir(cfg: &DskConfig) -> Result<(), ConfigError> {
    std::fs::create_dir_all(&cfg.proof_dir).map_err(|source| ConfigError::Io {
        path: cfg.proof_dir.clone(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
