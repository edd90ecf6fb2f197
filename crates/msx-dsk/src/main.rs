//! msx-dsk entry point.
//!
//! Builds an MSX disk image from BASIC sources by driving MSXPen in Chrome.
//!
//! # Usage
//!
//! ```text
//! msx-dsk [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>      Config file [default: create-dsk.config.json]
//!       --headless           Hide the browser window (overrides the config)
//!       --headed             Show the browser window (overrides the config)
//!       --log-level <LEVEL>  error, warn, info, debug or trace
//! ```
//!
//! `RUST_LOG` takes precedence over both `--log-level` and the config's
//! `log_level`.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- JSON / TOML, paths resolved
//!  └─ read_sources()           -- every file read before the browser starts
//!  └─ prepare_transfers()      -- SAVE commands sanitized up front
//!  └─ ChromeDriver::launch()   -- browser + DevTools session
//!  └─ TransferOrchestrator::run()
//!       ├─ OK: <name>      per saved file
//!       └─ TIMEOUT: <name> per retried file
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use msx_dsk::application::driver::EmulatorDriver;
use msx_dsk::application::transfer::{prepare_transfers, TransferOrchestrator};
use msx_dsk::infrastructure::cdp::{ChromeDriver, LaunchOptions};
use msx_dsk::infrastructure::config::{
    ensure_proof_dir, load_config, read_sources, DskConfig, DEFAULT_CONFIG_FILE,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Saves MSX BASIC programs onto a disk image through MSXPen.
#[derive(Debug, Parser)]
#[command(name = "msx-dsk", version)]
struct Cli {
    /// Config file listing the sources, the proof directory and the output.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "MSX_DSK_CONFIG")]
    config: PathBuf,

    /// Run the browser without a window.
    #[arg(long, conflicts_with = "headed")]
    headless: bool,

    /// Run the browser with a visible window.
    #[arg(long)]
    headed: bool,

    /// Log level; overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be read, parsed or validated.
    fn into_dsk_config(self) -> anyhow::Result<DskConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config '{}'", self.config.display()))?;

        if self.headless {
            config.headless = true;
        } else if self.headed {
            config.headless = false;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_dsk_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "msx-dsk starting: {} file(s) -> {}",
        config.files.len(),
        config.output.display()
    );

    // Everything that can fail without a browser fails here.
    let sources = read_sources(&config).context("failed to read sources")?;
    let files = prepare_transfers(sources).context("cannot type the SAVE command")?;
    ensure_proof_dir(&config).context("failed to create proof directory")?;

    let options = LaunchOptions {
        chrome_path: config.chrome_path.clone(),
        headless: config.headless,
        ..LaunchOptions::default()
    };
    let driver: Arc<dyn EmulatorDriver> = Arc::new(
        ChromeDriver::launch(&options)
            .await
            .context("failed to start the browser")?,
    );
    let orchestrator = TransferOrchestrator::new(Arc::clone(&driver), config.transfer_settings());

    // ── Run until done or Ctrl+C ──────────────────────────────────────────────
    let report = tokio::select! {
        result = orchestrator.run(&files) => result.context("transfer failed")?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
            warn!("interrupted, closing the browser");
            if let Err(e) = driver.shutdown().await {
                warn!("browser shutdown failed: {e}");
            }
            anyhow::bail!("interrupted");
        }
    };

    info!(
        "saved {} file(s) into {} ({} retries, {} snapshots)",
        report.saved.len(),
        config.output.display(),
        report.retries,
        report.snapshots.len()
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(tag: &str, headless: bool) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("msx-dsk-cli-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("create-dsk.config.json");
        let text = format!(
            r#"{{"files": [["a.bas", "A.BAS"]], "proofDir": "proof", "output": "o.dsk", "headless": {headless}}}"#
        );
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["msx-dsk"]);

        // Assert
        assert_eq!(cli.config, PathBuf::from("create-dsk.config.json"));
        assert!(!cli.headless);
        assert!(!cli.headed);
        assert_eq!(cli.log_level, None);
    }

    #[test]
    fn test_cli_short_config_flag() {
        let cli = Cli::parse_from(["msx-dsk", "-c", "other.toml"]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn test_cli_headless_and_headed_conflict() {
        let result = Cli::try_parse_from(["msx-dsk", "--headless", "--headed"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_headed_flag_overrides_config() {
        // Arrange
        let path = write_config("headed", true);
        let cli = Cli::parse_from(["msx-dsk", "-c", path.to_str().unwrap(), "--headed"]);

        // Act
        let config = cli.into_dsk_config().unwrap();

        // Assert
        assert!(!config.headless);
    }

    #[test]
    fn test_config_value_kept_without_flags() {
        let path = write_config("plain", true);
        let cli = Cli::parse_from(["msx-dsk", "-c", path.to_str().unwrap(), "--log-level", "debug"]);

        let config = cli.into_dsk_config().unwrap();

        assert!(config.headless);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_config_error_names_the_file() {
        let cli = Cli::parse_from(["msx-dsk", "-c", "/no/such/create-dsk.config.json"]);

        let err = cli.into_dsk_config().unwrap_err();

        assert!(format!("{err:#}").contains("/no/such/create-dsk.config.json"));
    }
}
