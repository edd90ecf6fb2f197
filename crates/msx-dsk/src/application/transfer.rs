//! TransferOrchestrator: builds one disk image from many BASIC sources.
//!
//! # The transfer cycle (for beginners)
//!
//! MSXPen can run a program but offers no way to save it onto a disk image.
//! The emulator can, if someone *types* `SAVE "NAME"` at the BASIC prompt
//! while the right disk is in drive A.  The orchestrator therefore repeats,
//! for every source file:
//!
//! ```text
//! ReloadEditor   reload MSXPen, wait for the drive, rebind JIS keys
//! PasteAndRun    paste the source into the editor and run it
//! StopAndEject   Ctrl+F9 to stop the program, eject the disk
//! LoadSnapshot   insert the disk image exported after the previous file
//! NameAndSave    type CLS, CLS, SAVE "<target>" (twice)
//! ExportSnapshot export drive A to a new timestamped .dsk
//! ```
//!
//! Before the first file the machine is switched to MSX Japan NTSC and its
//! empty disk is exported as the baseline; after the last file the disk is
//! exported once more to the output path.
//!
//! # Failure handling
//!
//! Only LoadSnapshot is retried: its file chooser sometimes never opens.  A
//! timeout there logs `TIMEOUT: <target>` and restarts the same file from
//! ReloadEditor, up to the configured number of attempts.  Any other failure
//! ends the run.  The browser is shut down either way; snapshots already
//! exported stay on disk.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use msx_core::{sanitize_lines, ModifierState, SanitizeError, SanitizedLine};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::busy_wait::{wait_until_idle, BusyWaitError, BusyWaitSettings};
use super::driver::{DriverError, EmulatorDriver};
use super::naming::SnapshotNamer;
use super::pacing::{pause, Pacing};
use super::type_text::{ProofTarget, TypeTextUseCase};
use super::webmsx::WebMsx;

/// How many times the save command is typed per file.
///
/// `SAVE` only works when the cursor sits at column 0, which is not
/// guaranteed after the program stops; the first pass clears the screen.
const SAVE_PASSES: usize = 2;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A stage of the transfer, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    OpenEditor,
    SelectMachine,
    ExportInitialSnapshot,
    ReloadEditor,
    PasteAndRun,
    StopAndEject,
    LoadSnapshot,
    NameAndSave,
    ExportSnapshot,
    ExportFinalOutput,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("{step} failed: {source}")]
    Step {
        step: TransferStep,
        #[source]
        source: DriverError,
    },

    #[error("{step}: {source}")]
    BusyWait {
        step: TransferStep,
        #[source]
        source: BusyWaitError,
    },

    /// LoadSnapshot kept timing out.
    #[error("gave up on {target} after {attempts} attempts: {source}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        #[source]
        source: DriverError,
    },
}

fn at(step: TransferStep) -> impl FnOnce(DriverError) -> TransferError {
    move |source| TransferError::Step { step, source }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Retry policy for the LoadSnapshot step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per file; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Wait before restarting the file.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts_made`.
    pub fn allows(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// MSXPen page URL.
    pub emulator_url: String,
    /// Where timestamped `.dsk` snapshots and `.png` proofs are written.
    pub snapshot_dir: PathBuf,
    /// Final disk image.
    pub output: PathBuf,
    pub retry: RetryPolicy,
    pub busy_wait: BusyWaitSettings,
    /// How long LoadSnapshot waits for the file chooser.
    pub load_timeout: Duration,
    pub pacing: Pacing,
}

impl TransferSettings {
    pub fn new(snapshot_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            emulator_url: "https://msxpen.com/".to_string(),
            snapshot_dir: snapshot_dir.into(),
            output: output.into(),
            retry: RetryPolicy::default(),
            busy_wait: BusyWaitSettings::default(),
            load_timeout: Duration::from_secs(10),
            pacing: Pacing::default(),
        }
    }
}

// ── Inputs and state ──────────────────────────────────────────────────────────

/// One source file, ready to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    pub source_text: String,
    /// File name on the MSX disk, e.g. `GAME.BAS`.
    pub target_name: String,
    /// The sanitized `CLS` / `CLS` / `SAVE "<target>"` / empty lines.
    save_command: Vec<SanitizedLine>,
}

impl FileTransfer {
    /// Prepares a transfer, checking that the save command can be typed.
    ///
    /// # Errors
    ///
    /// [`SanitizeError`] if `target_name` contains a character the MSX
    /// keyboard cannot type.
    pub fn new(
        source_text: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Result<Self, SanitizeError> {
        let target_name = target_name.into();
        let save_command = sanitize_lines(&save_command_lines(&target_name))?.lines;
        Ok(Self {
            source_text: source_text.into(),
            target_name,
            save_command,
        })
    }

    pub fn save_command(&self) -> &[SanitizedLine] {
        &self.save_command
    }
}

/// The raw lines typed to save a program as `target_name`.
pub fn save_command_lines(target_name: &str) -> [String; 4] {
    [
        "CLS".to_string(),
        "CLS".to_string(),
        format!("SAVE \"{target_name}\""),
        String::new(),
    ]
}

/// Prepares every file up front so that a bad name fails before the browser starts.
///
/// # Errors
///
/// The first [`SanitizeError`] encountered.
pub fn prepare_transfers<I, S, T>(files: I) -> Result<Vec<FileTransfer>, SanitizeError>
where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
    T: Into<String>,
{
    files
        .into_iter()
        .map(|(source, target)| FileTransfer::new(source, target))
        .collect()
}

/// Progress of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    /// Disk image holding every file transferred so far.
    pub current_snapshot: PathBuf,
    pub pending_file_index: usize,
    pub retry_count_for_current_file: u32,
    /// Keyboard modes left by the last typing run.
    pub modifiers: ModifierState,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Target names saved, in order.
    pub saved: Vec<String>,
    /// Every `.dsk` snapshot exported, baseline first.
    pub snapshots: Vec<PathBuf>,
    /// Every proof capture written.
    pub proofs: Vec<PathBuf>,
    /// LoadSnapshot timeouts that were retried.
    pub retries: u32,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct TransferOrchestrator {
    driver: Arc<dyn EmulatorDriver>,
    settings: TransferSettings,
    namer: SnapshotNamer,
}

impl TransferOrchestrator {
    pub fn new(driver: Arc<dyn EmulatorDriver>, settings: TransferSettings) -> Self {
        Self {
            driver,
            settings,
            namer: SnapshotNamer::new(),
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Transfers every file and writes the combined disk to the output path.
    ///
    /// The driver is shut down before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// See [`TransferError`].  A shutdown failure is only logged.
    pub async fn run(&self, files: &[FileTransfer]) -> Result<TransferReport, TransferError> {
        let result = self.run_all(files).await;
        if let Err(e) = self.driver.shutdown().await {
            warn!("browser shutdown failed: {e}");
        }
        result
    }

    async fn run_all(&self, files: &[FileTransfer]) -> Result<TransferReport, TransferError> {
        let driver = self.driver.as_ref();
        let s = &self.settings;
        let msx = WebMsx::new(driver, &s.pacing);
        let mut report = TransferReport::default();

        info!("opening {}", s.emulator_url);
        driver
            .navigate(&s.emulator_url)
            .await
            .map_err(at(TransferStep::OpenEditor))?;
        pause(s.pacing.long_step).await;

        msx.select_msx_japan_ntsc()
            .await
            .map_err(at(TransferStep::SelectMachine))?;
        pause(s.pacing.short_step).await;
        self.wait_idle(TransferStep::SelectMachine).await?;

        let baseline = self.export_snapshot(&msx, TransferStep::ExportInitialSnapshot).await?;
        report.snapshots.push(baseline.clone());

        let mut session = TransferSession {
            current_snapshot: baseline,
            pending_file_index: 0,
            retry_count_for_current_file: 0,
            modifiers: ModifierState::default(),
        };

        while let Some(file) = files.get(session.pending_file_index) {
            match self.transfer_file(&msx, file, &mut session, &mut report).await {
                Ok(snapshot) => {
                    info!("OK: {}", file.target_name);
                    report.saved.push(file.target_name.clone());
                    report.snapshots.push(snapshot.clone());
                    session.current_snapshot = snapshot;
                    session.pending_file_index += 1;
                    session.retry_count_for_current_file = 0;
                }
                Err(FileOutcome::LoadTimedOut(source)) => {
                    warn!("TIMEOUT: {}", file.target_name);
                    session.retry_count_for_current_file += 1;
                    report.retries += 1;
                    let attempts = session.retry_count_for_current_file;
                    if !s.retry.allows(attempts) {
                        return Err(TransferError::RetriesExhausted {
                            target: file.target_name.clone(),
                            attempts,
                            source,
                        });
                    }
                    debug!("retrying {} (attempt {})", file.target_name, attempts + 1);
                    pause(s.retry.backoff).await;
                }
                Err(FileOutcome::Failed(e)) => return Err(e),
            }
        }

        msx.export_disk_a(&s.output)
            .await
            .map_err(at(TransferStep::ExportFinalOutput))?;
        pause(s.pacing.long_step).await;
        info!("wrote {}", s.output.display());

        Ok(report)
    }

    /// One pass of the per-file cycle.  Returns the new snapshot.
    async fn transfer_file(
        &self,
        msx: &WebMsx<'_>,
        file: &FileTransfer,
        session: &mut TransferSession,
        report: &mut TransferReport,
    ) -> Result<PathBuf, FileOutcome> {
        let driver = self.driver.as_ref();
        let p = &self.settings.pacing;

        driver.reload().await.map_err(at(TransferStep::ReloadEditor))?;
        pause(p.short_step).await;
        self.wait_idle(TransferStep::ReloadEditor).await?;
        msx.remap_keyboard().await.map_err(at(TransferStep::ReloadEditor))?;
        pause(p.long_step).await;

        msx.paste_program(&file.source_text)
            .await
            .map_err(at(TransferStep::PasteAndRun))?;
        pause(p.long_step).await;
        msx.press_run().await.map_err(at(TransferStep::PasteAndRun))?;
        pause(p.short_step).await;
        self.wait_idle(TransferStep::PasteAndRun).await?;

        msx.press_stop().await.map_err(at(TransferStep::StopAndEject))?;
        pause(p.long_step).await;
        msx.remove_disk_a().await.map_err(at(TransferStep::StopAndEject))?;
        pause(p.long_step).await;

        match msx
            .load_disk_a(&session.current_snapshot, self.settings.load_timeout)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => return Err(FileOutcome::LoadTimedOut(e)),
            Err(e) => return Err(at(TransferStep::LoadSnapshot)(e).into()),
        }
        pause(p.long_step).await;

        let typist = TypeTextUseCase::new(driver, p);
        let proof = ProofTarget { dir: &self.settings.snapshot_dir, namer: &self.namer };
        for _ in 0..SAVE_PASSES {
            let typed = typist
                .run(file.save_command(), session.modifiers, Some(proof))
                .await
                .map_err(at(TransferStep::NameAndSave))?;
            session.modifiers = typed.state;
            report.proofs.extend(typed.captures);
            pause(p.short_step).await;
            self.wait_idle(TransferStep::NameAndSave).await?;
        }

        Ok(self.export_snapshot(msx, TransferStep::ExportSnapshot).await?)
    }

    async fn export_snapshot(
        &self,
        msx: &WebMsx<'_>,
        step: TransferStep,
    ) -> Result<PathBuf, TransferError> {
        let path = self.namer.next_path(&self.settings.snapshot_dir, "dsk");
        msx.export_disk_a(&path).await.map_err(at(step))?;
        pause(self.settings.pacing.long_step).await;
        debug!("snapshot {}", path.display());
        Ok(path)
    }

    async fn wait_idle(&self, step: TransferStep) -> Result<(), TransferError> {
        wait_until_idle(self.driver.as_ref(), self.settings.busy_wait)
            .await
            .map(|_| ())
            .map_err(|source| TransferError::BusyWait { step, source })
    }
}

/// Why one pass over a file did not produce a snapshot.
enum FileOutcome {
    LoadTimedOut(DriverError),
    Failed(TransferError),
}

impl From<TransferError> for FileOutcome {
    fn from(e: TransferError) -> Self {
        FileOutcome::Failed(e)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::infrastructure::mock::{DriverCall, RecordingDriver};
    use msx_core::KeyCode;

    fn settings() -> TransferSettings {
        TransferSettings {
            busy_wait: BusyWaitSettings { interval: Duration::ZERO, timeout: Duration::from_secs(5) },
            retry: RetryPolicy { max_attempts: Some(3), backoff: Duration::ZERO },
            pacing: Pacing::instant(),
            ..TransferSettings::new("/snap", "/out/disk.dsk")
        }
    }

    fn orchestrator(driver: &Arc<RecordingDriver>) -> TransferOrchestrator {
        TransferOrchestrator::new(Arc::clone(driver) as Arc<dyn EmulatorDriver>, settings())
    }

    fn uploads(calls: &[DriverCall]) -> Vec<PathBuf> {
        calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::Upload(_, p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_save_command_lines() {
        assert_eq!(
            save_command_lines("GAME.BAS"),
            ["CLS", "CLS", "SAVE \"GAME.BAS\"", ""].map(String::from)
        );
    }

    #[test]
    fn test_prepare_rejects_untypeable_target_name() {
        let err = prepare_transfers([("10 END", "猫.BAS")]).unwrap_err();
        assert!(matches!(err, SanitizeError::UnsupportedCharacter { line_number: 3, .. }));
    }

    #[test]
    fn test_retry_policy_bounds() {
        let capped = RetryPolicy { max_attempts: Some(2), backoff: Duration::ZERO };
        assert!(capped.allows(1));
        assert!(!capped.allows(2));

        let unbounded = RetryPolicy { max_attempts: None, backoff: Duration::ZERO };
        assert!(unbounded.allows(u32::MAX - 1));
    }

    #[tokio::test]
    async fn test_two_files_chain_snapshots() {
        // Arrange
        let driver = Arc::new(RecordingDriver::new());
        let files = prepare_transfers([("10 PRINT 1", "A.BAS"), ("10 PRINT 2", "B.BAS")]).unwrap();

        // Act
        let report = orchestrator(&driver).run(&files).await.unwrap();

        // Assert
        assert_eq!(report.saved, vec!["A.BAS", "B.BAS"]);
        assert_eq!(report.snapshots.len(), 3, "baseline plus one per file");
        assert_eq!(report.retries, 0);

        // Each file loads the snapshot exported just before it.
        let calls = driver.calls();
        assert_eq!(uploads(&calls), report.snapshots[..2].to_vec());

        // The final export goes to the output path, then the browser closes.
        let n = calls.len();
        assert_eq!(calls[n - 1], DriverCall::Shutdown);
        assert!(matches!(&calls[n - 2], DriverCall::Download(_, p) if p == Path::new("/out/disk.dsk")));
    }

    #[tokio::test]
    async fn test_programs_are_pasted_in_order() {
        let driver = Arc::new(RecordingDriver::new());
        let files = prepare_transfers([("10 PRINT 1", "A.BAS"), ("10 PRINT 2", "B.BAS")]).unwrap();

        orchestrator(&driver).run(&files).await.unwrap();

        let pasted: Vec<String> = driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Paste(_, text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(pasted, vec!["10 PRINT 1", "10 PRINT 2"]);
    }

    #[tokio::test]
    async fn test_save_command_typed_twice_with_proofs() {
        let driver = Arc::new(RecordingDriver::new());
        let files = prepare_transfers([("10 END", "A.BAS")]).unwrap();

        let report = orchestrator(&driver).run(&files).await.unwrap();

        // 4 lines × 2 passes, one capture per line.
        assert_eq!(report.proofs.len(), 8);
        assert!(report.proofs.iter().all(|p| p.starts_with("/snap")));
        let shift_downs = driver
            .calls()
            .iter()
            .filter(|c| **c == DriverCall::KeyDown(KeyCode::ShiftLeft))
            .count();
        // Per pass: once for each "CLS", and three times for `SAVE "A.BAS"`
        // since the space and the period are unshifted.
        assert_eq!(shift_downs, 2 * 5);
    }

    #[tokio::test]
    async fn test_load_timeout_retries_same_file_from_reload() {
        // Arrange
        let driver = Arc::new(RecordingDriver::new().with_upload_timeouts(2));
        let files = prepare_transfers([("10 END", "A.BAS")]).unwrap();

        // Act
        let report = orchestrator(&driver).run(&files).await.unwrap();

        // Assert
        assert_eq!(report.retries, 2);
        assert_eq!(report.saved, vec!["A.BAS"]);
        let calls = driver.calls();
        let reloads = calls.iter().filter(|c| **c == DriverCall::Reload).count();
        assert_eq!(reloads, 3);
        let loaded = uploads(&calls);
        assert_eq!(loaded.len(), 3);
        assert!(loaded.iter().all(|p| *p == report.snapshots[0]), "always the baseline");
    }

    #[tokio::test]
    async fn test_retries_exhausted_is_fatal() {
        let driver = Arc::new(RecordingDriver::new().with_upload_timeouts(10));
        let files = prepare_transfers([("10 END", "A.BAS")]).unwrap();

        let err = orchestrator(&driver).run(&files).await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::RetriesExhausted { ref target, attempts: 3, .. } if target == "A.BAS"
        ));
        assert_eq!(driver.calls().last(), Some(&DriverCall::Shutdown));
    }

    #[tokio::test]
    async fn test_busy_drive_is_awaited() {
        let driver = Arc::new(RecordingDriver::new().with_busy_samples([true, true, false]));
        let files = prepare_transfers([("10 END", "A.BAS")]).unwrap();

        orchestrator(&driver).run(&files).await.unwrap();

        // The first wait (after machine select) sees two busy samples before
        // the first export.
        let calls = driver.calls();
        let first_download = calls
            .iter()
            .position(|c| matches!(c, DriverCall::Download(..)))
            .unwrap();
        let screenshots_before = calls[..first_download]
            .iter()
            .filter(|c| matches!(c, DriverCall::Screenshot(_)))
            .count();
        assert_eq!(screenshots_before, 3);
    }

    #[tokio::test]
    async fn test_other_driver_failure_aborts_with_step() {
        let driver = Arc::new(RecordingDriver::new().failing());
        let files = prepare_transfers([("10 END", "A.BAS")]).unwrap();

        let err = orchestrator(&driver).run(&files).await.unwrap_err();

        assert!(matches!(err, TransferError::Step { step: TransferStep::OpenEditor, .. }));
    }
}
