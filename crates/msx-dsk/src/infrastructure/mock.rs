//! Recording emulator driver for tests.
//!
//! # Why a mock driver?
//!
//! The real driver starts Chrome, loads MSXPen from the internet and runs the
//! emulator in real time.  None of that is available (or fast) in a test.
//! `RecordingDriver` records every call in order so tests can assert on
//! exactly what the use cases asked the browser to do.
//!
//! # Scripted behaviour
//!
//! - [`RecordingDriver::with_busy_samples`] – disk-LED readings returned by
//!   successive screenshots; once exhausted, the drive reads idle.
//! - [`RecordingDriver::with_upload_timeouts`] – how many upcoming uploads
//!   time out before one succeeds.
//! - [`RecordingDriver::writing_downloads`] – actually create the files
//!   downloads are saved to, so snapshot paths exist on disk.
//! - `should_fail` – every call fails with [`DriverError::Browser`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use msx_core::domain::busy::{BUSY_LIT, SAMPLE_X, SAMPLE_Y};
use msx_core::{KeyCode, Rgb, Screenshot};

use crate::application::driver::{Control, DriverError, EmulatorDriver, KeyStroke, PointerButton};

/// Content written for downloads when `write_downloads` is set.
pub const MOCK_DOWNLOAD_CONTENT: &[u8] = b"msx-dsk mock download";

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    PressKey(KeyCode),
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    Click(Control, PointerButton),
    Paste(Control, String),
    Screenshot(Control),
    Download(KeyStroke, PathBuf),
    Upload(KeyStroke, PathBuf),
    Navigate(String),
    Reload,
    Shutdown,
}

/// A driver that records calls instead of automating a browser.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub calls: Mutex<Vec<DriverCall>>,
    pub busy_samples: Mutex<VecDeque<bool>>,
    pub upload_timeouts: Mutex<u32>,
    pub write_downloads: bool,
    pub should_fail: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy_samples(self, samples: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.busy_samples).extend(samples);
        self
    }

    pub fn with_upload_timeouts(self, count: u32) -> Self {
        *lock(&self.upload_timeouts) = count;
        self
    }

    pub fn writing_downloads(mut self) -> Self {
        self.write_downloads = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// A copy of every call recorded so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: DriverCall) -> Result<(), DriverError> {
        if self.should_fail {
            return Err(DriverError::Browser("mock failure".into()));
        }
        lock(&self.calls).push(call);
        Ok(())
    }

    fn save_download(&self, path: &Path) -> Result<(), DriverError> {
        if self.write_downloads {
            std::fs::write(path, MOCK_DOWNLOAD_CONTENT)?;
        }
        Ok(())
    }
}

#[async_trait]
impl EmulatorDriver for RecordingDriver {
    async fn press_key(&self, key: KeyCode, _hold: Duration) -> Result<(), DriverError> {
        self.record(DriverCall::PressKey(key))
    }

    async fn key_down(&self, key: KeyCode) -> Result<(), DriverError> {
        self.record(DriverCall::KeyDown(key))
    }

    async fn key_up(&self, key: KeyCode) -> Result<(), DriverError> {
        self.record(DriverCall::KeyUp(key))
    }

    async fn click(&self, control: Control, button: PointerButton) -> Result<(), DriverError> {
        self.record(DriverCall::Click(control, button))
    }

    async fn paste_text(&self, control: Control, text: &str) -> Result<(), DriverError> {
        self.record(DriverCall::Paste(control, text.to_string()))
    }

    /// Returns a 24×24 image whose LED pixel reflects the next scripted sample.
    async fn screenshot(&self, control: Control) -> Result<Screenshot, DriverError> {
        self.record(DriverCall::Screenshot(control))?;
        let busy = lock(&self.busy_samples).pop_front().unwrap_or(false);
        let mut shot = Screenshot::filled(24, 24, Rgb::new(48, 48, 48));
        if busy {
            shot.set_pixel(SAMPLE_X, SAMPLE_Y, BUSY_LIT);
        }
        Ok(shot)
    }

    async fn download(&self, trigger: KeyStroke, path: &Path) -> Result<(), DriverError> {
        self.record(DriverCall::Download(trigger, path.to_path_buf()))?;
        self.save_download(path)
    }

    async fn upload(
        &self,
        trigger: KeyStroke,
        path: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::Upload(trigger, path.to_path_buf()))?;
        let mut remaining = lock(&self.upload_timeouts);
        if *remaining > 0 {
            *remaining -= 1;
            return Err(DriverError::Timeout { what: "file chooser".into(), after: timeout });
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(DriverCall::Navigate(url.to_string()))
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.record(DriverCall::Reload)
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        self.record(DriverCall::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msx_core::domain::busy::is_busy_screenshot;

    #[tokio::test]
    async fn test_calls_are_recorded_in_order() {
        let driver = RecordingDriver::new();

        driver.key_down(KeyCode::ShiftLeft).await.unwrap();
        driver.press_key(KeyCode::KeyA, Duration::ZERO).await.unwrap();
        driver.reload().await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                DriverCall::KeyDown(KeyCode::ShiftLeft),
                DriverCall::PressKey(KeyCode::KeyA),
                DriverCall::Reload,
            ]
        );
    }

    #[tokio::test]
    async fn test_busy_samples_are_consumed_then_idle() {
        let driver = RecordingDriver::new().with_busy_samples([true, false]);

        let a = driver.screenshot(Control::DiskAButton).await.unwrap();
        let b = driver.screenshot(Control::DiskAButton).await.unwrap();
        let c = driver.screenshot(Control::DiskAButton).await.unwrap();

        assert_eq!(is_busy_screenshot(&a), Some(true));
        assert_eq!(is_busy_screenshot(&b), Some(false));
        assert_eq!(is_busy_screenshot(&c), Some(false));
    }

    #[tokio::test]
    async fn test_upload_times_out_the_scripted_number_of_times() {
        let driver = RecordingDriver::new().with_upload_timeouts(1);
        let trigger = KeyStroke::key(KeyCode::Enter);

        let first = driver.upload(trigger.clone(), Path::new("a.dsk"), Duration::from_secs(1)).await;
        let second = driver.upload(trigger, Path::new("a.dsk"), Duration::from_secs(1)).await;

        assert!(first.unwrap_err().is_timeout());
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_should_fail_fails_every_call() {
        let driver = RecordingDriver::new().failing();

        let err = driver.navigate("https://msxpen.com/").await.unwrap_err();

        assert!(matches!(err, DriverError::Browser(_)));
        assert!(driver.calls().is_empty());
    }
}
