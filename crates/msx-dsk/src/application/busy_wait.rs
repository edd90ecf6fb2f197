//! Polling the disk-A LED until the emulated drive is idle.

use std::time::Duration;

use msx_core::domain::busy::is_busy_screenshot;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use super::driver::{Control, DriverError, EmulatorDriver};
use super::pacing::pause;

#[derive(Debug, Error)]
pub enum BusyWaitError {
    /// The drive stayed busy for the whole timeout.
    #[error("disk drive still busy after {0:?}")]
    Timeout(Duration),

    #[error("could not sample the disk indicator: {0}")]
    Driver(#[from] DriverError),
}

/// How often and for how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyWaitSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for BusyWaitSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Whether the disk-A LED is currently lit.
///
/// A screenshot too small to hold the sample point counts as idle.
///
/// # Errors
///
/// Propagates the driver's screenshot failure.
pub async fn is_disk_busy(driver: &dyn EmulatorDriver) -> Result<bool, DriverError> {
    let shot = driver.screenshot(Control::DiskAButton).await?;
    Ok(is_busy_screenshot(&shot).unwrap_or(false))
}

/// Samples the LED every `interval` until it reads idle.
///
/// Returns the number of busy samples seen.
///
/// # Errors
///
/// [`BusyWaitError::Timeout`] if the drive is still busy after `timeout`,
/// [`BusyWaitError::Driver`] if sampling fails.
pub async fn wait_until_idle(
    driver: &dyn EmulatorDriver,
    settings: BusyWaitSettings,
) -> Result<u32, BusyWaitError> {
    let deadline = Instant::now() + settings.timeout;
    let mut busy_samples = 0;

    while is_disk_busy(driver).await? {
        busy_samples += 1;
        if Instant::now() >= deadline {
            return Err(BusyWaitError::Timeout(settings.timeout));
        }
        debug!("disk A busy (sample {busy_samples}), polling again");
        pause(settings.interval).await;
    }

    Ok(busy_samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::driver::MockEmulatorDriver;
    use msx_core::domain::busy::{BUSY_LIT, SAMPLE_X, SAMPLE_Y};
    use msx_core::{Rgb, Screenshot};

    fn shot(busy: bool) -> Screenshot {
        let mut s = Screenshot::filled(24, 24, Rgb::new(32, 32, 32));
        if busy {
            s.set_pixel(SAMPLE_X, SAMPLE_Y, BUSY_LIT);
        }
        s
    }

    fn fast() -> BusyWaitSettings {
        BusyWaitSettings { interval: Duration::ZERO, timeout: Duration::from_secs(5) }
    }

    #[tokio::test]
    async fn test_idle_drive_returns_immediately() {
        // Arrange
        let mut driver = MockEmulatorDriver::new();
        driver
            .expect_screenshot()
            .withf(|c| *c == Control::DiskAButton)
            .times(1)
            .returning(|_| Ok(shot(false)));

        // Act
        let busy = wait_until_idle(&driver, fast()).await.unwrap();

        // Assert
        assert_eq!(busy, 0);
    }

    #[tokio::test]
    async fn test_polls_until_idle() {
        // Arrange
        let mut driver = MockEmulatorDriver::new();
        let mut remaining_busy = 3;
        driver.expect_screenshot().times(4).returning(move |_| {
            let busy = remaining_busy > 0;
            remaining_busy -= 1;
            Ok(shot(busy))
        });

        // Act
        let busy = wait_until_idle(&driver, fast()).await.unwrap();

        // Assert
        assert_eq!(busy, 3);
    }

    #[tokio::test]
    async fn test_times_out_when_always_busy() {
        // Arrange
        let mut driver = MockEmulatorDriver::new();
        driver.expect_screenshot().returning(|_| Ok(shot(true)));
        let settings = BusyWaitSettings { interval: Duration::from_millis(1), timeout: Duration::from_millis(20) };

        // Act
        let err = wait_until_idle(&driver, settings).await.unwrap_err();

        // Assert
        assert!(matches!(err, BusyWaitError::Timeout(t) if t == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_screenshot_failure_is_propagated() {
        let mut driver = MockEmulatorDriver::new();
        driver
            .expect_screenshot()
            .returning(|c| Err(DriverError::ControlNotFound(c)));

        let err = wait_until_idle(&driver, fast()).await.unwrap_err();

        assert!(matches!(err, BusyWaitError::Driver(DriverError::ControlNotFound(_))));
    }

    #[tokio::test]
    async fn test_tiny_screenshot_reads_idle() {
        let mut driver = MockEmulatorDriver::new();
        driver
            .expect_screenshot()
            .returning(|_| Ok(Screenshot::filled(4, 4, BUSY_LIT)));

        assert!(!is_disk_busy(&driver).await.unwrap());
    }
}
