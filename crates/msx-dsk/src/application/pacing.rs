//! Settle delays between emulator interactions.
//!
//! WebMSX and MSXPen animate menus, reboot the machine on reload and run the
//! MSX at real speed, so every interaction is followed by a fixed wait.  The
//! values of [`Pacing::default`] are the ones the tool is tuned for;
//! [`Pacing::instant`] removes every wait for tests.

use std::time::Duration;

/// Delays applied between driver calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// How long a key is held down in a key press.
    pub key_hold: Duration,
    /// Pause after every key press or modifier change.
    pub key_gap: Duration,
    /// Pause after Enter between two typed lines.
    pub line_break: Duration,
    /// Pause after opening a bottom-bar menu.
    pub menu_open: Duration,
    /// Pause after opening or leaving a settings dialog.
    pub dialog: Duration,
    /// Pause after binding a host key in the input settings.
    pub remap: Duration,
    /// How long Ctrl+F9 is held to stop the running program.
    pub stop_hold: Duration,
    /// Settle time after quick steps (machine select, reload, run, typing).
    pub short_step: Duration,
    /// Settle time after slow steps (disk operations, paste, page load).
    pub long_step: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            key_hold: Duration::from_millis(50),
            key_gap: Duration::from_millis(50),
            line_break: Duration::from_millis(500),
            menu_open: Duration::from_millis(500),
            dialog: Duration::from_millis(2_000),
            remap: Duration::from_millis(1_000),
            stop_hold: Duration::from_millis(500),
            short_step: Duration::from_millis(2_500),
            long_step: Duration::from_millis(5_000),
        }
    }
}

impl Pacing {
    /// No waits at all.
    pub fn instant() -> Self {
        Self {
            key_hold: Duration::ZERO,
            key_gap: Duration::ZERO,
            line_break: Duration::ZERO,
            menu_open: Duration::ZERO,
            dialog: Duration::ZERO,
            remap: Duration::ZERO,
            stop_hold: Duration::ZERO,
            short_step: Duration::ZERO,
            long_step: Duration::ZERO,
        }
    }
}

/// Sleeps for `d` unless it is zero.
pub async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
