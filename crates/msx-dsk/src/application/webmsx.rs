//! Macro operations on the WebMSX emulator embedded in MSXPen.
//!
//! WebMSX is driven almost entirely from the keyboard: clicking a bottom-bar
//! button opens a menu, arrow keys move the highlight, Enter activates it.
//! Each operation below is such a recipe, expressed as [`EmulatorDriver`]
//! calls.  The recipes depend on WebMSX's menu order; if a menu gains an
//! entry the arrow counts here must change.

use std::path::Path;
use std::time::Duration;

use msx_core::keymap::msx_jis::{
    KEY_CAPS, KEY_JIS_BACKSLASH, KEY_JIS_BRACKET_RIGHT, KEY_JIS_YEN,
};
use msx_core::KeyCode;
use tracing::debug;

use super::driver::{Control, DriverError, EmulatorDriver, KeyStroke, PointerButton};
use super::pacing::{pause, Pacing};

/// On-screen keys that are rebound to host keys the driver can send.
const KEY_REMAPS: [(Control, KeyCode); 4] = [
    (Control::KeyboardYen, KEY_JIS_YEN),
    (Control::KeyboardBracketRight, KEY_JIS_BRACKET_RIGHT),
    (Control::KeyboardBackslash, KEY_JIS_BACKSLASH),
    (Control::KeyboardCaps, KEY_CAPS),
];

/// A page with WebMSX running, operated through a driver.
pub struct WebMsx<'a> {
    driver: &'a dyn EmulatorDriver,
    pacing: &'a Pacing,
}

impl<'a> WebMsx<'a> {
    pub fn new(driver: &'a dyn EmulatorDriver, pacing: &'a Pacing) -> Self {
        Self { driver, pacing }
    }

    /// Presses `key` `times` times with the usual gap.
    async fn press(&self, key: KeyCode, times: usize) -> Result<(), DriverError> {
        for _ in 0..times {
            self.driver.press_key(key, self.pacing.key_hold).await?;
            pause(self.pacing.key_gap).await;
        }
        Ok(())
    }

    async fn open_menu(&self, control: Control) -> Result<(), DriverError> {
        self.driver.click(control, PointerButton::Left).await?;
        pause(self.pacing.menu_open).await;
        Ok(())
    }

    /// Switches the emulated machine to "MSX Japan (NTSC)" and reboots it.
    pub async fn select_msx_japan_ntsc(&self) -> Result<(), DriverError> {
        debug!("selecting MSX Japan NTSC");
        self.open_menu(Control::SettingsButton).await?;
        self.press(KeyCode::ArrowUp, 4).await?;
        self.press(KeyCode::Enter, 1).await?;
        pause(self.pacing.menu_open).await;
        self.press(KeyCode::ArrowDown, 8).await?;
        self.press(KeyCode::Enter, 1).await
    }

    /// Rebinds the JIS-only keys and CAPS to host keys the driver can press.
    ///
    /// Each binding is made by right-clicking the key on WebMSX's on-screen
    /// keyboard and then pressing the host key.  The emulator forgets the
    /// bindings on reload, so this runs after every reload.
    pub async fn remap_keyboard(&self) -> Result<(), DriverError> {
        debug!("remapping JIS keys");
        self.open_menu(Control::SettingsButton).await?;
        self.press(KeyCode::ArrowUp, 3).await?;
        self.driver.press_key(KeyCode::Enter, self.pacing.key_hold).await?;
        pause(self.pacing.dialog).await;

        self.driver.click(Control::InputsMenu, PointerButton::Left).await?;
        pause(self.pacing.dialog).await;

        for (control, host_key) in KEY_REMAPS {
            self.driver.click(control, PointerButton::Right).await?;
            pause(self.pacing.menu_open).await;
            self.driver.press_key(host_key, self.pacing.key_hold).await?;
            pause(self.pacing.remap).await;
        }

        self.driver.click(Control::BackButton, PointerButton::Left).await?;
        pause(self.pacing.dialog).await;
        self.driver.press_key(KeyCode::Enter, self.pacing.key_hold).await?;
        pause(self.pacing.dialog).await;
        Ok(())
    }

    /// Saves the disk in drive A as an image file at `path`.
    pub async fn export_disk_a(&self, path: &Path) -> Result<(), DriverError> {
        debug!("exporting disk A to {}", path.display());
        self.open_menu(Control::DiskAButton).await?;
        self.press(KeyCode::ArrowUp, 2).await?;
        self.driver.download(KeyStroke::key(KeyCode::Enter), path).await
    }

    /// Ejects the disk in drive A.
    pub async fn remove_disk_a(&self) -> Result<(), DriverError> {
        debug!("removing disk A");
        self.open_menu(Control::DiskAButton).await?;
        self.press(KeyCode::ArrowUp, 1).await?;
        self.press(KeyCode::Enter, 1).await
    }

    /// Inserts the disk image at `path` into drive A.
    ///
    /// # Errors
    ///
    /// [`DriverError::Timeout`] if the file chooser did not open within
    /// `timeout`.  This happens now and then for no visible reason; callers
    /// treat it as retryable.
    pub async fn load_disk_a(&self, path: &Path, timeout: Duration) -> Result<(), DriverError> {
        debug!("loading disk A from {}", path.display());
        self.open_menu(Control::DiskAButton).await?;
        self.press(KeyCode::ArrowDown, 1).await?;
        self.driver.upload(KeyStroke::key(KeyCode::Enter), path, timeout).await
    }

    /// Stops the running BASIC program with Ctrl+F9 (STOP).
    pub async fn press_stop(&self) -> Result<(), DriverError> {
        debug!("sending STOP");
        self.driver.click(Control::Screen, PointerButton::Left).await?;
        pause(self.pacing.menu_open).await;
        self.driver.key_down(KeyCode::ControlLeft).await?;
        self.driver.key_down(KeyCode::F9).await?;
        pause(self.pacing.stop_hold).await;
        self.driver.key_up(KeyCode::F9).await?;
        self.driver.key_up(KeyCode::ControlLeft).await?;
        pause(self.pacing.key_gap).await;
        Ok(())
    }

    /// Replaces the MSXPen editor content with `source` via the clipboard.
    pub async fn paste_program(&self, source: &str) -> Result<(), DriverError> {
        debug!("pasting {} bytes of program text", source.len());
        self.driver.paste_text(Control::CodeEditor, source).await
    }

    /// Presses MSXPen's run button, which boots the emulator with the program.
    pub async fn press_run(&self) -> Result<(), DriverError> {
        self.driver.click(Control::RunButton, PointerButton::Left).await?;
        pause(self.pacing.key_gap).await;
        Ok(())
    }
}
