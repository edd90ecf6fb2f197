//! The browser-automation seam: everything the transfer needs from a browser.
//!
//! The application layer never talks to Chrome directly.  It calls the
//! [`EmulatorDriver`] trait, which the infrastructure layer implements over
//! the Chrome DevTools Protocol (`infrastructure::cdp`) and, for tests, with
//! an in-memory recorder (`infrastructure::mock`).
//!
//! # Async traits (for beginners)
//!
//! Every driver call crosses a WebSocket and waits for the browser, so the
//! methods are `async`.  `#[async_trait]` lets a trait declare `async fn`
//! methods that can be used through `dyn EmulatorDriver`.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use msx_core::{KeyCode, Screenshot};
use thiserror::Error;

/// Error type for browser-driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// An awaited browser event did not arrive in time.
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    /// The DevTools connection returned an error or an unexpected reply.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The browser process could not be started or has gone away.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A screenshot could not be decoded.
    #[error("image error: {0}")]
    Image(String),

    /// The page has no element for the requested control.
    #[error("control not found on page: {0}")]
    ControlNotFound(Control),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// A named element of the MSXPen / WebMSX page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Emulator settings button in the bottom bar.
    SettingsButton,
    /// Disk drive A button in the bottom bar; also carries the busy LED.
    DiskAButton,
    /// "Inputs" entry of the settings menu.
    InputsMenu,
    /// Back button of the settings dialog.
    BackButton,
    /// On-screen keyboard key for the JIS yen key.
    KeyboardYen,
    /// On-screen keyboard key right of `@` on a JIS keyboard.
    KeyboardBracketRight,
    /// On-screen keyboard key for the JIS backslash / underscore key.
    KeyboardBackslash,
    /// On-screen keyboard key for CAPS.
    KeyboardCaps,
    /// The emulator screen canvas.
    Screen,
    /// The MSXPen code editor.
    CodeEditor,
    /// The MSXPen "run" button.
    RunButton,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
}

/// A key pressed together with held modifiers, e.g. `Alt+G`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub modifiers: Vec<KeyCode>,
    pub key: KeyCode,
}

impl KeyStroke {
    pub fn key(key: KeyCode) -> Self {
        Self { modifiers: Vec::new(), key }
    }

    pub fn with_modifier(mut self, modifier: KeyCode) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.dom_key())?;
        }
        write!(f, "{}", self.key.dom_code())
    }
}

/// Browser primitives used by the emulator operations.
///
/// Calls are issued one at a time; implementations need not support
/// concurrent use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmulatorDriver: Send + Sync {
    /// Presses and releases `key`, keeping it down for `hold`.
    async fn press_key(&self, key: KeyCode, hold: Duration) -> Result<(), DriverError>;

    async fn key_down(&self, key: KeyCode) -> Result<(), DriverError>;

    async fn key_up(&self, key: KeyCode) -> Result<(), DriverError>;

    async fn click(&self, control: Control, button: PointerButton) -> Result<(), DriverError>;

    /// Puts `text` on the clipboard and pastes it into `control`.
    async fn paste_text(&self, control: Control, text: &str) -> Result<(), DriverError>;

    /// Captures the on-screen pixels of `control`.
    async fn screenshot(&self, control: Control) -> Result<Screenshot, DriverError>;

    /// Presses `trigger`, waits for the download it starts and saves it at `path`.
    async fn download(&self, trigger: KeyStroke, path: &Path) -> Result<(), DriverError>;

    /// Presses `trigger`, waits up to `timeout` for a file chooser and answers
    /// it with `path`.
    ///
    /// # Errors
    ///
    /// [`DriverError::Timeout`] if no file chooser opened in time.
    async fn upload(
        &self,
        trigger: KeyStroke,
        path: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn reload(&self) -> Result<(), DriverError>;

    /// Closes the browser.  No other method may be called afterwards.
    async fn shutdown(&self) -> Result<(), DriverError>;
}
