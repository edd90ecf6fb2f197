//! # msx-core
//!
//! Shared library for msx-dsk: the MSX Japanese keyboard table, the text
//! sanitizer, keystroke synthesis, and the disk busy-indicator rule.
//!
//! It has no dependencies on browsers, the file system, or an async runtime.
//!
//! # Architecture overview (for beginners)
//!
//! msx-dsk types BASIC commands into the WebMSX emulator by sending it
//! synthesized host key presses.  The emulator decides which MSX key was hit
//! from the *physical* key, so turning text into input takes three steps:
//!
//! - **`text`** – Decomposes each line (`が` → `か゛`) and checks that every
//!   character exists on the MSX keyboard.  Unknown characters inside a BASIC
//!   comment become `・`; anywhere else they are an error.
//!
//! - **`keymap`** – The 250-entry JIS table: which physical key, with which of
//!   SHIFT / GRAPH / KANA / CAPS, produces each character.
//!
//! - **`keystroke`** – Walks the sanitized lines and yields the minimal
//!   sequence of modifier changes and key presses that types them.
//!
//! - **`domain`** – Screenshots and the pixel rule that says whether the
//!   emulated disk drive is busy.

pub mod domain;
pub mod keymap;
pub mod keystroke;
pub mod text;

pub use domain::busy::{is_busy, Rgb};
pub use domain::screenshot::Screenshot;
pub use keymap::{CharacterMapping, KeyCode};
pub use keystroke::{HeldModifier, KeyAction, KeystrokeEmitter, ModifierState, ToggleMode};
pub use text::{sanitize_lines, SanitizeError, Sanitized, SanitizedLine};
