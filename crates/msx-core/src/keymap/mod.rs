//! Keyboard tables: physical host keys and the MSX JIS character layout.
//!
//! - [`key_code`] – the physical keys the tool drives, valued by HID Usage ID,
//!   with their DOM `code` / `key` names.
//! - [`windows_vk`] – the legacy `keyCode` value browsers attach to each key.
//! - [`msx_jis`] – which key and which MSX modes produce each character.

pub mod key_code;
pub mod msx_jis;
pub mod windows_vk;

pub use key_code::KeyCode;
pub use msx_jis::{lookup, is_supported, CharacterMapping, FALLBACK_CHAR};
