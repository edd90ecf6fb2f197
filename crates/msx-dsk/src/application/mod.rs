//! Application layer use cases for the disk transfer tool.
//!
//! # What use cases does the tool have?
//!
//! - **`type_text`** – Types sanitized lines into the emulator.  The keystroke
//!   plan comes from `msx_core::KeystrokeEmitter`; this module only turns each
//!   `KeyAction` into driver calls with the right delays.
//!
//! - **`busy_wait`** – Polls the disk-drive LED until the emulator has
//!   finished reading or writing.
//!
//! - **`webmsx`** – Menu recipes on the emulator: select the machine, remap
//!   the JIS keys, export / remove / load disk A, stop, paste and run.
//!
//! - **`transfer`** – The orchestrator that chains all of the above for every
//!   source file, retrying a file whose snapshot failed to load.
//!
//! The browser itself is reached only through the `EmulatorDriver` trait in
//! **`driver`**, so every use case can be tested without Chrome.

pub mod busy_wait;
pub mod driver;
pub mod naming;
pub mod pacing;
pub mod transfer;
pub mod type_text;
pub mod webmsx;
