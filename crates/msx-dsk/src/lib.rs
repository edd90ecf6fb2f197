//! msx-dsk library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does msx-dsk do? (for beginners)
//!
//! MSXPen is a web page where you write MSX BASIC and run it in the WebMSX
//! emulator.  It cannot put your program on a floppy image.  msx-dsk does so
//! by driving the page in a real browser, the way a patient human would:
//!
//! 1. Pastes each source file into the editor and runs it.
//! 2. Stops it, inserts the disk image built so far and types
//!    `SAVE "NAME.BAS"` on the emulated keyboard.
//! 3. Exports the disk, which now holds one more file.
//!
//! The typing relies on `msx_core`, which knows which physical key and which
//! MSX modes (SHIFT, GRAPH, KANA, CAPS) produce each character.

/// Application layer: use cases and the browser-driver seam.
pub mod application;

/// Infrastructure layer: configuration, Chrome driver, test driver.
pub mod infrastructure;
