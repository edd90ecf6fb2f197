//! Chrome DevTools Protocol implementation of the emulator driver.
//!
//! - [`launcher`] – find and start Chrome / Chromium.
//! - [`connection`] – the WebSocket, command ids and event fan-out.
//! - [`protocol`] – message types and pure helpers (key events, selectors).
//! - [`image`] – screenshot decoding.
//! - [`driver`] – [`ChromeDriver`], the `EmulatorDriver` implementation.

pub mod connection;
pub mod driver;
pub mod image;
pub mod launcher;
pub mod protocol;

pub use driver::ChromeDriver;
pub use launcher::LaunchOptions;
