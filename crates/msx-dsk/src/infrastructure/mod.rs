//! Infrastructure layer: everything that touches the outside world.
//!
//! **Dependency rule**: this layer may depend on `application` and `msx_core`,
//! but MUST NOT be imported by `application` code outside `#[cfg(test)]`
//! modules.  The application tests drive their use cases through
//! [`mock::RecordingDriver`].
//!
//! # Sub-modules
//!
//! - **`config`** – the JSON / TOML config file: schema, validation, path
//!   resolution and conversion to orchestrator settings.
//!
//! - **`cdp`** – `ChromeDriver`, the `EmulatorDriver` implementation that
//!   launches Chrome and drives it over the DevTools Protocol WebSocket.
//!
//! - **`mock`** – `RecordingDriver`, an in-memory driver that records every
//!   call, used by the application unit tests and the integration tests.

pub mod cdp;
pub mod config;
pub mod mock;
