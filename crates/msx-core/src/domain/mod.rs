//! Domain entities for reading the emulator's state.
//!
//! Pure logic with no browser, file-system or async dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is the **domain**: the rules that make the system what it is, with no
//! imports from OS APIs, network libraries or UI frameworks.  Outer layers
//! (the browser driver, the transfer use case) depend on the domain, never the
//! other way round, so everything here can be unit-tested in isolation.
//!
//! Here the domain is small: a screenshot raster and the rule that decides,
//! from one pixel of it, whether the emulated disk drive is busy.

pub mod busy;
pub mod screenshot;
