//! Text preparation: from arbitrary Unicode to the MSX alphabet.
//!
//! - [`decompose`] – NFKD plus standalone voicing marks.
//! - [`sanitize`] – per-line classification, comment fallback, hard errors.

pub mod decompose;
pub mod sanitize;

pub use decompose::decompose_line;
pub use sanitize::{sanitize_lines, MappedChar, SanitizeError, Sanitized, SanitizedLine, Substitution};
