//! Keystroke synthesis: modifier state and the modal emitter.

pub mod emitter;
pub mod state;

pub use emitter::KeystrokeEmitter;
pub use state::{HeldModifier, KeyAction, ModifierState, ToggleMode};
