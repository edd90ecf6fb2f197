//! The emitter's model of the remote MSX keyboard.

use crate::keymap::msx_jis::{KEY_CAPS, KEY_GRAPH, KEY_KANA, KEY_SHIFT};
use crate::keymap::{CharacterMapping, KeyCode};

/// A mode that is active only while its key is held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeldModifier {
    Shift,
    Graph,
}

impl HeldModifier {
    /// The host key bound to this MSX key.
    pub fn key(self) -> KeyCode {
        match self {
            HeldModifier::Shift => KEY_SHIFT,
            HeldModifier::Graph => KEY_GRAPH,
        }
    }
}

/// A mode that flips on every press of its key and stays flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleMode {
    Kana,
    Caps,
}

impl ToggleMode {
    /// The host key bound to this MSX key.
    pub fn key(self) -> KeyCode {
        match self {
            ToggleMode::Kana => KEY_KANA,
            ToggleMode::Caps => KEY_CAPS,
        }
    }
}

/// One step of synthesized keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Press and keep holding a held modifier.
    ModifierDown(HeldModifier),
    /// Release a held modifier.
    ModifierUp(HeldModifier),
    /// Press and release a toggle key, flipping its mode.
    TogglePress(ToggleMode),
    /// Press and release a character key.
    KeyPress(KeyCode),
    /// Press and release Enter between two lines.
    LineBreak,
    /// Save a proof capture of the emulator screen.
    Capture,
}

impl KeyAction {
    /// The host key this action touches, if any.
    pub fn host_key(self) -> Option<KeyCode> {
        match self {
            KeyAction::ModifierDown(m) | KeyAction::ModifierUp(m) => Some(m.key()),
            KeyAction::TogglePress(t) => Some(t.key()),
            KeyAction::KeyPress(k) => Some(k),
            KeyAction::LineBreak => Some(KeyCode::Enter),
            KeyAction::Capture => None,
        }
    }
}

/// What the emitter believes the remote keyboard's modes currently are.
///
/// All `false` is the power-on state of the MSX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    pub shift: bool,
    pub graph: bool,
    pub kana: bool,
    pub caps: bool,
}

impl ModifierState {
    /// The modes required to type the character described by `mapping`.
    pub fn required_by(mapping: &CharacterMapping) -> Self {
        Self {
            shift: mapping.shift,
            graph: mapping.graph,
            kana: mapping.kana,
            caps: mapping.caps,
        }
    }

    pub fn is_held(&self, m: HeldModifier) -> bool {
        match m {
            HeldModifier::Shift => self.shift,
            HeldModifier::Graph => self.graph,
        }
    }

    pub fn is_on(&self, t: ToggleMode) -> bool {
        match t {
            ToggleMode::Kana => self.kana,
            ToggleMode::Caps => self.caps,
        }
    }

    /// Updates the state as the remote keyboard would after `action`.
    pub fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::ModifierDown(m) => self.set_held(m, true),
            KeyAction::ModifierUp(m) => self.set_held(m, false),
            KeyAction::TogglePress(ToggleMode::Kana) => self.kana = !self.kana,
            KeyAction::TogglePress(ToggleMode::Caps) => self.caps = !self.caps,
            KeyAction::KeyPress(_) | KeyAction::LineBreak | KeyAction::Capture => {}
        }
    }

    fn set_held(&mut self, m: HeldModifier, down: bool) {
        match m {
            HeldModifier::Shift => self.shift = down,
            HeldModifier::Graph => self.graph = down,
        }
    }
}
