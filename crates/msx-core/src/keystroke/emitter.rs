//! Sanitized lines to an ordered stream of [`KeyAction`]s.
//!
//! # Minimal mode changes (for beginners)
//!
//! Typing `AB` naively would press and release SHIFT around each letter.  The
//! emitter instead remembers the keyboard's current [`ModifierState`] and only
//! emits a transition when the next character needs a different one:
//!
//! ```text
//! "AB"  →  ShiftDown, KeyA, KeyB, ShiftUp
//! ```
//!
//! Per character the order is fixed: SHIFT, GRAPH, KANA, CAPS, then the key.
//! SHIFT and GRAPH are released at the end of every line, before the line
//! break.  KANA and CAPS are toggles; they are left in whatever mode the last
//! character needed and [`KeystrokeEmitter::state`] exposes that, so the next
//! call can start from it.

use std::collections::VecDeque;

use super::state::{HeldModifier, KeyAction, ModifierState, ToggleMode};
use crate::text::SanitizedLine;

/// Lazy iterator over the keystrokes that type a block of lines.
#[derive(Debug)]
pub struct KeystrokeEmitter<'a> {
    lines: &'a [SanitizedLine],
    line: usize,
    column: usize,
    /// State after every action yielded so far.
    state: ModifierState,
    /// State after every action queued so far.
    planned: ModifierState,
    capture: bool,
    pending: VecDeque<KeyAction>,
    finished: bool,
}

impl<'a> KeystrokeEmitter<'a> {
    pub fn new(lines: &'a [SanitizedLine], initial: ModifierState) -> Self {
        Self {
            lines,
            line: 0,
            column: 0,
            state: initial,
            planned: initial,
            capture: false,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Emit a [`KeyAction::Capture`] after each line.
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// The keyboard state after every action yielded so far.
    ///
    /// Once the iterator is exhausted this is the final state to pass to the
    /// next emitter.
    pub fn state(&self) -> ModifierState {
        self.state
    }

    fn push(&mut self, action: KeyAction) {
        self.planned.apply(action);
        self.pending.push_back(action);
    }

    fn set_held(&mut self, m: HeldModifier, want: bool) {
        if self.planned.is_held(m) != want {
            self.push(if want { KeyAction::ModifierDown(m) } else { KeyAction::ModifierUp(m) });
        }
    }

    fn set_toggle(&mut self, t: ToggleMode, want: bool) {
        if self.planned.is_on(t) != want {
            self.push(KeyAction::TogglePress(t));
        }
    }

    fn release_held(&mut self) {
        self.set_held(HeldModifier::Shift, false);
        self.set_held(HeldModifier::Graph, false);
    }

    /// Queues the actions for the next character or line end.
    fn refill(&mut self) {
        let Some(line) = self.lines.get(self.line) else {
            self.release_held();
            self.finished = true;
            return;
        };

        if let Some(mapped) = line.get(self.column) {
            let m = mapped.mapping;
            self.set_held(HeldModifier::Shift, m.shift);
            self.set_held(HeldModifier::Graph, m.graph);
            self.set_toggle(ToggleMode::Kana, m.kana);
            self.set_toggle(ToggleMode::Caps, m.caps);
            self.push(KeyAction::KeyPress(m.key));
            self.column += 1;
            return;
        }

        self.release_held();
        if self.line + 1 < self.lines.len() {
            self.push(KeyAction::LineBreak);
        }
        if self.capture {
            self.push(KeyAction::Capture);
        }
        self.line += 1;
        self.column = 0;
    }
}

impl Iterator for KeystrokeEmitter<'_> {
    type Item = KeyAction;

    fn next(&mut self) -> Option<KeyAction> {
        loop {
            if let Some(action) = self.pending.pop_front() {
                self.state.apply(action);
                return Some(action);
            }
            if self.finished {
                return None;
            }
            self.refill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::msx_jis::MSX_JIS_TABLE;
    use crate::keymap::KeyCode;
    use crate::text::sanitize_lines;

    use HeldModifier::{Graph, Shift};
    use KeyAction::*;
    use ToggleMode::{Caps, Kana};

    fn lines(input: &[&str]) -> Vec<SanitizedLine> {
        sanitize_lines(input).unwrap().lines
    }

    fn emit(input: &[&str]) -> Vec<KeyAction> {
        let l = lines(input);
        KeystrokeEmitter::new(&l, ModifierState::default()).collect()
    }

    #[test]
    fn test_two_capitals_share_one_shift() {
        assert_eq!(
            emit(&["AB"]),
            vec![
                ModifierDown(Shift),
                KeyPress(KeyCode::KeyA),
                KeyPress(KeyCode::KeyB),
                ModifierUp(Shift),
            ]
        );
    }

    #[test]
    fn test_lower_case_needs_no_modifiers() {
        assert_eq!(emit(&["ab"]), vec![KeyPress(KeyCode::KeyA), KeyPress(KeyCode::KeyB)]);
    }

    #[test]
    fn test_line_break_only_between_lines() {
        let actions = emit(&["a", "b", "c"]);
        assert_eq!(
            actions,
            vec![
                KeyPress(KeyCode::KeyA),
                LineBreak,
                KeyPress(KeyCode::KeyB),
                LineBreak,
                KeyPress(KeyCode::KeyC),
            ]
        );
    }

    #[test]
    fn test_capture_after_every_line_including_last() {
        let l = lines(&["a", ""]);
        let actions: Vec<_> = KeystrokeEmitter::new(&l, ModifierState::default())
            .with_capture(true)
            .collect();

        assert_eq!(actions, vec![KeyPress(KeyCode::KeyA), LineBreak, Capture, Capture]);
    }

    #[test]
    fn test_shift_released_before_line_break_and_capture() {
        let l = lines(&["A", "b"]);
        let actions: Vec<_> = KeystrokeEmitter::new(&l, ModifierState::default())
            .with_capture(true)
            .collect();

        assert_eq!(
            actions,
            vec![
                ModifierDown(Shift),
                KeyPress(KeyCode::KeyA),
                ModifierUp(Shift),
                LineBreak,
                Capture,
                KeyPress(KeyCode::KeyB),
                Capture,
            ]
        );
    }

    #[test]
    fn test_katakana_toggles_kana_then_caps() {
        assert_eq!(
            emit(&["カ"]),
            vec![TogglePress(Kana), TogglePress(Caps), KeyPress(KeyCode::KeyT)]
        );
    }

    #[test]
    fn test_kana_and_caps_persist_and_are_reported() {
        let l = lines(&["カ", "キ"]);
        let mut emitter = KeystrokeEmitter::new(&l, ModifierState::default());
        let actions: Vec<_> = emitter.by_ref().collect();

        let toggles = actions.iter().filter(|a| matches!(a, TogglePress(_))).count();
        assert_eq!(toggles, 2, "second line reuses the katakana mode: {actions:?}");
        assert_eq!(
            emitter.state(),
            ModifierState { shift: false, graph: false, kana: true, caps: true }
        );
    }

    #[test]
    fn test_initial_state_is_honoured() {
        let l = lines(&["a"]);
        let initial = ModifierState { shift: false, graph: false, kana: true, caps: true };
        let actions: Vec<_> = KeystrokeEmitter::new(&l, initial).collect();

        assert_eq!(
            actions,
            vec![TogglePress(Kana), TogglePress(Caps), KeyPress(KeyCode::KeyA)]
        );
    }

    #[test]
    fn test_held_initial_state_is_released_even_without_lines() {
        let initial = ModifierState { shift: true, graph: true, kana: false, caps: false };
        let actions: Vec<_> = KeystrokeEmitter::new(&[], initial).collect();

        assert_eq!(actions, vec![ModifierUp(Shift), ModifierUp(Graph)]);
    }

    #[test]
    fn test_graph_and_shift_swap() {
        assert_eq!(
            emit(&["A日"]),
            vec![
                ModifierDown(Shift),
                KeyPress(KeyCode::KeyA),
                ModifierUp(Shift),
                ModifierDown(Graph),
                KeyPress(KeyCode::Digit1),
                ModifierUp(Graph),
            ]
        );
    }

    #[test]
    fn test_replaying_each_character_reproduces_its_mapping() {
        for (c, mapping) in MSX_JIS_TABLE {
            let text = c.to_string();
            let l = lines(&[text.as_str()]);
            let mut state = ModifierState::default();

            for action in KeystrokeEmitter::new(&l, ModifierState::default()) {
                if let KeyPress(key) = action {
                    assert_eq!(key, mapping.key, "{c:?}");
                    break;
                }
                state.apply(action);
            }

            assert_eq!(state, ModifierState::required_by(mapping), "{c:?}");
        }
    }

    #[test]
    fn test_no_consecutive_duplicate_modifier_transitions() {
        let input = ["Hello WORLD 日月", "カナ かな ガギ ｱｲｳ", "PRINT \"π\"", "", "ぁァ"];
        let l = lines(&input);
        let mut last: std::collections::HashMap<HeldModifier, KeyAction> = Default::default();

        for action in KeystrokeEmitter::new(&l, ModifierState::default()) {
            if let ModifierDown(m) | ModifierUp(m) = action {
                assert_ne!(last.get(&m), Some(&action), "repeated {action:?}");
                last.insert(m, action);
            }
        }
    }

    #[test]
    fn test_long_line_types_every_character_in_order() {
        let text = "ab".repeat(5_000);
        let l = lines(&[text.as_str()]);

        let keys: Vec<KeyCode> = KeystrokeEmitter::new(&l, ModifierState::default())
            .filter_map(|a| match a {
                KeyPress(k) => Some(k),
                _ => None,
            })
            .collect();

        assert_eq!(keys.len(), 10_000);
        assert!(keys.chunks(2).all(|c| c == [KeyCode::KeyA, KeyCode::KeyB]));
    }

    #[test]
    fn test_sequence_ends_with_nothing_held() {
        let l = lines(&["A日カ"]);
        let mut emitter = KeystrokeEmitter::new(&l, ModifierState::default());
        emitter.by_ref().for_each(drop);

        let end = emitter.state();
        assert!(!end.shift && !end.graph);
        assert!(end.kana && end.caps);
    }
}
