//! [`KeyCode`] to Windows Virtual Key (VK) code translation.
//!
//! Browsers expose the legacy `KeyboardEvent.keyCode` / `which` properties,
//! whose values are Windows VK codes on every platform.  The DevTools input
//! domain expects the same number in `windowsVirtualKeyCode`; without it,
//! synthesized events reach page scripts with `keyCode == 0`.
//!
//! Reference: https://learn.microsoft.com/windows/win32/inputdev/virtual-key-codes

use super::key_code::KeyCode;

/// Translates a [`KeyCode`] to its Windows Virtual Key code.
///
/// Every modelled key has a VK equivalent, so this never fails.
pub fn key_to_vk(key: KeyCode) -> u8 {
    use KeyCode::*;
    match key {
        // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ─────────────────────────────
        KeyA | KeyB | KeyC | KeyD | KeyE | KeyF | KeyG | KeyH | KeyI | KeyJ | KeyK | KeyL
        | KeyM | KeyN | KeyO | KeyP | KeyQ | KeyR | KeyS | KeyT | KeyU | KeyV | KeyW | KeyX
        | KeyY | KeyZ => 0x41 + (key.as_u16() - KeyA.as_u16()) as u8,

        // ── Digit row (VK_0=0x30 … VK_9=0x39) ────────────────────────────────
        Digit0 => 0x30,
        Digit1 | Digit2 | Digit3 | Digit4 | Digit5 | Digit6 | Digit7 | Digit8 | Digit9 => {
            0x31 + (key.as_u16() - Digit1.as_u16()) as u8
        }

        // ── Control keys ──────────────────────────────────────────────────────
        Enter => 0x0D,    // VK_RETURN
        Space => 0x20,    // VK_SPACE
        CapsLock => 0x14, // VK_CAPITAL
        F9 => 0x78,       // VK_F9

        // ── Navigation ────────────────────────────────────────────────────────
        Insert => 0x2D,    // VK_INSERT
        Home => 0x24,      // VK_HOME
        PageUp => 0x21,    // VK_PRIOR
        End => 0x23,       // VK_END
        ArrowUp => 0x26,   // VK_UP
        ArrowDown => 0x28, // VK_DOWN

        // ── Punctuation (US layout OEM codes) ─────────────────────────────────
        Minus => 0xBD,        // VK_OEM_MINUS
        Equal => 0xBB,        // VK_OEM_PLUS
        BracketLeft => 0xDB,  // VK_OEM_4
        BracketRight => 0xDD, // VK_OEM_6
        Semicolon => 0xBA,    // VK_OEM_1
        Quote => 0xDE,        // VK_OEM_7
        Comma => 0xBC,        // VK_OEM_COMMA
        Period => 0xBE,       // VK_OEM_PERIOD
        Slash => 0xBF,        // VK_OEM_2

        // ── Modifiers (generic VKs, as browsers report them) ──────────────────
        ControlLeft => 0x11,         // VK_CONTROL
        ShiftLeft => 0x10,           // VK_SHIFT
        AltLeft | AltRight => 0x12,  // VK_MENU
    }
}
