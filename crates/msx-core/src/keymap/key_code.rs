//! Physical host keys, identified by their USB HID Usage IDs (page 0x07).
//!
//! The emulator listens to browser `KeyboardEvent`s and decides which MSX key
//! was hit from the event's `code` property, i.e. from the *physical position*
//! of the key on the host keyboard.  Every keystroke this crate produces is
//! therefore expressed as a [`KeyCode`]: a physical key, never a character.
//!
//! # Why HID Usage IDs? (for beginners)
//!
//! The **USB HID** standard assigns every physical key a number (its *Usage
//! ID*).  For example:
//!
//! | Key          | HID Usage ID | DOM `code`     |
//! |--------------|-------------|----------------|
//! | Letter A     | 0x04        | `KeyA`         |
//! | Digit 1      | 0x1E        | `Digit1`       |
//! | Enter        | 0x28        | `Enter`        |
//! | Right Alt    | 0xE6        | `AltRight`     |
//!
//! The character a key produces depends on the active layout and modifiers;
//! the Usage ID does not.  That is exactly the property we need: the MSX
//! keyboard matrix is addressed by position, and the mapping from characters
//! to positions lives in [`super::msx_jis`].
//!
//! Only the keys the transfer tool actually drives are modelled.

/// A physical host key, valued by its USB HID Usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum KeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation keys (HID 0x28–0x38)
    Enter = 0x28,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Semicolon = 0x33,
    Quote = 0x34,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    // Lock keys
    CapsLock = 0x39,

    // Function keys
    F9 = 0x42,

    // Navigation cluster
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    End = 0x4D,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Modifier keys (HID 0xE0–0xE7)
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
    AltRight = 0xE6,
}

impl KeyCode {
    /// Returns the raw USB HID Usage ID for this key.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// DOM `KeyboardEvent.code` string for this key.
    pub fn dom_code(self) -> &'static str {
        use KeyCode::*;
        match self {
            KeyA => "KeyA",
            KeyB => "KeyB",
            KeyC => "KeyC",
            KeyD => "KeyD",
            KeyE => "KeyE",
            KeyF => "KeyF",
            KeyG => "KeyG",
            KeyH => "KeyH",
            KeyI => "KeyI",
            KeyJ => "KeyJ",
            KeyK => "KeyK",
            KeyL => "KeyL",
            KeyM => "KeyM",
            KeyN => "KeyN",
            KeyO => "KeyO",
            KeyP => "KeyP",
            KeyQ => "KeyQ",
            KeyR => "KeyR",
            KeyS => "KeyS",
            KeyT => "KeyT",
            KeyU => "KeyU",
            KeyV => "KeyV",
            KeyW => "KeyW",
            KeyX => "KeyX",
            KeyY => "KeyY",
            KeyZ => "KeyZ",
            Digit1 => "Digit1",
            Digit2 => "Digit2",
            Digit3 => "Digit3",
            Digit4 => "Digit4",
            Digit5 => "Digit5",
            Digit6 => "Digit6",
            Digit7 => "Digit7",
            Digit8 => "Digit8",
            Digit9 => "Digit9",
            Digit0 => "Digit0",
            Enter => "Enter",
            Space => "Space",
            Minus => "Minus",
            Equal => "Equal",
            BracketLeft => "BracketLeft",
            BracketRight => "BracketRight",
            Semicolon => "Semicolon",
            Quote => "Quote",
            Comma => "Comma",
            Period => "Period",
            Slash => "Slash",
            CapsLock => "CapsLock",
            F9 => "F9",
            Insert => "Insert",
            Home => "Home",
            PageUp => "PageUp",
            End => "End",
            ArrowDown => "ArrowDown",
            ArrowUp => "ArrowUp",
            ControlLeft => "ControlLeft",
            ShiftLeft => "ShiftLeft",
            AltLeft => "AltLeft",
            AltRight => "AltRight",
        }
    }

    /// The character a US host layout produces for this key without modifiers.
    ///
    /// `None` for non-printing keys.  Browsers report this in
    /// `KeyboardEvent.key` and fire an `input` character for it.
    pub fn base_char(self) -> Option<char> {
        use KeyCode::*;
        let raw = self.as_u16();
        let c = match self {
            _ if (0x04..=0x1D).contains(&raw) => (b'a' + (raw - 0x04) as u8) as char,
            _ if (0x1E..=0x26).contains(&raw) => (b'1' + (raw - 0x1E) as u8) as char,
            Digit0 => '0',
            Space => ' ',
            Minus => '-',
            Equal => '=',
            BracketLeft => '[',
            BracketRight => ']',
            Semicolon => ';',
            Quote => '\'',
            Comma => ',',
            Period => '.',
            Slash => '/',
            _ => return None,
        };
        Some(c)
    }

    /// DOM `KeyboardEvent.key` value for this key without modifiers.
    pub fn dom_key(self) -> String {
        use KeyCode::*;
        if let Some(c) = self.base_char() {
            return c.to_string();
        }
        match self {
            ControlLeft => "Control",
            ShiftLeft => "Shift",
            AltLeft | AltRight => "Alt",
            other => other.dom_code(),
        }
        .to_string()
    }
}
