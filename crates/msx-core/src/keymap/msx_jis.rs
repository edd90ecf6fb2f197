//! The MSX Japanese (JIS) keyboard: which host key, under which modes,
//! produces each character the MSX can display.
//!
//! # How an MSX1 Japanese keyboard types (for beginners)
//!
//! The MSX keyboard has four modes that combine freely:
//!
//! | Mode    | Kind   | Effect                                             |
//! |---------|--------|----------------------------------------------------|
//! | SHIFT   | held   | upper-case letters, shifted symbols, small kana    |
//! | GRAPH   | held   | kanji (日 月 火 …), card suits, box drawing        |
//! | KANA    | toggle | the JIS kana layout (hiragana)                     |
//! | CAPS    | toggle | while KANA is on, switches hiragana to katakana    |
//!
//! *Held* modes apply only while the key is physically down.  *Toggle* modes
//! flip on each press and stay that way, like Caps Lock on a PC.
//!
//! WebMSX maps host keys onto the MSX matrix by `KeyboardEvent.code`.  Three
//! JIS-only keys (yen, the key right of `@`/`[`, and the underscore key) have
//! no US equivalent, so the emulator is told at start-up to accept `Home`,
//! `Insert` and `End` for them.  GRAPH is bound to `PageUp` and KANA to
//! `AltRight` by WebMSX's default host mapping.
//!
//! # The table
//!
//! [`MSX_JIS_TABLE`] lists every supported character exactly once.  It is a
//! `static` slice; [`lookup`] indexes it through a `HashMap` built on first use.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::key_code::KeyCode::{self, *};

/// Host key bound to the MSX KANA toggle.
pub const KEY_KANA: KeyCode = AltRight;
/// Host key bound to the MSX CAPS toggle.
pub const KEY_CAPS: KeyCode = CapsLock;
/// Host key bound to the MSX GRAPH key.
pub const KEY_GRAPH: KeyCode = PageUp;
/// Host key bound to the MSX SHIFT key.
pub const KEY_SHIFT: KeyCode = ShiftLeft;

/// Host key remapped onto the JIS yen key (`\` / `|`).
pub const KEY_JIS_YEN: KeyCode = Home;
/// Host key remapped onto the JIS `]` / `}` key.
pub const KEY_JIS_BRACKET_RIGHT: KeyCode = Insert;
/// Host key remapped onto the JIS backslash key (`_` when shifted).
pub const KEY_JIS_BACKSLASH: KeyCode = End;

/// Placeholder typed in place of characters the MSX cannot display.
pub const FALLBACK_CHAR: char = '・';

/// Keyboard state and physical key that produce one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterMapping {
    /// SHIFT must be held.
    pub shift: bool,
    /// GRAPH must be held.
    pub graph: bool,
    /// KANA mode must be on.
    pub kana: bool,
    /// CAPS mode must be on.
    pub caps: bool,
    /// The physical key to press.
    pub key: KeyCode,
}

const fn mapping(
    shift: bool,
    graph: bool,
    kana: bool,
    caps: bool,
    key: KeyCode,
) -> CharacterMapping {
    CharacterMapping { shift, graph, kana, caps, key }
}

const fn plain(key: KeyCode) -> CharacterMapping {
    mapping(false, false, false, false, key)
}

const fn shifted(key: KeyCode) -> CharacterMapping {
    mapping(true, false, false, false, key)
}

const fn graph(key: KeyCode) -> CharacterMapping {
    mapping(false, true, false, false, key)
}

const fn hiragana(key: KeyCode) -> CharacterMapping {
    mapping(false, false, true, false, key)
}

const fn hiragana_shifted(key: KeyCode) -> CharacterMapping {
    mapping(true, false, true, false, key)
}

const fn katakana(key: KeyCode) -> CharacterMapping {
    mapping(false, false, true, true, key)
}

const fn katakana_shifted(key: KeyCode) -> CharacterMapping {
    mapping(true, false, true, true, key)
}

/// Every character the MSX1 Japanese keyboard can type, with its mapping.
pub static MSX_JIS_TABLE: &[(char, CharacterMapping)] = &[
    // ── Unshifted: digits, lower-case letters and JIS punctuation ────────────
    (' ', plain(Space)),
    ('1', plain(Digit1)),
    ('2', plain(Digit2)),
    ('3', plain(Digit3)),
    ('4', plain(Digit4)),
    ('5', plain(Digit5)),
    ('6', plain(Digit6)),
    ('7', plain(Digit7)),
    ('8', plain(Digit8)),
    ('9', plain(Digit9)),
    ('0', plain(Digit0)),
    ('-', plain(Minus)),
    ('^', plain(Equal)),
    ('\\', plain(KEY_JIS_YEN)),
    ('q', plain(KeyQ)),
    ('w', plain(KeyW)),
    ('e', plain(KeyE)),
    ('r', plain(KeyR)),
    ('t', plain(KeyT)),
    ('y', plain(KeyY)),
    ('u', plain(KeyU)),
    ('i', plain(KeyI)),
    ('o', plain(KeyO)),
    ('p', plain(KeyP)),
    ('@', plain(BracketLeft)),
    ('[', plain(BracketRight)),
    ('a', plain(KeyA)),
    ('s', plain(KeyS)),
    ('d', plain(KeyD)),
    ('f', plain(KeyF)),
    ('g', plain(KeyG)),
    ('h', plain(KeyH)),
    ('j', plain(KeyJ)),
    ('k', plain(KeyK)),
    ('l', plain(KeyL)),
    (';', plain(Semicolon)),
    (':', plain(Quote)),
    (']', plain(KEY_JIS_BRACKET_RIGHT)),
    ('z', plain(KeyZ)),
    ('x', plain(KeyX)),
    ('c', plain(KeyC)),
    ('v', plain(KeyV)),
    ('b', plain(KeyB)),
    ('n', plain(KeyN)),
    ('m', plain(KeyM)),
    (',', plain(Comma)),
    ('.', plain(Period)),
    ('/', plain(Slash)),

    // ── Shifted: symbols and upper-case letters ──────────────────────────────
    ('!', shifted(Digit1)),
    ('"', shifted(Digit2)),
    ('#', shifted(Digit3)),
    ('$', shifted(Digit4)),
    ('%', shifted(Digit5)),
    ('&', shifted(Digit6)),
    ('\'', shifted(Digit7)),
    ('(', shifted(Digit8)),
    (')', shifted(Digit9)),
    ('=', shifted(Minus)),
    ('~', shifted(Equal)),
    ('|', shifted(KEY_JIS_YEN)),
    ('Q', shifted(KeyQ)),
    ('W', shifted(KeyW)),
    ('E', shifted(KeyE)),
    ('R', shifted(KeyR)),
    ('T', shifted(KeyT)),
    ('Y', shifted(KeyY)),
    ('U', shifted(KeyU)),
    ('I', shifted(KeyI)),
    ('O', shifted(KeyO)),
    ('P', shifted(KeyP)),
    ('`', shifted(BracketLeft)),
    ('{', shifted(BracketRight)),
    ('A', shifted(KeyA)),
    ('S', shifted(KeyS)),
    ('D', shifted(KeyD)),
    ('F', shifted(KeyF)),
    ('G', shifted(KeyG)),
    ('H', shifted(KeyH)),
    ('J', shifted(KeyJ)),
    ('K', shifted(KeyK)),
    ('L', shifted(KeyL)),
    ('+', shifted(Semicolon)),
    ('*', shifted(Quote)),
    ('}', shifted(KEY_JIS_BRACKET_RIGHT)),
    ('Z', shifted(KeyZ)),
    ('X', shifted(KeyX)),
    ('C', shifted(KeyC)),
    ('V', shifted(KeyV)),
    ('B', shifted(KeyB)),
    ('N', shifted(KeyN)),
    ('M', shifted(KeyM)),
    ('<', shifted(Comma)),
    ('>', shifted(Period)),
    ('?', shifted(Slash)),
    ('_', shifted(KEY_JIS_BACKSLASH)),

    // ── GRAPH: kanji, card suits and box drawing ─────────────────────────────
    ('日', graph(Digit1)),
    ('月', graph(Digit2)),
    ('火', graph(Digit3)),
    ('水', graph(Digit4)),
    ('木', graph(Digit5)),
    ('金', graph(Digit6)),
    ('土', graph(Digit7)),
    ('百', graph(Digit8)),
    ('千', graph(Digit9)),
    ('万', graph(Digit0)),
    ('─', graph(Minus)),
    ('円', graph(KEY_JIS_YEN)),
    ('┌', graph(KeyE)),
    ('┬', graph(KeyR)),
    ('┐', graph(KeyT)),
    ('年', graph(KeyY)),
    ('│', graph(KeyI)),
    ('π', graph(KeyP)),
    ('○', graph(BracketRight)),
    ('秒', graph(KeyS)),
    ('├', graph(KeyD)),
    ('┼', graph(KeyF)),
    ('┤', graph(KeyG)),
    ('時', graph(KeyH)),
    ('中', graph(KeyL)),
    ('♣', graph(Semicolon)),
    ('♥', graph(Quote)),
    ('●', graph(KEY_JIS_BRACKET_RIGHT)),
    ('╳', graph(KeyX)),
    ('└', graph(KeyC)),
    ('┴', graph(KeyV)),
    ('┘', graph(KeyB)),
    ('分', graph(KeyM)),
    ('小', graph(Comma)),
    ('大', graph(Period)),
    ('♠', graph(Slash)),
    ('♦', graph(KEY_JIS_BACKSLASH)),

    // ── KANA: hiragana on the JIS kana layout ─────────────────────────────────
    ('ぬ', hiragana(Digit1)),
    ('ふ', hiragana(Digit2)),
    ('あ', hiragana(Digit3)),
    ('う', hiragana(Digit4)),
    ('え', hiragana(Digit5)),
    ('お', hiragana(Digit6)),
    ('や', hiragana(Digit7)),
    ('ゆ', hiragana(Digit8)),
    ('よ', hiragana(Digit9)),
    ('わ', hiragana(Digit0)),
    ('ほ', hiragana(Minus)),
    ('へ', hiragana(Equal)),
    ('ー', hiragana(KEY_JIS_YEN)),
    ('た', hiragana(KeyQ)),
    ('て', hiragana(KeyW)),
    ('い', hiragana(KeyE)),
    ('す', hiragana(KeyR)),
    ('か', hiragana(KeyT)),
    ('ん', hiragana(KeyY)),
    ('な', hiragana(KeyU)),
    ('に', hiragana(KeyI)),
    ('ら', hiragana(KeyO)),
    ('せ', hiragana(KeyP)),
    ('゛', hiragana(BracketLeft)),
    ('゜', hiragana(BracketRight)),
    ('ち', hiragana(KeyA)),
    ('と', hiragana(KeyS)),
    ('し', hiragana(KeyD)),
    ('は', hiragana(KeyF)),
    ('き', hiragana(KeyG)),
    ('く', hiragana(KeyH)),
    ('ま', hiragana(KeyJ)),
    ('の', hiragana(KeyK)),
    ('り', hiragana(KeyL)),
    ('れ', hiragana(Semicolon)),
    ('け', hiragana(Quote)),
    ('む', hiragana(KEY_JIS_BRACKET_RIGHT)),
    ('つ', hiragana(KeyZ)),
    ('さ', hiragana(KeyX)),
    ('そ', hiragana(KeyC)),
    ('ひ', hiragana(KeyV)),
    ('こ', hiragana(KeyB)),
    ('み', hiragana(KeyN)),
    ('も', hiragana(KeyM)),
    ('ね', hiragana(Comma)),
    ('る', hiragana(Period)),
    ('め', hiragana(Slash)),
    ('ろ', hiragana(KEY_JIS_BACKSLASH)),

    // ── KANA + SHIFT: small hiragana and kana punctuation ─────────────────────
    ('ぁ', hiragana_shifted(Digit3)),
    ('ぅ', hiragana_shifted(Digit4)),
    ('ぇ', hiragana_shifted(Digit5)),
    ('ぉ', hiragana_shifted(Digit6)),
    ('ゃ', hiragana_shifted(Digit7)),
    ('ゅ', hiragana_shifted(Digit8)),
    ('ょ', hiragana_shifted(Digit9)),
    ('を', hiragana_shifted(Digit0)),
    ('ぃ', hiragana_shifted(KeyE)),
    ('「', hiragana_shifted(BracketRight)),
    ('」', hiragana_shifted(KEY_JIS_BRACKET_RIGHT)),
    ('っ', hiragana_shifted(KeyZ)),
    ('、', hiragana_shifted(Comma)),
    ('。', hiragana_shifted(Period)),
    ('・', hiragana_shifted(Slash)),

    // ── KANA + CAPS: katakana ─────────────────────────────────────────────────
    ('ヌ', katakana(Digit1)),
    ('フ', katakana(Digit2)),
    ('ア', katakana(Digit3)),
    ('ウ', katakana(Digit4)),
    ('エ', katakana(Digit5)),
    ('オ', katakana(Digit6)),
    ('ヤ', katakana(Digit7)),
    ('ユ', katakana(Digit8)),
    ('ヨ', katakana(Digit9)),
    ('ワ', katakana(Digit0)),
    ('ホ', katakana(Minus)),
    ('ヘ', katakana(Equal)),
    ('タ', katakana(KeyQ)),
    ('テ', katakana(KeyW)),
    ('イ', katakana(KeyE)),
    ('ス', katakana(KeyR)),
    ('カ', katakana(KeyT)),
    ('ン', katakana(KeyY)),
    ('ナ', katakana(KeyU)),
    ('ニ', katakana(KeyI)),
    ('ラ', katakana(KeyO)),
    ('セ', katakana(KeyP)),
    ('チ', katakana(KeyA)),
    ('ト', katakana(KeyS)),
    ('シ', katakana(KeyD)),
    ('ハ', katakana(KeyF)),
    ('キ', katakana(KeyG)),
    ('ク', katakana(KeyH)),
    ('マ', katakana(KeyJ)),
    ('ノ', katakana(KeyK)),
    ('リ', katakana(KeyL)),
    ('レ', katakana(Semicolon)),
    ('ケ', katakana(Quote)),
    ('ム', katakana(KEY_JIS_BRACKET_RIGHT)),
    ('ツ', katakana(KeyZ)),
    ('サ', katakana(KeyX)),
    ('ソ', katakana(KeyC)),
    ('ヒ', katakana(KeyV)),
    ('コ', katakana(KeyB)),
    ('ミ', katakana(KeyN)),
    ('モ', katakana(KeyM)),
    ('ネ', katakana(Comma)),
    ('ル', katakana(Period)),
    ('メ', katakana(Slash)),
    ('ロ', katakana(KEY_JIS_BACKSLASH)),

    // ── KANA + CAPS + SHIFT: small katakana ───────────────────────────────────
    ('ァ', katakana_shifted(Digit3)),
    ('ゥ', katakana_shifted(Digit4)),
    ('ェ', katakana_shifted(Digit5)),
    ('ォ', katakana_shifted(Digit6)),
    ('ャ', katakana_shifted(Digit7)),
    ('ュ', katakana_shifted(Digit8)),
    ('ョ', katakana_shifted(Digit9)),
    ('ヲ', katakana_shifted(Digit0)),
    ('ィ', katakana_shifted(KeyE)),
    ('ッ', katakana_shifted(KeyZ)),
];

fn index() -> &'static HashMap<char, CharacterMapping> {
    static INDEX: OnceLock<HashMap<char, CharacterMapping>> = OnceLock::new();
    INDEX.get_or_init(|| MSX_JIS_TABLE.iter().copied().collect())
}

/// Returns the mapping for `c`, or `None` if the MSX keyboard cannot type it.
pub fn lookup(c: char) -> Option<CharacterMapping> {
    index().get(&c).copied()
}

/// Returns `true` if `c` belongs to the supported alphabet.
pub fn is_supported(c: char) -> bool {
    index().contains_key(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_250_unique_characters() {
        let unique: std::collections::HashSet<char> =
            MSX_JIS_TABLE.iter().map(|(c, _)| *c).collect();
        assert_eq!(MSX_JIS_TABLE.len(), 250);
        assert_eq!(unique.len(), MSX_JIS_TABLE.len(), "duplicate characters in table");
    }

    #[test]
    fn test_lowercase_letters_are_plain() {
        assert_eq!(lookup('a'), Some(plain(KeyA)));
        assert_eq!(lookup('z'), Some(plain(KeyZ)));
    }

    #[test]
    fn test_uppercase_letters_need_shift() {
        let m = lookup('H').unwrap();
        assert!(m.shift && !m.graph && !m.kana && !m.caps);
        assert_eq!(m.key, KeyH);
    }

    #[test]
    fn test_jis_symbol_positions() {
        // JIS layout differs from US: '@' sits where US has '[', and so on.
        assert_eq!(lookup('@').unwrap().key, BracketLeft);
        assert_eq!(lookup('[').unwrap().key, BracketRight);
        assert_eq!(lookup(':').unwrap().key, Quote);
        assert_eq!(lookup('"').unwrap(), shifted(Digit2));
        assert_eq!(lookup('\'').unwrap(), shifted(Digit7));
        assert_eq!(lookup('=').unwrap(), shifted(Minus));
    }

    #[test]
    fn test_remapped_jis_keys() {
        assert_eq!(lookup('\\').unwrap().key, KEY_JIS_YEN);
        assert_eq!(lookup(']').unwrap().key, KEY_JIS_BRACKET_RIGHT);
        assert_eq!(lookup('_').unwrap(), shifted(KEY_JIS_BACKSLASH));
    }

    #[test]
    fn test_graph_characters() {
        assert_eq!(lookup('日'), Some(graph(Digit1)));
        assert_eq!(lookup('π'), Some(graph(KeyP)));
        assert_eq!(lookup('┼'), Some(graph(KeyF)));
    }

    #[test]
    fn test_kana_modes() {
        assert_eq!(lookup('か'), Some(hiragana(KeyT)));
        assert_eq!(lookup('カ'), Some(katakana(KeyT)));
        assert_eq!(lookup('っ'), Some(hiragana_shifted(KeyZ)));
        assert_eq!(lookup('ッ'), Some(katakana_shifted(KeyZ)));
        assert_eq!(lookup('゛'), Some(hiragana(BracketLeft)));
        assert_eq!(lookup('゜'), Some(hiragana(BracketRight)));
    }

    #[test]
    fn test_fallback_char_is_supported() {
        assert!(is_supported(FALLBACK_CHAR));
        assert_eq!(lookup(FALLBACK_CHAR), Some(hiragana_shifted(Slash)));
    }

    #[test]
    fn test_unsupported_characters() {
        // Voiced kana are supported only after decomposition.
        for c in ['猫', '\t', 'é', '€', 'が', 'ガ'] {
            assert!(!is_supported(c), "{c:?} should not be supported");
        }
    }

    #[test]
    fn test_graph_never_combines_with_other_modes() {
        for (c, m) in MSX_JIS_TABLE {
            if m.graph {
                assert!(!m.shift && !m.kana && !m.caps, "{c:?} mixes GRAPH with other modes");
            }
            if m.caps {
                assert!(m.kana, "{c:?} uses CAPS without KANA");
            }
        }
    }
}
