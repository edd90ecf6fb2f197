//! Unicode decomposition into MSX-typeable symbols.
//!
//! The MSX has no precomposed voiced kana: `が` is typed as `か` followed by
//! the standalone voicing mark `゛`.  Compatibility decomposition (NFKD) splits
//! `が` into `か` + U+3099 (COMBINING VOICED SOUND MARK); the combining marks
//! are then rewritten to their standalone forms U+309B / U+309C, which the
//! keyboard table knows.  NFKD also folds full-width ASCII (`ＡＢＣ`) and
//! half-width katakana onto the ordinary forms.
//!
//! Characters that are already in the MSX alphabet are passed through as-is.
//! This matters for the standalone marks themselves: NFKD would turn `゛` into
//! a space followed by U+3099, so decomposing an already-decomposed line would
//! not be a no-op.

use unicode_normalization::UnicodeNormalization;

use crate::keymap::msx_jis;

/// COMBINING KATAKANA-HIRAGANA VOICED SOUND MARK.
const COMBINING_VOICED: char = '\u{3099}';
/// COMBINING KATAKANA-HIRAGANA SEMI-VOICED SOUND MARK.
const COMBINING_SEMI_VOICED: char = '\u{309A}';
/// KATAKANA-HIRAGANA VOICED SOUND MARK (spacing form).
const VOICED: char = '\u{309B}';
/// KATAKANA-HIRAGANA SEMI-VOICED SOUND MARK (spacing form).
const SEMI_VOICED: char = '\u{309C}';

fn standalone_mark(c: char) -> char {
    match c {
        COMBINING_VOICED => VOICED,
        COMBINING_SEMI_VOICED => SEMI_VOICED,
        other => other,
    }
}

/// Decomposes one line into candidate characters for classification.
///
/// A single visual character may expand into several candidates (`ぱ` →
/// `は`, `゜`).
pub fn decompose_line(line: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(line.len());
    for c in line.chars() {
        if msx_jis::is_supported(c) {
            out.push(c);
        } else {
            out.extend(std::iter::once(c).nfkd().map(standalone_mark));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_unchanged() {
        assert_eq!(decompose_line("PRINT 1"), "PRINT 1".chars().collect::<Vec<_>>());
    }

    #[test]
    fn test_voiced_hiragana_splits_into_base_and_mark() {
        assert_eq!(decompose_line("が"), vec!['か', '゛']);
        assert_eq!(decompose_line("ぱ"), vec!['は', '゜']);
    }

    #[test]
    fn test_voiced_katakana_splits_into_base_and_mark() {
        assert_eq!(decompose_line("ガギ"), vec!['カ', '゛', 'キ', '゛']);
    }

    #[test]
    fn test_standalone_marks_are_kept() {
        assert_eq!(decompose_line("か゛"), vec!['か', '゛']);
        assert_eq!(decompose_line("゜"), vec!['゜']);
    }

    #[test]
    fn test_full_width_ascii_folds_to_ascii() {
        assert_eq!(decompose_line("ＡＢ１"), vec!['A', 'B', '1']);
    }

    #[test]
    fn test_half_width_katakana_folds_to_full_width() {
        assert_eq!(decompose_line("ｶﾞ"), vec!['カ', '゛']);
    }

    #[test]
    fn test_unsupported_characters_pass_through() {
        assert_eq!(decompose_line("猫"), vec!['猫']);
    }
}
