//! Line sanitizer: turns raw text into lines the MSX keyboard can type.
//!
//! Each line is decomposed (see [`super::decompose`]) and every resulting
//! character is looked up in the JIS table.  Unsupported characters are only
//! tolerated inside a BASIC comment, i.e. after an apostrophe, where they are
//! replaced by [`FALLBACK_CHAR`] and reported as a [`Substitution`].  Anywhere
//! else they are a hard [`SanitizeError`].
//!
//! # Locating the comment (for beginners)
//!
//! Decomposition can change a line's length (`が` becomes two characters), so
//! positions in the decomposed line do not match positions in the original.
//! To decide whether an offending character sits inside a comment, the
//! sanitizer takes everything decomposed *before* it, searches for that text
//! in the original line, and checks for an apostrophe up to the end of the
//! match.  The search can be fooled by repeated substrings (it finds the first
//! occurrence), so this is an approximation, not a parser.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use super::decompose::decompose_line;
use crate::keymap::{lookup, CharacterMapping, FALLBACK_CHAR};

/// A line contained a character that can be neither typed nor substituted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanitizeError {
    /// The character is not in the MSX alphabet and is not inside a comment.
    #[error("unsupported character {character:?} (U+{code_point:04X}) on line {line_number}: {line}")]
    UnsupportedCharacter {
        character: char,
        code_point: u32,
        /// 1-indexed.
        line_number: usize,
        line: String,
    },
}

/// An unsupported character inside a comment that was replaced by the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub character: char,
    pub code_point: u32,
    /// 1-indexed.
    pub line_number: usize,
    pub line: String,
}

/// One supported character together with the keyboard state that types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedChar {
    pub ch: char,
    pub mapping: CharacterMapping,
}

/// An immutable line made only of characters from the MSX alphabet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedLine {
    chars: Vec<MappedChar>,
}

impl SanitizedLine {
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The character at `index`, counted in decomposed characters.
    pub fn get(&self, index: usize) -> Option<&MappedChar> {
        self.chars.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappedChar> {
        self.chars.iter()
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().map(|m| m.ch)
    }
}

impl fmt::Display for SanitizedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.chars {
            write!(f, "{}", m.ch)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SanitizedLine {
    type Item = &'a MappedChar;
    type IntoIter = std::slice::Iter<'a, MappedChar>;

    fn into_iter(self) -> Self::IntoIter {
        self.chars.iter()
    }
}

/// Output of [`sanitize_lines`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitized {
    pub lines: Vec<SanitizedLine>,
    /// Fallback substitutions made inside comments, in input order.
    pub substitutions: Vec<Substitution>,
}

/// Sanitizes every line, failing on the first character that cannot be typed.
///
/// Each substitution is also logged as a warning.
///
/// # Errors
///
/// Returns [`SanitizeError::UnsupportedCharacter`] for the first unsupported
/// character that is not preceded by an apostrophe.
pub fn sanitize_lines<S: AsRef<str>>(lines: &[S]) -> Result<Sanitized, SanitizeError> {
    let mut out = Sanitized::default();

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.as_ref();
        let line_number = index + 1;
        let decomposed = decompose_line(line);
        let mut chars = Vec::with_capacity(decomposed.len());

        for (i, &c) in decomposed.iter().enumerate() {
            if let Some(mapping) = lookup(c) {
                chars.push(MappedChar { ch: c, mapping });
                continue;
            }

            if !in_comment(line, &decomposed[..i]) {
                return Err(SanitizeError::UnsupportedCharacter {
                    character: c,
                    code_point: c as u32,
                    line_number,
                    line: line.to_string(),
                });
            }

            warn!(
                "unsupported character {:?} (U+{:04X}) on line {} in comment, replaced with {:?}: {}",
                c, c as u32, line_number, FALLBACK_CHAR, line
            );
            out.substitutions.push(Substitution {
                character: c,
                code_point: c as u32,
                line_number,
                line: line.to_string(),
            });
            if let Some(mapping) = lookup(FALLBACK_CHAR) {
                chars.push(MappedChar { ch: FALLBACK_CHAR, mapping });
            }
        }

        out.lines.push(SanitizedLine { chars });
    }

    Ok(out)
}

/// Whether an apostrophe occurs in `line` before the position of `preceding`.
fn in_comment(line: &str, preceding: &[char]) -> bool {
    let prefix: String = preceding.iter().collect();
    let window = match line.find(&prefix) {
        Some(start) => &line[..start + prefix.len()],
        // Not found: mirror "index -1 plus prefix length", counted in characters.
        None => {
            let take = preceding.len().saturating_sub(1);
            let end = line.char_indices().nth(take).map_or(line.len(), |(b, _)| b);
            &line[..end]
        }
    };
    window.contains('\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(s: &Sanitized) -> Vec<String> {
        s.lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_plain_basic_line_is_kept_verbatim() {
        let result = sanitize_lines(&["PRINT 1"]).unwrap();

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].len(), 7);
        assert_eq!(texts(&result), vec!["PRINT 1"]);
        assert!(result.substitutions.is_empty());
    }

    #[test]
    fn test_unsupported_char_in_comment_becomes_fallback() {
        let result = sanitize_lines(&["10 ' 猫"]).unwrap();

        assert_eq!(texts(&result), vec!["10 ' ・"]);
        assert_eq!(
            result.substitutions,
            vec![Substitution {
                character: '猫',
                code_point: 0x732B,
                line_number: 1,
                line: "10 ' 猫".to_string(),
            }]
        );
    }

    #[test]
    fn test_unsupported_char_outside_comment_fails_with_line_number() {
        let err = sanitize_lines(&["10 CLS", "20 PRINT \"猫\""]).unwrap_err();

        assert_eq!(
            err,
            SanitizeError::UnsupportedCharacter {
                character: '猫',
                code_point: 0x732B,
                line_number: 2,
                line: "20 PRINT \"猫\"".to_string(),
            }
        );
    }

    #[test]
    fn test_error_message_names_character_code_point_and_line() {
        let err = sanitize_lines(&["10 CLS", "猫"]).unwrap_err();
        assert_eq!(err.to_string(), "unsupported character '猫' (U+732B) on line 2: 猫");
    }

    #[test]
    fn test_combining_accent_is_reported_after_decomposition() {
        // NFKD splits "é" into "e" and U+0301; only the accent is rejected.
        let err = sanitize_lines(&["é"]).unwrap_err();
        assert!(matches!(
            err,
            SanitizeError::UnsupportedCharacter { code_point: 0x0301, line_number: 1, .. }
        ));
    }

    #[test]
    fn test_apostrophe_after_the_character_does_not_count() {
        let err = sanitize_lines(&["猫 'comment"]).unwrap_err();
        assert!(matches!(
            err,
            SanitizeError::UnsupportedCharacter { line_number: 1, .. }
        ));
    }

    #[test]
    fn test_voiced_kana_is_decomposed() {
        let result = sanitize_lines(&["が"]).unwrap();
        assert_eq!(texts(&result), vec!["か゛"]);
    }

    #[test]
    fn test_comment_detected_after_decomposition_changed_length() {
        // "が" expands, so the decomposed prefix is not a substring of the line.
        let result = sanitize_lines(&["が ' 猫"]).unwrap();
        assert_eq!(texts(&result), vec!["か゛ ' ・"]);
        assert_eq!(result.substitutions.len(), 1);
    }

    #[test]
    fn test_sanitizing_sanitized_text_is_a_no_op() {
        let input = ["10 PRINT \"がぱ\" ' 猫", "SAVE \"A.BAS\"", "", "カタカナ ﾃｽﾄ"];
        let first = sanitize_lines(&input).unwrap();
        let again = sanitize_lines(&texts(&first)).unwrap();

        assert_eq!(again.lines, first.lines);
        assert!(again.substitutions.is_empty());
    }

    #[test]
    fn test_get_indexes_decomposed_characters() {
        let result = sanitize_lines(&["がA"]).unwrap();
        let line = &result.lines[0];

        assert_eq!(line.get(0).map(|m| m.ch), Some('か'));
        assert_eq!(line.get(1).map(|m| m.ch), Some('゛'));
        assert_eq!(line.get(2).map(|m| m.ch), Some('A'));
        assert!(line.get(3).is_none());
    }

    #[test]
    fn test_empty_line_is_empty() {
        let result = sanitize_lines(&[""]).unwrap();
        assert_eq!(result.lines, vec![SanitizedLine::default()]);
        assert!(result.lines[0].is_empty());
    }

    #[test]
    fn test_mapped_chars_carry_table_mappings() {
        let result = sanitize_lines(&["A"]).unwrap();
        let m = result.lines[0].iter().next().unwrap();
        assert_eq!(m.ch, 'A');
        assert!(m.mapping.shift);
    }
}
