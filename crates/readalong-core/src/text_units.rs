//! Offset arithmetic in the code-unit space the speech engine reports in.
//!
//! Browser speech engines count UTF-16 code units, native ones usually count
//! bytes or scalar values. Whatever the unit, the fed text, the segment map
//! and the boundary events must all agree on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetUnit {
    Utf8,
    Char,
    #[default]
    Utf16,
}

impl std::fmt::Display for OffsetUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OffsetUnit::Utf8 => "utf-8",
            OffsetUnit::Char => "char",
            OffsetUnit::Utf16 => "utf-16",
        };
        write!(f, "{}", label)
    }
}

impl OffsetUnit {
    /// Length of `text` in this unit.
    pub fn len(self, text: &str) -> usize {
        match self {
            OffsetUnit::Utf8 => text.len(),
            OffsetUnit::Char => text.chars().count(),
            OffsetUnit::Utf16 => text.encode_utf16().count(),
        }
    }

    fn char_len(self, ch: char) -> usize {
        match self {
            OffsetUnit::Utf8 => ch.len_utf8(),
            OffsetUnit::Char => 1,
            OffsetUnit::Utf16 => ch.len_utf16(),
        }
    }

    /// Byte index of the position `units` into `text`.
    ///
    /// `None` when the position is past the end or falls inside a code point
    /// (a UTF-8 continuation byte or the second half of a surrogate pair).
    pub fn byte_index(self, text: &str, units: usize) -> Option<usize> {
        if self == OffsetUnit::Utf8 {
            return text.is_char_boundary(units).then_some(units);
        }
        let mut acc = 0usize;
        for (byte_idx, ch) in text.char_indices() {
            if acc == units {
                return Some(byte_idx);
            }
            if acc > units {
                return None;
            }
            acc += self.char_len(ch);
        }
        (acc == units).then_some(text.len())
    }

    /// Sub-slice `[start, start + len)` of `text`, measured in this unit.
    pub fn slice(self, text: &str, start: usize, len: usize) -> Option<&str> {
        let from = self.byte_index(text, start)?;
        let to = self.byte_index(text, start.checked_add(len)?)?;
        text.get(from..to)
    }

    /// Length, in this unit, of the word starting at `byte_start`.
    pub fn word_len_at(self, text: &str, byte_start: usize) -> usize {
        text.get(byte_start..)
            .map(|rest| {
                rest.chars()
                    .take_while(|ch| !ch.is_whitespace())
                    .map(|ch| self.char_len(ch))
                    .sum()
            })
            .unwrap_or(0)
    }
}
