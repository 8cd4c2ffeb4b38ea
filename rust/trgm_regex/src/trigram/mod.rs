//! Host-side trigram conventions.
//!
//! The graph builder only needs a few things from the trigram machinery
//! that indexes text:
//!
//! - **compact_trigram**: the canonical 3-byte token for three characters
//! - **CharHost**: word-character test, multibyte conversion, case folding
//! - **extract**: the extractor itself, used to index documents and to
//!   compute which trigrams a candidate contains
//!
//! Words are padded with [`LPADDING`] blanks on the left and [`RPADDING`] on
//! the right. The arc-label rules in [`crate::color::valid_arc_label`]
//! assume exactly these values.

pub mod extract;

use std::borrow::Cow;

pub use extract::extract_trigrams;

/// A simple trigram as stored in the index.
pub type Trigram = [u8; 3];

/// Blanks added in front of every word.
pub const LPADDING: usize = 2;
/// Blanks added after every word.
pub const RPADDING: usize = 1;

/// Longest UTF-8 encoding of a single character.
pub const MAX_MULTIBYTE_CHAR_LEN: usize = 4;

/// One character in multibyte (UTF-8) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MbChar {
    bytes: [u8; MAX_MULTIBYTE_CHAR_LEN],
    len: u8,
}

impl MbChar {
    /// Encode `c` as UTF-8.
    pub fn from_char(c: char) -> Self {
        let mut bytes = [0u8; MAX_MULTIBYTE_CHAR_LEN];
        let len = c.encode_utf8(&mut bytes).len() as u8;
        MbChar { bytes, len }
    }

    /// The UTF-8 bytes of the character.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Decode back to a `char`.
    pub fn to_char(&self) -> Option<char> {
        std::str::from_utf8(self.as_bytes()).ok()?.chars().next()
    }
}

/// Character conventions shared by the extractor and the graph builder.
///
/// Both sides must agree, otherwise the produced trigrams would never be
/// found in the index.
pub trait CharHost {
    /// Is this a character that trigrams are built from?
    fn is_word_char(&self, c: &MbChar) -> bool;

    /// Convert a regex color member to multibyte form, or `None` to drop it.
    fn to_multibyte(&self, c: char) -> Option<MbChar>;

    /// The single character `c` becomes in folded text, or `None` if
    /// folding turns it into several characters.
    fn fold_char(&self, c: char) -> Option<char> {
        Some(c)
    }

    /// Normalize text before extraction.
    fn fold_case<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Word characters are Unicode alphanumerics; optionally case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCharHost {
    pub case_insensitive: bool,
}

impl DefaultCharHost {
    /// Create a host, case-insensitive if `case_insensitive` is set.
    pub fn new(case_insensitive: bool) -> Self {
        DefaultCharHost { case_insensitive }
    }
}

impl CharHost for DefaultCharHost {
    fn is_word_char(&self, c: &MbChar) -> bool {
        c.to_char().is_some_and(char::is_alphanumeric)
    }

    fn to_multibyte(&self, c: char) -> Option<MbChar> {
        // NUL never appears in indexed text.
        if c == '\0' {
            return None;
        }
        Some(MbChar::from_char(c))
    }

    fn fold_char(&self, c: char) -> Option<char> {
        if !self.case_insensitive {
            return Some(c);
        }
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => Some(l),
            _ => None,
        }
    }

    fn fold_case<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_insensitive {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        }
    }
}

/// Reduce the bytes of three characters to a trigram.
///
/// Exactly three bytes are kept as they are; anything longer is hashed with
/// CRC-32 and the low three bytes of the checksum are used.
pub fn compact_trigram(bytes: &[u8]) -> Trigram {
    if bytes.len() == 3 {
        return [bytes[0], bytes[1], bytes[2]];
    }
    let crc = crc32fast::hash(bytes).to_le_bytes();
    [crc[0], crc[1], crc[2]]
}
