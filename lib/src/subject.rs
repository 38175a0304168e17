/*! Sequences of characters that patterns are matched against.

The engine addresses the subject by character index and needs constant-time
random access, so it doesn't work on `&str` directly. A `&str` can be turned
into a [`Text`], which stores its characters in a vector. Byte slices are
also accepted, each byte is interpreted as a Latin-1 character.
*/

use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// An indexable sequence of characters.
pub trait Subject {
    /// Number of characters in the sequence.
    fn len(&self) -> usize;

    /// Returns the character at index `i`. The index must be lower than
    /// [`Subject::len`].
    fn char_at(&self, i: usize) -> char;

    /// Returns true if the sequence contains no characters.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the characters in the range `start..end` as a string.
    fn substring(&self, start: usize, end: usize) -> String {
        (start..end.min(self.len())).map(|i| self.char_at(i)).collect()
    }
}

impl Subject for [char] {
    #[inline]
    fn len(&self) -> usize {
        <[char]>::len(self)
    }

    #[inline]
    fn char_at(&self, i: usize) -> char {
        self[i]
    }
}

impl Subject for Vec<char> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    fn char_at(&self, i: usize) -> char {
        self[i]
    }
}

impl Subject for [u8] {
    #[inline]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    #[inline]
    fn char_at(&self, i: usize) -> char {
        char::from(self[i])
    }
}

/// Text decoded into characters, ready to be used as a [`Subject`].
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Text(Vec<char>);

impl Text {
    /// Creates a [`Text`] from a string slice.
    pub fn new(s: &str) -> Self {
        Self(s.chars().collect())
    }

    /// Returns the characters in the text.
    pub fn as_chars(&self) -> &[char] {
        self.0.as_slice()
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self::new(s.as_str())
    }
}

impl Deref for Text {
    type Target = [char];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl Subject for Text {
    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn char_at(&self, i: usize) -> char {
        self.0[i]
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in &self.0 {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
