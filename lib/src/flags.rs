use std::fmt::{Display, Formatter};

use crate::errors::CompileError;

/// Options that control how a pattern is compiled and matched.
///
/// Each field corresponds to one of the PCRE modifier letters accepted after
/// the closing delimiter of a pattern (see [`Flags::parse`]).
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Flags {
    /// `i`: letters match both their upper and lower case forms.
    pub case_insensitive: bool,
    /// `m`: `^` and `$` match at line boundaries.
    pub multiline: bool,
    /// `s`: `.` also matches a newline.
    pub dot_all: bool,
    /// `x`: unescaped whitespace and `#` comments are ignored.
    pub extended: bool,
    /// `u`: character classes such as `\w` and `[:alpha:]` use Unicode
    /// definitions instead of ASCII ones.
    pub unicode: bool,
    /// `e`: accepted and reported, but never interpreted by the engine.
    pub eval: bool,
    /// `U`: quantifiers are lazy by default and `?` makes them greedy.
    pub ungreedy: bool,
    /// `D`: `$` matches only at the very end of the subject.
    pub dollar_end_only: bool,
    /// `A`: the match must start at the search origin.
    pub anchored: bool,
}

impl Flags {
    /// Parses a string of modifier letters, such as `"imsx"`.
    ///
    /// Whitespace and line breaks are ignored, like PHP does with the text
    /// that follows the closing delimiter.
    pub fn parse(letters: &str) -> Result<Self, CompileError> {
        let mut flags = Self::default();
        for c in letters.chars() {
            match c {
                'i' => flags.case_insensitive = true,
                'm' => flags.multiline = true,
                's' => flags.dot_all = true,
                'x' => flags.extended = true,
                'u' => flags.unicode = true,
                'e' => flags.eval = true,
                'U' => flags.ungreedy = true,
                'D' => flags.dollar_end_only = true,
                'A' => flags.anchored = true,
                ' ' | '\n' | '\r' => {}
                flag => return Err(CompileError::UnknownFlag { flag }),
            }
        }
        Ok(flags)
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let letters = [
            (self.case_insensitive, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
            (self.extended, 'x'),
            (self.unicode, 'u'),
            (self.ungreedy, 'U'),
            (self.dollar_end_only, 'D'),
            (self.anchored, 'A'),
            (self.eval, 'e'),
        ];
        for (set, letter) in letters {
            if set {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}
