/*! Character-level matchers.

This module contains the leaves of the compiled program: the predicates that
decide whether a single character of the subject is accepted. Sets use an
ASCII bitmap for characters lower than 128 and a sorted list of ranges for
everything else.
*/

use std::fmt::{Display, Formatter, Write};

use bitvec::array::BitArray;

pub(crate) mod unicode;

pub(crate) use unicode::Range;

/// Returns the simple lowercase mapping of `c`, or `c` itself when the
/// lowercase form is not a single character.
#[inline]
pub(crate) fn to_lower(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Returns the simple uppercase mapping of `c`, or `c` itself when the
/// uppercase form is not a single character.
#[inline]
pub(crate) fn to_upper(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_uppercase();
    }
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Compares two characters ignoring case.
#[inline]
pub(crate) fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || to_lower(a) == to_lower(b) || to_upper(a) == to_upper(b)
}

/// A set of characters, as described by a bracketed class like `[a-z\d]`
/// or by a shorthand like `\w` or `\p{Greek}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CharSet {
    ascii: BitArray<[u64; 2]>,
    // Sorted, non-overlapping ranges of characters >= 128.
    ranges: Vec<Range>,
    negated: bool,
    case_insensitive: bool,
}

impl CharSet {
    /// Creates a set from a list of ranges. The ranges don't need to be
    /// sorted and may overlap.
    pub fn from_ranges<I>(ranges: I, negated: bool, case_insensitive: bool) -> Self
    where
        I: IntoIterator<Item = Range>,
    {
        let mut ascii = BitArray::ZERO;
        let mut high = Vec::new();

        for (lo, hi) in ranges {
            if lo > hi {
                continue;
            }
            if lo.is_ascii() {
                let end = if hi.is_ascii() { hi as usize } else { 127 };
                ascii[lo as usize..=end].fill(true);
            }
            if !hi.is_ascii() {
                high.push((lo.max('\u{80}'), hi));
            }
        }

        high.sort_unstable();

        let mut merged: Vec<Range> = Vec::with_capacity(high.len());
        for (lo, hi) in high {
            match merged.last_mut() {
                Some(last) if lo as u32 <= last.1 as u32 + 1 => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }

        Self { ascii, ranges: merged, negated, case_insensitive }
    }

    #[inline]
    fn contains_exact(&self, c: char) -> bool {
        if c.is_ascii() {
            return self.ascii[c as usize];
        }
        self.ranges
            .binary_search_by(|(lo, hi)| {
                if *hi < c {
                    std::cmp::Ordering::Less
                } else if *lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Returns true if `c` belongs to the set.
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        let mut found = self.contains_exact(c);
        if !found && self.case_insensitive {
            found = self.contains_exact(to_lower(c))
                || self.contains_exact(to_upper(c));
        }
        found != self.negated
    }
}

impl Display for CharSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const MAX_SHOWN: usize = 8;

        let mut out = String::new();
        let mut shown = 0;
        let mut i = 0;

        while i < 128 {
            if !self.ascii[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < 128 && self.ascii[i] {
                i += 1;
            }
            if shown < MAX_SHOWN {
                write_range(&mut out, start as u8 as char, (i - 1) as u8 as char)?;
            }
            shown += 1;
        }

        for (lo, hi) in &self.ranges {
            if shown < MAX_SHOWN {
                write_range(&mut out, *lo, *hi)?;
            }
            shown += 1;
        }

        if shown > MAX_SHOWN {
            write!(out, "...+{}", shown - MAX_SHOWN)?;
        }

        write!(
            f,
            "[{}{}]{}",
            if self.negated { "^" } else { "" },
            out,
            if self.case_insensitive { "/i" } else { "" }
        )
    }
}

fn write_range(out: &mut String, lo: char, hi: char) -> std::fmt::Result {
    if lo == hi {
        write!(out, "{}", lo.escape_debug())
    } else {
        write!(out, "{}-{}", lo.escape_debug(), hi.escape_debug())
    }
}

/// Predicate for a single character of the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CharMatcher {
    /// `.` in dot-all mode.
    Any,
    /// `.` without dot-all mode.
    AnyExceptNewline,
    Char(char),
    CharNoCase(char),
    Set(Box<CharSet>),
}

impl CharMatcher {
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharMatcher::Any => true,
            CharMatcher::AnyExceptNewline => c != '\n',
            CharMatcher::Char(expected) => c == *expected,
            CharMatcher::CharNoCase(expected) => eq_ignore_case(c, *expected),
            CharMatcher::Set(set) => set.contains(c),
        }
    }

    /// Creates the matcher for a literal character, taking case sensitivity
    /// into account. Characters without case variants always produce a
    /// case-sensitive matcher.
    pub fn literal(c: char, case_insensitive: bool) -> Self {
        if case_insensitive && (to_lower(c) != c || to_upper(c) != c) {
            CharMatcher::CharNoCase(c)
        } else {
            CharMatcher::Char(c)
        }
    }
}

impl Display for CharMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CharMatcher::Any => write!(f, "ANY"),
            CharMatcher::AnyExceptNewline => write!(f, "ANY_EXCEPT_NL"),
            CharMatcher::Char(c) => write!(f, "'{}'", c.escape_debug()),
            CharMatcher::CharNoCase(c) => write!(f, "'{}'/i", c.escape_debug()),
            CharMatcher::Set(set) => write!(f, "{}", set),
        }
    }
}
