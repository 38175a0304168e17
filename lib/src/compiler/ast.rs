/*! Parsed representation of a pattern.

The parser produces an [`Ast`], which the compiler later lowers into the node
arena of a [`crate::program::Program`]. Some properties are easier to compute
on the tree than on the compiled graph: the width of sub-expressions (needed
for validating lookbehinds) and the optimization hints used by the match
driver.
*/

use bitvec::array::BitArray;

use crate::chars::CharMatcher;
use crate::program::{Assertion, RepeatMode};

/// Reference to a capture group, by number or by name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum GroupRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Ast {
    /// Matches the empty string.
    Empty,
    /// Matches a single character.
    Char(CharMatcher),
    /// Zero-width assertion (anchors and word boundaries).
    Assert(Assertion),
    /// Capture group.
    Group { index: usize, body: Box<Ast> },
    Concat(Vec<Ast>),
    Alternation(Vec<Ast>),
    Repeat { body: Box<Ast>, min: u32, max: Option<u32>, mode: RepeatMode },
    /// Lookahead (`ahead == true`) or lookbehind.
    LookAround { body: Box<Ast>, ahead: bool, negated: bool, offset: usize },
    /// Atomic group `(?>...)`.
    Atomic(Box<Ast>),
    BackRef { target: GroupRef, case_insensitive: bool, offset: usize },
    Conditional {
        target: GroupRef,
        yes: Box<Ast>,
        no: Option<Box<Ast>>,
        offset: usize,
    },
}

/// ASCII bitmap with one bit per character in the range 0-127.
pub(crate) type AsciiSet = BitArray<[u64; 2]>;

/// Hints computed at compile time that allow the match driver to skip
/// positions where a match can't start.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct Hints {
    /// Minimum number of characters consumed by any match.
    pub min_length: usize,
    /// Character that starts every match, if any.
    pub first_char: Option<char>,
    /// ASCII characters that can start a match. Non-ASCII characters are
    /// never rejected using this set. `None` when the set can't be computed
    /// or when the pattern can match an empty string.
    pub first_set: Option<AsciiSet>,
    /// Case-sensitive literal that starts every match.
    pub prefix: Vec<char>,
    /// Every match starts at offset 0 of the subject.
    pub anchored_start: bool,
}

// Result of first-set analysis for a sub-expression: the ASCII characters
// that can be consumed first, and whether the expression can match without
// consuming anything.
struct First {
    set: AsciiSet,
    nullable: bool,
}

impl Ast {
    /// Returns the minimum and maximum number of characters that this
    /// expression can match. The maximum is `None` when unbounded or not
    /// statically known (e.g: back-references).
    pub fn width(&self) -> (usize, Option<usize>) {
        match self {
            Ast::Empty | Ast::Assert(_) | Ast::LookAround { .. } => (0, Some(0)),
            Ast::Char(_) => (1, Some(1)),
            Ast::Group { body, .. } | Ast::Atomic(body) => body.width(),
            Ast::Concat(items) => {
                items.iter().fold((0, Some(0)), |(min, max), item| {
                    let (item_min, item_max) = item.width();
                    (
                        min.saturating_add(item_min),
                        max.zip(item_max).map(|(a, b)| a.saturating_add(b)),
                    )
                })
            }
            Ast::Alternation(alternatives) => {
                Self::width_of_alternatives(alternatives.iter())
            }
            Ast::Repeat { body, min, max, .. } => {
                let (body_min, body_max) = body.width();
                (
                    body_min.saturating_mul(*min as usize),
                    match (body_max, max) {
                        (Some(0), _) => Some(0),
                        (Some(b), Some(m)) => Some(b.saturating_mul(*m as usize)),
                        _ => None,
                    },
                )
            }
            Ast::BackRef { .. } => (0, None),
            Ast::Conditional { yes, no, .. } => {
                let empty = Ast::Empty;
                let no = no.as_deref().unwrap_or(&empty);
                Self::width_of_alternatives([yes.as_ref(), no].into_iter())
            }
        }
    }

    fn width_of_alternatives<'a, I>(alternatives: I) -> (usize, Option<usize>)
    where
        I: Iterator<Item = &'a Ast>,
    {
        let mut result: Option<(usize, Option<usize>)> = None;
        for alt in alternatives {
            let (alt_min, alt_max) = alt.width();
            result = Some(match result {
                None => (alt_min, alt_max),
                Some((min, max)) => (
                    min.min(alt_min),
                    max.zip(alt_max).map(|(a, b)| a.max(b)),
                ),
            });
        }
        result.unwrap_or((0, Some(0)))
    }

    /// Returns the fixed width of this expression, or `None` if different
    /// matches can have different lengths.
    pub fn fixed_width(&self) -> Option<usize> {
        match self.width() {
            (min, Some(max)) if min == max => Some(min),
            _ => None,
        }
    }

    /// Computes the optimization hints for a whole pattern.
    pub fn hints(&self) -> Hints {
        let mut prefix = Vec::new();
        self.literal_prefix(&mut prefix);

        Hints {
            min_length: self.width().0,
            first_char: self.first_char(),
            first_set: self.first().and_then(|first| {
                if first.nullable {
                    None
                } else {
                    Some(first.set)
                }
            }),
            prefix,
            anchored_start: self.starts_at_input_start(),
        }
    }

    fn first(&self) -> Option<First> {
        match self {
            Ast::Empty | Ast::Assert(_) => {
                Some(First { set: AsciiSet::ZERO, nullable: true })
            }
            Ast::Char(matcher) => {
                let mut set = AsciiSet::ZERO;
                for c in 0..128_u8 {
                    if matcher.matches(char::from(c)) {
                        set.set(c as usize, true);
                    }
                }
                Some(First { set, nullable: false })
            }
            Ast::Group { body, .. } | Ast::Atomic(body) => body.first(),
            Ast::Concat(items) => {
                let mut set = AsciiSet::ZERO;
                for item in items {
                    let first = item.first()?;
                    union(&mut set, &first.set);
                    if !first.nullable {
                        return Some(First { set, nullable: false });
                    }
                }
                Some(First { set, nullable: true })
            }
            Ast::Alternation(alternatives) => {
                let mut set = AsciiSet::ZERO;
                let mut nullable = false;
                for alt in alternatives {
                    let first = alt.first()?;
                    union(&mut set, &first.set);
                    nullable |= first.nullable;
                }
                Some(First { set, nullable })
            }
            Ast::Repeat { body, min, max, .. } => {
                if *max == Some(0) {
                    return Some(First { set: AsciiSet::ZERO, nullable: true });
                }
                let first = body.first()?;
                Some(First { set: first.set, nullable: first.nullable || *min == 0 })
            }
            Ast::LookAround { .. }
            | Ast::BackRef { .. }
            | Ast::Conditional { .. } => None,
        }
    }

    fn first_char(&self) -> Option<char> {
        match self {
            Ast::Char(CharMatcher::Char(c)) => Some(*c),
            Ast::Group { body, .. } | Ast::Atomic(body) => body.first_char(),
            Ast::Repeat { body, min, .. } if *min > 0 => body.first_char(),
            Ast::Concat(items) => {
                let item = items.iter().find(|item| !matches!(item, Ast::Assert(_)))?;
                if item.width().0 == 0 {
                    return None;
                }
                item.first_char()
            }
            Ast::Alternation(alternatives) => {
                let (first, rest) = alternatives.split_first()?;
                let c = first.first_char()?;
                rest.iter().all(|alt| alt.first_char() == Some(c)).then_some(c)
            }
            _ => None,
        }
    }

    // Appends to `out` the literal characters every match of this expression
    // starts with. Returns true if the whole expression is a literal, which
    // means that whatever follows it can extend the prefix.
    fn literal_prefix(&self, out: &mut Vec<char>) -> bool {
        match self {
            Ast::Empty | Ast::Assert(_) => true,
            Ast::Char(CharMatcher::Char(c)) => {
                out.push(*c);
                true
            }
            Ast::Group { body, .. } | Ast::Atomic(body) => body.literal_prefix(out),
            Ast::Concat(items) => items.iter().all(|item| item.literal_prefix(out)),
            Ast::Repeat { body, min, .. } if *min > 0 => {
                body.literal_prefix(out);
                false
            }
            _ => false,
        }
    }

    fn starts_at_input_start(&self) -> bool {
        match self {
            Ast::Assert(Assertion::StartOfInput) => true,
            Ast::Group { body, .. } | Ast::Atomic(body) => body.starts_at_input_start(),
            Ast::Concat(items) => {
                items.first().is_some_and(|item| item.starts_at_input_start())
            }
            Ast::Alternation(alternatives) => {
                alternatives.iter().all(|alt| alt.starts_at_input_start())
            }
            _ => false,
        }
    }
}

fn union(set: &mut AsciiSet, other: &AsciiSet) {
    for i in other.iter_ones() {
        set.set(i, true);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::compiler::parser::Parser;
    use crate::Flags;

    fn hints(pattern: &str) -> super::Hints {
        Parser::new().parse(pattern, Flags::default()).unwrap().ast.hints()
    }

    fn width(pattern: &str) -> (usize, Option<usize>) {
        Parser::new().parse(pattern, Flags::default()).unwrap().ast.width()
    }

    #[test]
    fn widths() {
        assert_eq!(width("abc"), (3, Some(3)));
        assert_eq!(width("a|bc"), (1, Some(2)));
        assert_eq!(width("a{2,5}"), (2, Some(5)));
        assert_eq!(width("(ab)+"), (2, None));
        assert_eq!(width(r"(a)\1"), (1, None));
        assert_eq!(width(r"\b(?=x)^$"), (0, Some(0)));
        assert_eq!(width("(?:){1000}"), (0, Some(0)));
        assert_eq!(width("(a)(?(1)bc|d)"), (2, Some(3)));
    }

    #[test]
    fn first_set() {
        let set = hints("[a-c]x|d").first_set.unwrap();
        let members: String =
            (0..128_u8).filter(|c| set[*c as usize]).map(char::from).collect();
        assert_eq!(members, "abcd");

        let set = hints("a?b*c").first_set.unwrap();
        let members: String =
            (0..128_u8).filter(|c| set[*c as usize]).map(char::from).collect();
        assert_eq!(members, "abc");

        let set = hints("(?i)k").first_set.unwrap();
        assert!(set['k' as usize] && set['K' as usize]);

        assert_eq!(hints("a*").first_set, None);
        assert_eq!(hints("(?=a)a").first_set, None);
        assert!(hints(r"(a)\1").first_set.is_some());
        assert_eq!(hints(r"\1?(a)").first_set, None);
    }

    #[test]
    fn first_char_and_prefix() {
        assert_eq!(hints("abc|abd").first_char, Some('a'));
        assert_eq!(hints("^(foo)+bar").first_char, Some('f'));
        assert_eq!(hints("a?b").first_char, None);
        assert_eq!(hints("(?i)abc").first_char, None);

        assert_eq!(hints("^foo(bar)baz").prefix, "foobarbaz".chars().collect::<Vec<_>>());
        assert_eq!(hints("ab+c").prefix, vec!['a', 'b']);
        assert_eq!(hints("a|b").prefix, Vec::<char>::new());
    }

    #[test]
    fn min_length_and_anchoring() {
        assert_eq!(hints(r"^(\d{3})-(\d{4})$").min_length, 8);
        assert!(hints("^a|^b").anchored_start);
        assert!(!hints("^a|b").anchored_start);
        assert!(!hints("(?m)^a").anchored_start);
    }
}
