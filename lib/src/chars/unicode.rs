/*! Tables for Unicode properties, Perl classes and POSIX classes.

Unicode data is not embedded in this crate. Tables are obtained from
`regex_syntax`, by parsing a small class expression (e.g: `\p{Greek}`) and
reading the ranges of the resulting [`ClassUnicode`].
*/

use regex_syntax::hir::{Class, ClassUnicode, HirKind};
use regex_syntax::ParserBuilder;

/// A closed range of characters.
pub(crate) type Range = (char, char);

/// Perl-style shorthand classes (`\d`, `\s`, `\w`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum PerlClass {
    Digit,
    Space,
    Word,
}

/// Returns the ranges of a class expression understood by `regex_syntax`,
/// or `None` if the expression is not a valid Unicode class.
fn class_ranges(expr: &str) -> Option<Vec<Range>> {
    let hir = ParserBuilder::new().unicode(true).build().parse(expr).ok()?;
    match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => Some(ranges_of(class)),
        HirKind::Literal(lit) => {
            // Classes with a single character are simplified into literals.
            let c = std::str::from_utf8(&lit.0).ok()?.chars().next()?;
            Some(vec![(c, c)])
        }
        _ => None,
    }
}

fn ranges_of(class: &ClassUnicode) -> Vec<Range> {
    class.ranges().iter().map(|r| (r.start(), r.end())).collect()
}

/// Returns the ranges for a Unicode property name, as written inside
/// `\p{...}`. Accepts general categories (`L`, `Lu`, `L&`), scripts
/// (`Greek`) and the special name `Any`.
pub(crate) fn property_ranges(name: &str) -> Option<Vec<Range>> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '&' | ' ' | '-' | '='));

    if !valid {
        return None;
    }

    match name {
        "Any" => return Some(vec![('\0', char::MAX)]),
        "L&" | "LC" => return class_ranges(r"[\p{Lu}\p{Ll}\p{Lt}]"),
        "Xan" => return class_ranges(r"[\p{L}\p{N}]"),
        "Xsp" | "Xps" => return class_ranges(r"\s"),
        "Xwd" => return class_ranges(r"\w"),
        _ => {}
    }

    if name.contains('&') {
        return None;
    }

    class_ranges(&format!(r"\p{{{}}}", name))
}

/// Returns the ranges for a Perl class. With `unicode` set to false only
/// ASCII characters belong to the class.
pub(crate) fn perl_ranges(class: PerlClass, unicode: bool) -> Vec<Range> {
    if unicode {
        let expr = match class {
            PerlClass::Digit => r"\d",
            PerlClass::Space => r"\s",
            PerlClass::Word => r"\w",
        };
        if let Some(ranges) = class_ranges(expr) {
            return ranges;
        }
    }
    match class {
        PerlClass::Digit => vec![('0', '9')],
        PerlClass::Space => vec![('\t', '\r'), (' ', ' ')],
        PerlClass::Word => vec![('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')],
    }
}

/// Returns the ranges for a POSIX class name, as written inside `[:...:]`.
///
/// In Unicode mode the classes are extended to their Unicode counterparts,
/// `[:alpha:]` becomes `\p{L}`, `[:digit:]` becomes `\p{Nd}` and so on.
pub(crate) fn posix_ranges(name: &str, unicode: bool) -> Option<Vec<Range>> {
    if unicode {
        let expr = match name {
            "alnum" => r"[\p{L}\p{N}]",
            "alpha" => r"\p{L}",
            "blank" => r"[\p{Zs}\t]",
            "cntrl" => r"\p{Cc}",
            "digit" => r"\p{Nd}",
            "graph" => r"[\p{L}\p{M}\p{N}\p{P}\p{S}]",
            "lower" => r"\p{Ll}",
            "print" => r"[\p{L}\p{M}\p{N}\p{P}\p{S}\p{Zs}]",
            "punct" => r"\p{P}",
            "space" => r"\s",
            "upper" => r"\p{Lu}",
            "word" => r"\w",
            _ => "",
        };
        if !expr.is_empty() {
            return class_ranges(expr);
        }
    }
    let ranges = match name {
        "alnum" => vec![('0', '9'), ('A', 'Z'), ('a', 'z')],
        "alpha" => vec![('A', 'Z'), ('a', 'z')],
        "ascii" => vec![('\0', '\x7f')],
        "blank" => vec!['\t', ' '].into_iter().map(|c| (c, c)).collect(),
        "cntrl" => vec![('\0', '\x1f'), ('\x7f', '\x7f')],
        "digit" => vec![('0', '9')],
        "graph" => vec![('!', '~')],
        "lower" => vec![('a', 'z')],
        "print" => vec![(' ', '~')],
        "punct" => vec![('!', '/'), (':', '@'), ('[', '`'), ('{', '~')],
        "space" => vec![('\t', '\r'), (' ', ' ')],
        "upper" => vec![('A', 'Z')],
        "word" => vec![('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')],
        "xdigit" => vec![('0', '9'), ('A', 'F'), ('a', 'f')],
        _ => return None,
    };
    Some(ranges)
}

/// Returns true if `c` is a word character for the purpose of `\b` and
/// `\B`.
#[inline]
pub(crate) fn is_word_char(c: char, unicode: bool) -> bool {
    if unicode {
        regex_syntax::try_is_word_character(c).unwrap_or(false)
    } else {
        c.is_ascii_alphanumeric() || c == '_'
    }
}
