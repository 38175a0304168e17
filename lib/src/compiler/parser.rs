/*! Parser that turns the text of a pattern into an [`Ast`].

The accepted syntax is the one of PCRE as used by PHP's `preg_*` functions:
groups of all kinds, lookaround, conditionals, back-references by number or
name, possessive and lazy quantifiers, POSIX classes, Unicode properties and
inline option settings.

Offsets reported in errors are character positions within the pattern.
*/

use rustc_hash::FxHashMap;

use crate::chars::unicode::{perl_ranges, posix_ranges, property_ranges, PerlClass};
use crate::chars::{CharMatcher, CharSet, Range};
use crate::compiler::ast::{Ast, GroupRef};
use crate::errors::CompileError;
use crate::program::{Assertion, RepeatMode};
use crate::Flags;

/// Maximum value accepted in a `{n,m}` quantifier.
pub(crate) const MAX_REPEAT: u32 = 65535;

/// Default maximum nesting of parenthesized groups.
pub(crate) const DEFAULT_NESTING_LIMIT: usize = 250;

// Maximum length of a group name.
const MAX_NAME_LEN: usize = 32;

// Characters matched by \h.
const HORIZONTAL_SPACE: &[Range] = &[
    ('\t', '\t'),
    (' ', ' '),
    ('\u{a0}', '\u{a0}'),
    ('\u{1680}', '\u{1680}'),
    ('\u{180e}', '\u{180e}'),
    ('\u{2000}', '\u{200a}'),
    ('\u{202f}', '\u{202f}'),
    ('\u{205f}', '\u{205f}'),
    ('\u{3000}', '\u{3000}'),
];

// Characters matched by \v.
const VERTICAL_SPACE: &[Range] = &[
    ('\n', '\r'),
    ('\u{85}', '\u{85}'),
    ('\u{2028}', '\u{2029}'),
];

/// Result of parsing a pattern.
#[derive(Debug)]
pub(crate) struct ParsedPattern {
    pub ast: Ast,
    /// Number of capture groups, not including group 0.
    pub group_count: usize,
    /// Name of each group, indexed by group number. The first entry
    /// corresponds to group 0 and is always `None`.
    pub names: Vec<Option<String>>,
    /// Maps group names to group numbers.
    pub name_index: FxHashMap<String, usize>,
}

/// Pattern parser.
pub(crate) struct Parser {
    nesting_limit: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self { nesting_limit: DEFAULT_NESTING_LIMIT }
    }

    /// Maximum nesting level of groups. Deeper patterns produce
    /// [`CompileError::NestingTooDeep`].
    #[cfg(test)]
    pub fn nesting_limit(mut self, limit: usize) -> Self {
        self.nesting_limit = limit;
        self
    }

    pub fn parse(
        &self,
        pattern: &str,
        flags: Flags,
    ) -> Result<ParsedPattern, CompileError> {
        let mut state = ParserState {
            chars: pattern.chars().collect(),
            pos: 0,
            flags,
            depth: 0,
            nesting_limit: self.nesting_limit,
            group_count: 0,
            names: vec![None],
            name_index: FxHashMap::default(),
        };

        let ast = state.parse_alternation()?;

        // The only reason for the top-level alternation to stop before the
        // end of the pattern is a closing parenthesis without its opening
        // counterpart.
        if state.pos < state.chars.len() {
            return Err(CompileError::UnmatchedParenthesis { offset: state.pos });
        }

        Ok(ParsedPattern {
            ast,
            group_count: state.group_count,
            names: state.names,
            name_index: state.name_index,
        })
    }
}

// An item inside a bracketed class.
enum ClassItem {
    Char(char),
    Ranges(Vec<Range>),
    Quoted(Vec<char>),
    Nothing,
}

struct ParserState {
    chars: Vec<char>,
    pos: usize,
    flags: Flags,
    depth: usize,
    nesting_limit: usize,
    group_count: usize,
    names: Vec<Option<String>>,
    name_index: FxHashMap<String, usize>,
}

impl ParserState {
    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn looking_at(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// In extended mode, skips whitespace and comments.
    fn skip_trivia(&mut self) {
        if !self.flags.extended {
            return;
        }
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c') {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn literal(&self, c: char) -> Ast {
        Ast::Char(CharMatcher::literal(c, self.flags.case_insensitive))
    }

    fn parse_alternation(&mut self) -> Result<Ast, CompileError> {
        let mut branches = self.parse_branches()?;
        Ok(match branches.len() {
            1 => branches.swap_remove(0),
            _ => Ast::Alternation(branches),
        })
    }

    fn parse_branches(&mut self) -> Result<Vec<Ast>, CompileError> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        Ok(branches)
    }

    fn parse_concat(&mut self) -> Result<Ast, CompileError> {
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            let start = self.pos;

            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some('*') | Some('+') | Some('?') => {
                    return Err(CompileError::NothingToRepeat { offset: start })
                }
                Some('{') if self.scan_bounds().is_some() => {
                    return Err(CompileError::NothingToRepeat { offset: start })
                }
                _ => {}
            }

            // Quoted text is a sequence of literals, a quantifier that
            // follows it applies only to the last character.
            if self.looking_at("\\Q") {
                self.pos += 2;
                let mut chars = self.parse_quoted();
                if let Some(last) = chars.pop() {
                    items.extend(chars.into_iter().map(|c| self.literal(c)));
                    let last = self.literal(last);
                    items.push(self.parse_quantifier(last, start)?);
                }
                continue;
            }

            if let Some(atom) = self.parse_atom()? {
                items.push(self.parse_quantifier(atom, start)?);
            }
        }

        Ok(match items.len() {
            0 => Ast::Empty,
            1 => items.swap_remove(0),
            _ => Ast::Concat(items),
        })
    }

    // Reads characters up to the next `\E` or the end of the pattern.
    fn parse_quoted(&mut self) -> Vec<char> {
        let mut chars = Vec::new();
        while self.pos < self.chars.len() {
            if self.looking_at("\\E") {
                self.pos += 2;
                break;
            }
            chars.push(self.chars[self.pos]);
            self.pos += 1;
        }
        chars
    }

    // Parses the digits at `pos`, returning their value (saturated) and the
    // number of digits.
    fn scan_number(&self, mut pos: usize) -> (u64, usize) {
        let start = pos;
        let mut value: u64 = 0;
        while let Some(d) = self.chars.get(pos).and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(d as u64);
            pos += 1;
        }
        (value, pos - start)
    }

    // Checks if the text at the current position is a `{n}`, `{n,}` or
    // `{n,m}` quantifier. Returns the bounds and the quantifier's length.
    fn scan_bounds(&self) -> Option<(u64, Option<u64>, usize)> {
        if self.peek() != Some('{') {
            return None;
        }
        let mut i = self.pos + 1;
        let (min, n) = self.scan_number(i);
        if n == 0 {
            return None;
        }
        i += n;
        let max = match self.chars.get(i) {
            Some('}') => Some(min),
            Some(',') => {
                i += 1;
                let (max, n) = self.scan_number(i);
                i += n;
                if self.chars.get(i) != Some(&'}') {
                    return None;
                }
                if n == 0 {
                    None
                } else {
                    Some(max)
                }
            }
            _ => return None,
        };
        Some((min, max, i + 1 - self.pos))
    }

    fn parse_quantifier(
        &mut self,
        atom: Ast,
        atom_start: usize,
    ) -> Result<Ast, CompileError> {
        self.skip_trivia();
        let start = self.pos;

        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, None)
            }
            Some('+') => {
                self.pos += 1;
                (1, None)
            }
            Some('?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some('{') => match self.scan_bounds() {
                Some((min, max, len)) => {
                    let too_large = min > MAX_REPEAT as u64
                        || max.is_some_and(|max| max > MAX_REPEAT as u64);
                    if too_large {
                        return Err(CompileError::RepetitionTooLarge {
                            offset: start,
                            max: MAX_REPEAT,
                        });
                    }
                    if max.is_some_and(|max| max < min) {
                        return Err(CompileError::InvalidRepetition {
                            offset: start,
                        });
                    }
                    self.pos += len;
                    (min as u32, max.map(|max| max as u32))
                }
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };

        // Anchors and other assertions written directly can't be repeated,
        // but a group containing them can.
        if matches!(atom, Ast::Assert(_)) && self.chars[atom_start] != '(' {
            return Err(CompileError::NothingToRepeat { offset: start });
        }

        let mode = if self.eat('+') {
            RepeatMode::Possessive
        } else if self.eat('?') != self.flags.ungreedy {
            RepeatMode::Lazy
        } else {
            RepeatMode::Greedy
        };

        Ok(Ast::Repeat { body: Box::new(atom), min, max, mode })
    }

    fn parse_atom(&mut self) -> Result<Option<Ast>, CompileError> {
        let start = self.pos;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let ast = match c {
            '(' => return self.parse_group(start),
            '[' => self.parse_class(start)?,
            '\\' => return self.parse_escape(start),
            '.' => Ast::Char(if self.flags.dot_all {
                CharMatcher::Any
            } else {
                CharMatcher::AnyExceptNewline
            }),
            '^' => Ast::Assert(if self.flags.multiline {
                Assertion::StartOfLine
            } else {
                Assertion::StartOfInput
            }),
            '$' => Ast::Assert(if self.flags.multiline {
                Assertion::EndOfLine
            } else if self.flags.dollar_end_only {
                Assertion::EndOfInput
            } else {
                Assertion::EndOfInputOrNewline
            }),
            c => self.literal(c),
        };

        Ok(Some(ast))
    }

    fn new_group(
        &mut self,
        name: Option<String>,
        offset: usize,
    ) -> Result<usize, CompileError> {
        self.group_count += 1;
        if let Some(name) = &name {
            if self.name_index.contains_key(name) {
                return Err(CompileError::DuplicateGroupName {
                    offset,
                    name: name.clone(),
                });
            }
            self.name_index.insert(name.clone(), self.group_count);
        }
        self.names.push(name);
        Ok(self.group_count)
    }

    // Parses a group name followed by `terminator`.
    fn parse_group_name(
        &mut self,
        terminator: char,
    ) -> Result<String, CompileError> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if !valid || !self.eat(terminator) {
            return Err(CompileError::InvalidGroupName { offset: start });
        }
        Ok(name)
    }

    // Parses the branches of a group up to its closing parenthesis. Options
    // set inside the group don't survive after it.
    fn parse_group_branches(
        &mut self,
        start: usize,
    ) -> Result<Vec<Ast>, CompileError> {
        self.depth += 1;
        if self.depth > self.nesting_limit {
            return Err(CompileError::NestingTooDeep {
                offset: start,
                limit: self.nesting_limit,
            });
        }

        let saved_flags = self.flags;
        let branches = self.parse_branches();
        self.flags = saved_flags;
        self.depth -= 1;

        let branches = branches?;
        if !self.eat(')') {
            return Err(CompileError::UnterminatedGroup { offset: start });
        }
        Ok(branches)
    }

    fn parse_group_body(&mut self, start: usize) -> Result<Box<Ast>, CompileError> {
        let mut branches = self.parse_group_branches(start)?;
        Ok(Box::new(match branches.len() {
            1 => branches.swap_remove(0),
            _ => Ast::Alternation(branches),
        }))
    }

    fn parse_group(&mut self, start: usize) -> Result<Option<Ast>, CompileError> {
        if !self.eat('?') {
            let index = self.new_group(None, start)?;
            let body = self.parse_group_body(start)?;
            return Ok(Some(Ast::Group { index, body }));
        }

        let kind_offset = self.pos;

        let ast = match self.bump() {
            Some('#') => loop {
                match self.bump() {
                    Some(')') => return Ok(None),
                    None => {
                        return Err(CompileError::UnterminatedGroup {
                            offset: start,
                        })
                    }
                    _ => {}
                }
            },
            Some(':') => *self.parse_group_body(start)?,
            Some('>') => Ast::Atomic(self.parse_group_body(start)?),
            Some(c @ ('=' | '!')) => Ast::LookAround {
                body: self.parse_group_body(start)?,
                ahead: true,
                negated: c == '!',
                offset: start,
            },
            Some('<') if matches!(self.peek(), Some('=' | '!')) => {
                let negated = self.bump() == Some('!');
                Ast::LookAround {
                    body: self.parse_group_body(start)?,
                    ahead: false,
                    negated,
                    offset: start,
                }
            }
            Some('<') => self.parse_named_group('>', start)?,
            Some('\'') => self.parse_named_group('\'', start)?,
            Some('P') => match self.bump() {
                Some('<') => self.parse_named_group('>', start)?,
                Some('=') => Ast::BackRef {
                    target: GroupRef::Name(self.parse_group_name(')')?),
                    case_insensitive: self.flags.case_insensitive,
                    offset: start,
                },
                _ => {
                    return Err(CompileError::UnknownGroupType {
                        offset: kind_offset,
                    })
                }
            },
            Some('(') => self.parse_conditional(start)?,
            Some('-' | 'i' | 'm' | 's' | 'x' | 'U') => {
                self.pos -= 1;
                return self.parse_option_setting(start);
            }
            _ => {
                return Err(CompileError::UnknownGroupType { offset: kind_offset })
            }
        };

        Ok(Some(ast))
    }

    fn parse_named_group(
        &mut self,
        terminator: char,
        start: usize,
    ) -> Result<Ast, CompileError> {
        let name_offset = self.pos;
        let name = self.parse_group_name(terminator)?;
        let index = self.new_group(Some(name), name_offset)?;
        let body = self.parse_group_body(start)?;
        Ok(Ast::Group { index, body })
    }

    // Parses `(?imsxU-imsxU)` and `(?imsxU-imsxU:...)`. The current position
    // is right after `(?`.
    fn parse_option_setting(
        &mut self,
        start: usize,
    ) -> Result<Option<Ast>, CompileError> {
        let mut flags = self.flags;
        let mut on = true;
        loop {
            let offset = self.pos;
            match self.bump() {
                Some('-') if on => on = false,
                Some('i') => flags.case_insensitive = on,
                Some('m') => flags.multiline = on,
                Some('s') => flags.dot_all = on,
                Some('x') => flags.extended = on,
                Some('U') => flags.ungreedy = on,
                Some(')') => {
                    self.flags = flags;
                    return Ok(None);
                }
                Some(':') => {
                    let saved_flags = self.flags;
                    self.flags = flags;
                    let body = self.parse_group_body(start);
                    self.flags = saved_flags;
                    return Ok(Some(*body?));
                }
                None => {
                    return Err(CompileError::UnterminatedGroup { offset: start })
                }
                _ => return Err(CompileError::UnknownGroupType { offset }),
            }
        }
    }

    // Parses a conditional group. The current position is right after
    // `(?(`.
    fn parse_conditional(&mut self, start: usize) -> Result<Ast, CompileError> {
        let offset = self.pos;

        let target = match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                let (group, len) = self.scan_number(self.pos);
                self.pos += len;
                if group == 0 || !self.eat(')') {
                    return Err(CompileError::InvalidCondition { offset });
                }
                GroupRef::Index(group as usize)
            }
            Some('<') => {
                self.pos += 1;
                let name = self.parse_group_name('>')?;
                if !self.eat(')') {
                    return Err(CompileError::InvalidCondition { offset });
                }
                GroupRef::Name(name)
            }
            Some('\'') => {
                self.pos += 1;
                let name = self.parse_group_name('\'')?;
                if !self.eat(')') {
                    return Err(CompileError::InvalidCondition { offset });
                }
                GroupRef::Name(name)
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                GroupRef::Name(self.parse_group_name(')')?)
            }
            _ => return Err(CompileError::InvalidCondition { offset }),
        };

        let mut branches = self.parse_group_branches(start)?.into_iter();
        if branches.len() > 2 {
            return Err(CompileError::TooManyBranches { offset: start });
        }

        let yes = branches.next().unwrap_or(Ast::Empty);
        let no = branches.next().map(Box::new);

        Ok(Ast::Conditional { target, yes: Box::new(yes), no, offset })
    }

    fn perl_class(&self, c: char) -> (Vec<Range>, bool) {
        let unicode = self.flags.unicode;
        match c {
            'd' | 'D' => (perl_ranges(PerlClass::Digit, unicode), c == 'D'),
            's' | 'S' => (perl_ranges(PerlClass::Space, unicode), c == 'S'),
            'w' | 'W' => (perl_ranges(PerlClass::Word, unicode), c == 'W'),
            'h' | 'H' => (HORIZONTAL_SPACE.to_vec(), c == 'H'),
            _ => (VERTICAL_SPACE.to_vec(), c == 'V'),
        }
    }

    // Parses the property name after `\p` or `\P`. Returns its ranges and
    // whether the property is negated.
    fn parse_property(
        &mut self,
        letter: char,
        start: usize,
    ) -> Result<(Vec<Range>, bool), CompileError> {
        let mut negated = letter == 'P';
        let name: String = if self.eat('{') {
            if self.eat('^') {
                negated = !negated;
            }
            let mut name = String::new();
            loop {
                match self.bump() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => {
                        return Err(CompileError::UnknownProperty {
                            offset: start,
                            name,
                        })
                    }
                }
            }
            name
        } else {
            self.bump().map(String::from).unwrap_or_default()
        };

        match property_ranges(&name) {
            Some(ranges) => Ok((ranges, negated)),
            None => Err(CompileError::UnknownProperty { offset: start, name }),
        }
    }

    // Decodes escapes that stand for a single character, which are valid
    // both inside and outside classes. `c` is the character after the
    // backslash, which was already consumed.
    fn parse_char_escape(
        &mut self,
        c: char,
        start: usize,
    ) -> Result<char, CompileError> {
        Ok(match c {
            'a' => '\x07',
            'e' => '\x1b',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => {
                // \0 followed by up to two more octal digits.
                let mut value = 0;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                char::from_u32(value).unwrap_or('\0')
            }
            'o' => {
                if !self.eat('{') {
                    return Err(CompileError::UnknownEscape { offset: start, escape: 'o' });
                }
                self.parse_braced_number(8, start)?
            }
            'x' => {
                if self.eat('{') {
                    self.parse_braced_number(16, start)?
                } else {
                    // Up to two hex digits, \x alone is NUL.
                    let mut value = 0;
                    for _ in 0..2 {
                        match self.peek().and_then(|c| c.to_digit(16)) {
                            Some(d) => {
                                value = value * 16 + d;
                                self.pos += 1;
                            }
                            None => break,
                        }
                    }
                    char::from_u32(value).unwrap_or('\0')
                }
            }
            'c' => match self.bump() {
                Some(x) if x.is_ascii() && !x.is_ascii_control() => {
                    char::from(x.to_ascii_uppercase() as u8 ^ 0x40)
                }
                _ => {
                    return Err(CompileError::InvalidControlEscape { offset: start })
                }
            },
            c if c.is_ascii_alphanumeric() => {
                return Err(CompileError::UnknownEscape { offset: start, escape: c })
            }
            c => c,
        })
    }

    // Parses the digits and closing brace of `\x{...}` or `\o{...}`.
    fn parse_braced_number(
        &mut self,
        radix: u32,
        start: usize,
    ) -> Result<char, CompileError> {
        let mut value: u32 = 0;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(radix)) {
            value = value.saturating_mul(radix).saturating_add(d);
            digits += 1;
            self.pos += 1;
        }
        if digits == 0 || !self.eat('}') {
            return Err(CompileError::InvalidHexEscape { offset: start });
        }
        char::from_u32(value).ok_or(CompileError::InvalidHexEscape { offset: start })
    }

    // Parses up to three octal digits.
    fn parse_octal(&mut self) -> char {
        let mut value = 0;
        for _ in 0..3 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    value = value * 8 + d;
                    self.pos += 1;
                }
                None => break,
            }
        }
        char::from_u32(value).unwrap_or('\0')
    }

    fn parse_escape(&mut self, start: usize) -> Result<Option<Ast>, CompileError> {
        let c = self
            .bump()
            .ok_or(CompileError::TrailingBackslash { offset: start })?;

        let unicode = self.flags.unicode;

        let ast = match c {
            'd' | 'D' | 's' | 'S' | 'w' | 'W' | 'h' | 'H' | 'v' | 'V' => {
                let (ranges, negated) = self.perl_class(c);
                Ast::Char(CharMatcher::Set(Box::new(CharSet::from_ranges(
                    ranges, negated, false,
                ))))
            }
            'N' => Ast::Char(CharMatcher::AnyExceptNewline),
            'p' | 'P' => {
                let (ranges, negated) = self.parse_property(c, start)?;
                Ast::Char(CharMatcher::Set(Box::new(CharSet::from_ranges(
                    ranges, negated, false,
                ))))
            }
            'R' => {
                // (?>\r\n|\n|\x0b|\f|\r|\x85|\x{2028}|\x{2029})
                Ast::Atomic(Box::new(Ast::Alternation(vec![
                    Ast::Concat(vec![
                        Ast::Char(CharMatcher::Char('\r')),
                        Ast::Char(CharMatcher::Char('\n')),
                    ]),
                    Ast::Char(CharMatcher::Set(Box::new(CharSet::from_ranges(
                        VERTICAL_SPACE.iter().copied(),
                        false,
                        false,
                    )))),
                ])))
            }
            'b' => Ast::Assert(Assertion::WordBoundary { unicode }),
            'B' => Ast::Assert(Assertion::NotWordBoundary { unicode }),
            'A' => Ast::Assert(Assertion::SearchOrigin),
            'Z' => Ast::Assert(Assertion::EndOfInputOrNewline),
            'z' => Ast::Assert(Assertion::EndOfInput),
            'G' => Ast::Assert(Assertion::PreviousMatchEnd),
            'E' => return Ok(None),
            'Q' => {
                let chars = self.parse_quoted();
                Ast::Concat(chars.into_iter().map(|c| self.literal(c)).collect())
            }
            'k' => {
                let terminator = match self.bump() {
                    Some('<') => '>',
                    Some('\'') => '\'',
                    Some('{') => '}',
                    _ => {
                        return Err(CompileError::InvalidGroupName {
                            offset: start,
                        })
                    }
                };
                let name = self.parse_group_name(terminator)?;
                self.backref(GroupRef::Name(name), start)
            }
            'g' => self.parse_g_reference(start)?,
            '1'..='9' => {
                let digits_start = self.pos - 1;
                let (group, _) = self.scan_number(digits_start);
                let group = group as usize;
                if group < 10 || group <= self.group_count {
                    let (_, len) = self.scan_number(digits_start);
                    self.pos = digits_start + len;
                    self.backref(GroupRef::Index(group), start)
                } else if c == '8' || c == '9' {
                    self.literal(c)
                } else {
                    self.pos = digits_start;
                    let c = self.parse_octal();
                    self.literal(c)
                }
            }
            c => {
                let c = self.parse_char_escape(c, start)?;
                self.literal(c)
            }
        };

        Ok(Some(ast))
    }

    fn backref(&self, target: GroupRef, offset: usize) -> Ast {
        Ast::BackRef {
            target,
            case_insensitive: self.flags.case_insensitive,
            offset,
        }
    }

    // Parses the reference after `\g`: `\g{n}`, `\g{-n}`, `\g{name}`, `\gn`
    // or `\g-n`.
    fn parse_g_reference(&mut self, start: usize) -> Result<Ast, CompileError> {
        let braced = self.eat('{');

        if braced
            && self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            let name = self.parse_group_name('}')?;
            return Ok(self.backref(GroupRef::Name(name), start));
        }

        let relative = self.eat('-');
        let (n, len) = self.scan_number(self.pos);
        if len == 0 {
            return Err(CompileError::InvalidGroupName { offset: start });
        }
        self.pos += len;
        if braced && !self.eat('}') {
            return Err(CompileError::InvalidGroupName { offset: start });
        }

        let n = n as usize;
        let group = if relative {
            if n == 0 || n > self.group_count {
                return Err(CompileError::InvalidBackReference {
                    offset: start,
                    group: 0,
                });
            }
            self.group_count - n + 1
        } else {
            n
        };

        if group == 0 {
            return Err(CompileError::InvalidBackReference { offset: start, group });
        }

        Ok(self.backref(GroupRef::Index(group), start))
    }

    // Checks if the text at `at` is a POSIX class like `:alpha:]` or
    // `:^alpha:]`. Returns the name, whether it is negated and the position
    // right after the closing bracket.
    fn scan_posix(&self, at: usize) -> Option<(String, bool, usize)> {
        if self.chars.get(at) != Some(&':') {
            return None;
        }
        let mut i = at + 1;
        let negated = self.chars.get(i) == Some(&'^');
        if negated {
            i += 1;
        }
        let mut name = String::new();
        while let Some(c) = self.chars.get(i).filter(|c| c.is_ascii_alphabetic()) {
            name.push(*c);
            i += 1;
        }
        if self.chars.get(i) == Some(&':') && self.chars.get(i + 1) == Some(&']') {
            Some((name, negated, i + 2))
        } else {
            None
        }
    }

    fn parse_class_escape(&mut self, start: usize) -> Result<ClassItem, CompileError> {
        let c = self
            .bump()
            .ok_or(CompileError::TrailingBackslash { offset: start })?;

        Ok(match c {
            'd' | 'D' | 's' | 'S' | 'w' | 'W' | 'h' | 'H' | 'v' | 'V' => {
                let (ranges, negated) = self.perl_class(c);
                ClassItem::Ranges(if negated { complement(ranges) } else { ranges })
            }
            'p' | 'P' => {
                let (ranges, negated) = self.parse_property(c, start)?;
                ClassItem::Ranges(if negated { complement(ranges) } else { ranges })
            }
            'b' => ClassItem::Char('\x08'),
            'E' => ClassItem::Nothing,
            'Q' => ClassItem::Quoted(self.parse_quoted()),
            '1'..='7' => {
                self.pos -= 1;
                ClassItem::Char(self.parse_octal())
            }
            '8' | '9' => ClassItem::Char(c),
            c => ClassItem::Char(self.parse_char_escape(c, start)?),
        })
    }

    // Parses a bracketed class. The current position is right after `[`.
    fn parse_class(&mut self, start: usize) -> Result<Ast, CompileError> {
        if self.scan_posix(self.pos).is_some() {
            return Err(CompileError::PosixClassOutsideSet { offset: start });
        }

        let negated = self.eat('^');
        let mut ranges: Vec<Range> = Vec::new();
        let mut first = true;

        loop {
            let item_start = self.pos;
            let c = self
                .bump()
                .ok_or(CompileError::UnterminatedClass { offset: start })?;

            let item = match c {
                ']' if !first => break,
                '[' => match self.scan_posix(self.pos) {
                    Some((name, posix_negated, end)) => {
                        self.pos = end;
                        let class = posix_ranges(&name, self.flags.unicode)
                            .ok_or(CompileError::UnknownPosixClass {
                                offset: item_start,
                                name,
                            })?;
                        ClassItem::Ranges(if posix_negated {
                            complement(class)
                        } else {
                            class
                        })
                    }
                    None => ClassItem::Char('['),
                },
                '\\' => self.parse_class_escape(item_start)?,
                c => ClassItem::Char(c),
            };

            first = false;

            let lo = match item {
                ClassItem::Char(lo) => lo,
                ClassItem::Ranges(class) => {
                    ranges.extend(class);
                    continue;
                }
                ClassItem::Quoted(chars) => {
                    ranges.extend(chars.into_iter().map(|c| (c, c)));
                    continue;
                }
                ClassItem::Nothing => continue,
            };

            // A range needs a `-` followed by something other than the
            // closing bracket.
            if self.peek() != Some('-') || matches!(self.peek_at(1), Some(']') | None) {
                ranges.push((lo, lo));
                continue;
            }

            let dash = self.pos;
            self.pos += 1;
            let hi_start = self.pos;

            let hi = match self.bump() {
                Some('\\') => match self.parse_class_escape(hi_start)? {
                    ClassItem::Char(hi) => Some(hi),
                    _ => None,
                },
                Some('[') if self.scan_posix(self.pos).is_some() => None,
                Some(c) => Some(c),
                None => None,
            };

            match hi {
                Some(hi) if hi < lo => {
                    return Err(CompileError::InvalidRange {
                        offset: item_start,
                        start: lo,
                        end: hi,
                    })
                }
                Some(hi) => ranges.push((lo, hi)),
                None => {
                    // Not a range, the dash is parsed again as a literal.
                    self.pos = dash;
                    ranges.push((lo, lo));
                }
            }
        }

        Ok(Ast::Char(CharMatcher::Set(Box::new(CharSet::from_ranges(
            ranges,
            negated,
            self.flags.case_insensitive,
        )))))
    }
}

fn next_char(c: char) -> Option<char> {
    match c {
        '\u{d7ff}' => Some('\u{e000}'),
        c => char::from_u32(c as u32 + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c {
        '\u{e000}' => Some('\u{d7ff}'),
        c => char::from_u32((c as u32).checked_sub(1)?),
    }
}

/// Returns the ranges of all the characters that are not in `ranges`.
pub(crate) fn complement(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_unstable();
    let mut result = Vec::new();
    let mut next = Some('\0');
    for (lo, hi) in ranges {
        let Some(from) = next else { break };
        if lo > from {
            if let Some(to) = prev_char(lo) {
                result.push((from, to));
            }
        }
        if hi >= from {
            next = next_char(hi);
        }
    }
    if let Some(from) = next {
        result.push((from, char::MAX));
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{complement, Parser};
    use crate::chars::CharMatcher;
    use crate::compiler::ast::{Ast, GroupRef};
    use crate::errors::CompileError;
    use crate::program::{Assertion, RepeatMode};
    use crate::Flags;

    fn parse(pattern: &str) -> Ast {
        Parser::new().parse(pattern, Flags::default()).unwrap().ast
    }

    fn parse_err(pattern: &str) -> CompileError {
        Parser::new().parse(pattern, Flags::default()).unwrap_err()
    }

    fn char(c: char) -> Ast {
        Ast::Char(CharMatcher::Char(c))
    }

    #[test]
    fn concat_and_alternation() {
        assert_eq!(
            parse("ab|c"),
            Ast::Alternation(vec![Ast::Concat(vec![char('a'), char('b')]), char('c')])
        );
        assert_eq!(parse(""), Ast::Empty);
        assert_eq!(parse("a|"), Ast::Alternation(vec![char('a'), Ast::Empty]));
    }

    #[test]
    fn quantifiers() {
        assert_eq!(
            parse("a{2,5}?"),
            Ast::Repeat {
                body: Box::new(char('a')),
                min: 2,
                max: Some(5),
                mode: RepeatMode::Lazy
            }
        );
        assert_eq!(
            parse("a*+"),
            Ast::Repeat {
                body: Box::new(char('a')),
                min: 0,
                max: None,
                mode: RepeatMode::Possessive
            }
        );
        assert_eq!(
            Parser::new().parse("a+", Flags::parse("U").unwrap()).unwrap().ast,
            Ast::Repeat {
                body: Box::new(char('a')),
                min: 1,
                max: None,
                mode: RepeatMode::Lazy
            }
        );
        // Braces that are not a quantifier are literals.
        assert_eq!(
            parse("a{,2}"),
            Ast::Concat(vec![char('a'), char('{'), char(','), char('2'), char('}')])
        );
        assert_eq!(parse("x{"), Ast::Concat(vec![char('x'), char('{')]));
    }

    #[test]
    fn groups() {
        let parsed = Parser::new()
            .parse("(a)(?:b)(?<year>c)(?P<m>d)(?'day'e)", Flags::default())
            .unwrap();

        assert_eq!(parsed.group_count, 4);
        assert_eq!(
            parsed.names,
            vec![
                None,
                None,
                Some("year".to_string()),
                Some("m".to_string()),
                Some("day".to_string())
            ]
        );
        assert_eq!(parsed.name_index.get("m"), Some(&3));
    }

    #[test]
    fn inline_options() {
        assert_eq!(
            parse("a(?i)b"),
            Ast::Concat(vec![char('a'), Ast::Char(CharMatcher::CharNoCase('b'))])
        );
        // Options set inside a group end with the group.
        assert_eq!(
            parse("(?:(?i)a)a"),
            Ast::Concat(vec![Ast::Char(CharMatcher::CharNoCase('a')), char('a')])
        );
        assert_eq!(
            parse("(?i:a)a"),
            Ast::Concat(vec![Ast::Char(CharMatcher::CharNoCase('a')), char('a')])
        );
        assert_eq!(
            Parser::new().parse("(?-i)a", Flags::parse("i").unwrap()).unwrap().ast,
            char('a')
        );
        assert_eq!(parse("(?x) a b # comment\n c"), Ast::Concat(vec![
            char('a'),
            char('b'),
            char('c')
        ]));
    }

    #[test]
    fn escapes() {
        assert_eq!(parse(r"\x41\x{263a}\n\0"), Ast::Concat(vec![
            char('A'),
            char('☺'),
            char('\n'),
            char('\0')
        ]));
        assert_eq!(parse(r"\cA"), char('\x01'));
        assert_eq!(parse(r"\101"), char('A'));
        assert_eq!(parse(r"\.\*"), Ast::Concat(vec![char('.'), char('*')]));
        assert_eq!(parse(r"\Qa.b\E"), Ast::Concat(vec![char('a'), char('.'), char('b')]));
        assert_eq!(parse(r"\A\z\Z\G"), Ast::Concat(vec![
            Ast::Assert(Assertion::SearchOrigin),
            Ast::Assert(Assertion::EndOfInput),
            Ast::Assert(Assertion::EndOfInputOrNewline),
            Ast::Assert(Assertion::PreviousMatchEnd),
        ]));
    }

    #[test]
    fn back_references() {
        assert_eq!(
            parse(r"(a)\1"),
            Ast::Concat(vec![
                Ast::Group { index: 1, body: Box::new(char('a')) },
                Ast::BackRef {
                    target: GroupRef::Index(1),
                    case_insensitive: false,
                    offset: 3
                }
            ])
        );
        assert_eq!(
            parse(r"(a)\g{-1}"),
            Ast::Concat(vec![
                Ast::Group { index: 1, body: Box::new(char('a')) },
                Ast::BackRef {
                    target: GroupRef::Index(1),
                    case_insensitive: false,
                    offset: 3
                }
            ])
        );
        assert_eq!(
            parse(r"\k<foo>"),
            Ast::BackRef {
                target: GroupRef::Name("foo".to_string()),
                case_insensitive: false,
                offset: 0
            }
        );
    }

    #[test]
    fn classes() {
        let Ast::Char(CharMatcher::Set(set)) = parse(r"[a-c\d[:space:]-]") else {
            panic!()
        };
        for c in ['a', 'b', 'c', '5', ' ', '\t', '-'] {
            assert!(set.contains(c), "{:?}", c);
        }
        assert!(!set.contains('d'));

        let Ast::Char(CharMatcher::Set(set)) = parse(r"[]a]") else { panic!() };
        assert!(set.contains(']'));

        let Ast::Char(CharMatcher::Set(set)) = parse(r"[^\w]") else { panic!() };
        assert!(set.contains('%'));
        assert!(!set.contains('x'));

        let Ast::Char(CharMatcher::Set(set)) = parse(r"[\w-.]") else { panic!() };
        assert!(set.contains('-'));
        assert!(set.contains('.'));

        let Ast::Char(CharMatcher::Set(set)) = parse(r"[[:^digit:]]") else {
            panic!()
        };
        assert!(!set.contains('3'));
        assert!(set.contains('x'));
    }

    #[test]
    fn errors() {
        assert_eq!(parse_err("(ab"), CompileError::UnterminatedGroup { offset: 0 });
        assert_eq!(parse_err("ab)"), CompileError::UnmatchedParenthesis { offset: 2 });
        assert_eq!(parse_err("[ab"), CompileError::UnterminatedClass { offset: 0 });
        assert_eq!(parse_err("*a"), CompileError::NothingToRepeat { offset: 0 });
        assert_eq!(parse_err("a|?"), CompileError::NothingToRepeat { offset: 2 });
        assert_eq!(parse_err("^*"), CompileError::NothingToRepeat { offset: 1 });
        assert_eq!(parse_err("a**"), CompileError::NothingToRepeat { offset: 2 });
        assert_eq!(parse_err("a{3,2}"), CompileError::InvalidRepetition { offset: 1 });
        assert_eq!(
            parse_err("a{70000}"),
            CompileError::RepetitionTooLarge { offset: 1, max: 65535 }
        );
        assert_eq!(parse_err(r"\x{zz}"), CompileError::InvalidHexEscape { offset: 0 });
        assert_eq!(parse_err(r"\x{110000}"), CompileError::InvalidHexEscape { offset: 0 });
        assert_eq!(parse_err("ab\\"), CompileError::TrailingBackslash { offset: 2 });
        assert_eq!(
            parse_err(r"\i"),
            CompileError::UnknownEscape { offset: 0, escape: 'i' }
        );
        assert_eq!(
            parse_err("[z-a]"),
            CompileError::InvalidRange { offset: 1, start: 'z', end: 'a' }
        );
        assert_eq!(
            parse_err("[[:foo:]]"),
            CompileError::UnknownPosixClass { offset: 1, name: "foo".to_string() }
        );
        assert_eq!(parse_err("[:alpha:]"), CompileError::PosixClassOutsideSet { offset: 0 });
        assert_eq!(
            parse_err(r"\p{Foo}"),
            CompileError::UnknownProperty { offset: 0, name: "Foo".to_string() }
        );
        assert_eq!(parse_err("(?<1a>x)"), CompileError::InvalidGroupName { offset: 3 });
        assert_eq!(
            parse_err("(?<n>x)(?<n>y)"),
            CompileError::DuplicateGroupName { offset: 10, name: "n".to_string() }
        );
        assert_eq!(parse_err("(?(x"), CompileError::InvalidGroupName { offset: 3 });
        assert_eq!(parse_err("(?(?=a)b)"), CompileError::InvalidCondition { offset: 3 });
        assert_eq!(
            parse_err("(a)(?(1)b|c|d)"),
            CompileError::TooManyBranches { offset: 3 }
        );
        assert_eq!(parse_err("(?Q)"), CompileError::UnknownGroupType { offset: 2 });
        assert_eq!(parse_err("(?#abc"), CompileError::UnterminatedGroup { offset: 0 });
        assert_eq!(parse_err(r"\cé"), CompileError::InvalidControlEscape { offset: 0 });
        assert_eq!(
            parse_err(r"(a)\g{-2}"),
            CompileError::InvalidBackReference { offset: 3, group: 0 }
        );
    }

    #[test]
    fn nesting_limit() {
        let parser = Parser::new().nesting_limit(3);

        assert!(parser.parse("(((a)))", Flags::default()).is_ok());
        assert_eq!(
            parser.parse("((((a))))", Flags::default()).unwrap_err(),
            CompileError::NestingTooDeep { offset: 3, limit: 3 }
        );
    }

    #[test]
    fn complement_ranges() {
        assert_eq!(
            complement(vec![('b', 'c'), ('\0', 'a')]),
            vec![('d', char::MAX)]
        );
        assert_eq!(
            complement(vec![('\u{d000}', '\u{d7ff}')]),
            vec![('\0', '\u{cfff}'), ('\u{e000}', char::MAX)]
        );
        assert_eq!(complement(vec![('\0', char::MAX)]), Vec::<(char, char)>::new());
    }
}
