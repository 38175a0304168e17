use std::fmt::{Display, Formatter, Write};

use rustc_hash::FxHashMap;

use crate::compiler::ast::Hints;
use crate::compiler::Compiler;
use crate::errors::{CompileError, MatchError};
use crate::program::Program;
use crate::state::MatchState;
use crate::subject::Subject;
use crate::{Flags, Limits};

/// A compiled regular expression.
///
/// A `Regexp` is immutable once compiled. It doesn't hold any data about
/// matches in progress, so it can be shared between threads and used by any
/// number of [`MatchState`]s at the same time.
///
/// ```
/// # use backre::{Flags, Regexp, Text};
/// let re = Regexp::new(r"^(\d{3})-(\d{4})$", Flags::default()).unwrap();
/// let subject = Text::from("555-1234");
/// let mut state = re.new_match_state(&subject);
///
/// assert!(state.find().unwrap());
/// assert_eq!(state.group(1).as_deref(), Some("555"));
/// assert_eq!(state.group(2).as_deref(), Some("1234"));
/// ```
#[derive(Debug, Clone)]
pub struct Regexp {
    pattern: String,
    flags: Flags,
    program: Program,
    hints: Hints,
    /// Number of groups, including group 0.
    group_count: usize,
    names: Vec<Option<String>>,
    name_index: FxHashMap<String, usize>,
    limits: Limits,
}

impl Regexp {
    /// Compiles `pattern` with the given flags.
    pub fn new(pattern: &str, flags: Flags) -> Result<Self, CompileError> {
        let compiled = Compiler::new().compile(pattern, flags)?;
        Ok(Self {
            pattern: pattern.to_string(),
            flags,
            program: compiled.program,
            hints: compiled.hints,
            group_count: compiled.group_count + 1,
            names: compiled.names,
            name_index: compiled.name_index,
            limits: Limits::default(),
        })
    }

    /// Compiles a delimited pattern like `/foo(bar)?/i`.
    ///
    /// The first character that is not whitespace is the delimiter. It can
    /// be any character except letters, digits, backslash and whitespace.
    /// If the delimiter is one of `(`, `[`, `{` or `<`, the pattern ends at
    /// the matching `)`, `]`, `}` or `>`, and the brackets may be nested
    /// inside the pattern. Otherwise the pattern ends at the next occurrence
    /// of the delimiter not preceded by a backslash. The closing delimiter
    /// is followed by zero or more flag letters (see [`Flags::parse`]).
    ///
    /// ```
    /// # use backre::Regexp;
    /// let re = Regexp::parse("{a(b)c}i").unwrap();
    /// assert_eq!(re.pattern(), "a(b)c");
    /// assert!(re.flags().case_insensitive);
    /// ```
    pub fn parse(delimited: &str) -> Result<Self, CompileError> {
        let (pattern, flags) = split_delimited(delimited)?;
        Self::new(&pattern, Flags::parse(flags)?)
    }

    /// Returns this regexp with different resource limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Resource limits applied when matching this regexp.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// The pattern text, without delimiters or flags.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The flags the pattern was compiled with.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Returns true if the pattern was compiled with the `e` flag. The
    /// engine itself ignores this flag.
    pub fn is_eval(&self) -> bool {
        self.flags.eval
    }

    /// Number of groups, including group 0 (the whole match).
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Name of group `i`, if it is a named group.
    pub fn group_name(&self, i: usize) -> Option<&str> {
        self.names.get(i)?.as_deref()
    }

    /// Number of the group called `name`.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// Minimum number of characters of any match.
    pub fn min_length(&self) -> usize {
        self.hints.min_length
    }

    /// Character that every match starts with, if there is one.
    pub fn first_char(&self) -> Option<char> {
        self.hints.first_char
    }

    /// Creates a new [`MatchState`] for searching this regexp in `subject`.
    pub fn new_match_state<'a, S: Subject + ?Sized>(
        &'a self,
        subject: &'a S,
    ) -> MatchState<'a, S> {
        MatchState::new(self, subject)
    }

    /// Returns true if the regexp matches anywhere in `subject`.
    pub fn is_match<S: Subject + ?Sized>(
        &self,
        subject: &S,
    ) -> Result<bool, MatchError> {
        self.new_match_state(subject).find()
    }

    /// Returns a human-readable listing of the compiled program, followed
    /// by the hints used for skipping positions where a match can't start.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}", self.program);
        let _ = writeln!(out, "start: {}", self.program.start());
        let _ = writeln!(out, "groups: {}", self.group_count - 1);
        for (i, name) in self.names.iter().enumerate() {
            if let Some(name) = name {
                let _ = writeln!(out, "  {}: {}", i, name);
            }
        }
        let _ = writeln!(out, "loop slots: {}", self.program.loop_slots());
        let _ = writeln!(out, "min length: {}", self.hints.min_length);
        if let Some(c) = self.hints.first_char {
            let _ = writeln!(out, "first char: {:?}", c);
        }
        if let Some(set) = &self.hints.first_set {
            let members: String = set
                .iter_ones()
                .map(|i| char::from(i as u8))
                .collect::<String>()
                .escape_debug()
                .to_string();
            let _ = writeln!(out, "first set: [{}]", members);
        }
        if !self.hints.prefix.is_empty() {
            let prefix: String = self.hints.prefix.iter().collect();
            let _ = writeln!(out, "prefix: {:?}", prefix);
        }
        if self.hints.anchored_start {
            let _ = writeln!(out, "anchored at start");
        }
        out
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn hints(&self) -> &Hints {
        &self.hints
    }
}

impl Display for Regexp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.flags)
    }
}

/// Splits a delimited pattern into the pattern itself and the flag letters
/// that follow the closing delimiter.
fn split_delimited(text: &str) -> Result<(String, &str), CompileError> {
    let text = text.trim_start();
    let mut chars = text.char_indices();

    let delimiter = match chars.next() {
        Some((_, c)) => c,
        None => return Err(CompileError::EmptyPattern),
    };

    if delimiter.is_alphanumeric() || delimiter == '\\' {
        return Err(CompileError::InvalidDelimiter { delimiter });
    }

    let closing = match delimiter {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        c => c,
    };

    let mut pattern = String::new();
    let mut nesting = 0;

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                pattern.push(c);
                if let Some((_, escaped)) = chars.next() {
                    pattern.push(escaped);
                }
            }
            c if c == closing && nesting == 0 => {
                let flags = match chars.next() {
                    Some((i, _)) => &text[i..],
                    None => "",
                };
                return Ok((pattern, flags));
            }
            c => {
                if closing != delimiter {
                    if c == delimiter {
                        nesting += 1;
                    } else if c == closing {
                        nesting -= 1;
                    }
                }
                pattern.push(c);
            }
        }
    }

    Err(CompileError::MissingDelimiter { delimiter: closing })
}
