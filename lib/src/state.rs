/*! Match state and match driver.

A [`MatchState`] binds a compiled [`Regexp`] to a subject and holds
everything that changes while matching: the capture groups, the loop
counters and the offset where the next search starts. The regexp itself is
never modified, any number of match states can use the same regexp at the
same time.
*/

use log::*;

use crate::compiler::ast::Hints;
use crate::errors::MatchError;
use crate::program::matcher::Matcher;
use crate::subject::Subject;
use crate::Regexp;

/// Bounds of a capture group.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct Capture {
    pub begin: Option<usize>,
    pub end: Option<usize>,
}

/// Per-loop bookkeeping. `start` is the offset where the current iteration
/// started, used for stopping loops whose body matches the empty string.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct LoopSlot {
    pub count: u32,
    pub start: Option<usize>,
}

/// Registers modified by the interpreter while matching.
#[derive(Debug, Clone)]
pub(crate) struct Registers {
    /// Committed bounds for each group, group 0 is the whole match.
    pub captures: Vec<Capture>,
    /// Offset where each group was last entered, the group is committed
    /// into `captures` when its end is reached.
    pub open: Vec<Option<usize>>,
    pub loops: Vec<LoopSlot>,
    /// Highest group number that has been set in the current attempt.
    pub highest_group: usize,
    /// Offset where the current search started. Used by `\A`.
    pub search_start: usize,
    /// Offset where the previous match ended. Used by `\G`.
    pub last_match_end: usize,
}

impl Registers {
    pub fn new(groups: usize, loops: usize) -> Self {
        Self {
            captures: vec![Capture::default(); groups],
            open: vec![None; groups],
            loops: vec![LoopSlot::default(); loops],
            highest_group: 0,
            search_start: 0,
            last_match_end: 0,
        }
    }

    /// Clears the groups and loops before a new attempt.
    pub fn reset_captures(&mut self) {
        self.captures.fill(Capture::default());
        self.open.fill(None);
        self.loops.fill(LoopSlot::default());
        self.highest_group = 0;
    }
}

/// The state of a search for a [`Regexp`] in some subject.
///
/// Created with [`Regexp::new_match_state`]. After a successful call to
/// [`MatchState::find`], [`MatchState::find_from`] or [`MatchState::exec`]
/// the bounds of the match and its groups are available through
/// [`MatchState::start`], [`MatchState::end`] and [`MatchState::group`].
///
/// Calling [`MatchState::find`] repeatedly returns successive
/// non-overlapping matches.
///
/// ```
/// # use backre::{Flags, Regexp, Text};
/// let re = Regexp::new(r"(\w)(\d)", Flags::default()).unwrap();
/// let subject = Text::from("a1 b2");
/// let mut state = re.new_match_state(&subject);
///
/// assert!(state.find().unwrap());
/// assert_eq!(state.group(0).as_deref(), Some("a1"));
/// assert!(state.find().unwrap());
/// assert_eq!(state.group(1).as_deref(), Some("b"));
/// assert!(!state.find().unwrap());
/// ```
pub struct MatchState<'a, S: Subject + ?Sized> {
    regexp: &'a Regexp,
    subject: &'a S,
    regs: Registers,
    origin: usize,
    use_hints: bool,
}

impl<'a, S: Subject + ?Sized> MatchState<'a, S> {
    pub(crate) fn new(regexp: &'a Regexp, subject: &'a S) -> Self {
        Self {
            regexp,
            subject,
            regs: Registers::new(
                regexp.group_count(),
                regexp.program().loop_slots(),
            ),
            origin: 0,
            use_hints: true,
        }
    }

    /// Enables or disables the optimizations that skip positions where a
    /// match can't start. They are enabled by default. Disabling them only
    /// makes searches slower, results are the same.
    pub fn use_hints(&mut self, yes: bool) -> &mut Self {
        self.use_hints = yes;
        self
    }

    /// Returns the subject.
    pub fn subject(&self) -> &S {
        self.subject
    }

    /// Forgets previous matches. The next call to [`MatchState::find`]
    /// starts at the beginning of the subject.
    pub fn reset(&mut self) {
        self.regs.reset_captures();
        self.regs.search_start = 0;
        self.regs.last_match_end = 0;
        self.origin = 0;
    }

    /// Searches for the next match, starting where the previous match
    /// ended (or one character later if it was empty).
    ///
    /// Returns `Ok(false)` when there are no more matches.
    pub fn find(&mut self) -> Result<bool, MatchError> {
        let len = self.subject.len();
        let hints = self.regexp.hints();
        let anchored = self.regexp.flags().anchored;
        let use_hints = self.use_hints;

        trace!("find /{}/ from offset {} (length {})", self.regexp.pattern(), self.origin, len);

        let mut pos = self.origin;
        let mut matcher = Matcher::new(
            self.regexp.program(),
            self.subject,
            &mut self.regs,
            self.regexp.limits(),
        );

        let mut found = None;

        while pos <= len {
            if use_hints {
                match check_hints(hints, self.subject, pos, len) {
                    Candidate::Yes => {}
                    Candidate::No => {
                        if anchored {
                            break;
                        }
                        pos += 1;
                        continue;
                    }
                    Candidate::Never => break,
                }
            }

            if let Some(end) = matcher.attempt(pos)? {
                found = Some((pos, end));
                break;
            }

            if anchored {
                break;
            }

            pos += 1;
        }

        let regs = matcher.registers();

        match found {
            Some((start, end)) => {
                regs.captures[0].begin = Some(start);
                regs.captures[0].end = Some(end);
                regs.last_match_end = end;
                self.origin = if end == start { end + 1 } else { end };
                Ok(true)
            }
            None => {
                regs.reset_captures();
                self.origin = len + 1;
                Ok(false)
            }
        }
    }

    /// Searches for a match starting at `offset` or after it. `\A` matches
    /// at `offset`.
    pub fn find_from(&mut self, offset: usize) -> Result<bool, MatchError> {
        self.origin = offset;
        self.regs.search_start = offset;
        self.regs.last_match_end = offset;
        self.find()
    }

    /// Tries to match exactly at `start`, without trying any other
    /// position. Returns the offset where the match starts, which is always
    /// `start`, or `None` if there is no match at that position.
    pub fn exec(&mut self, start: usize) -> Result<Option<usize>, MatchError> {
        trace!("exec /{}/ at offset {}", self.regexp.pattern(), start);

        let len = self.subject.len();
        if start > len {
            self.regs.reset_captures();
            return Ok(None);
        }

        let mut matcher = Matcher::new(
            self.regexp.program(),
            self.subject,
            &mut self.regs,
            self.regexp.limits(),
        );

        let result = matcher.attempt(start)?;
        let regs = matcher.registers();

        match result {
            Some(end) => {
                regs.captures[0].begin = Some(start);
                regs.captures[0].end = Some(end);
                regs.last_match_end = end;
                self.origin = if end == start { end + 1 } else { end };
                Ok(Some(start))
            }
            None => {
                regs.reset_captures();
                Ok(None)
            }
        }
    }

    /// Number of groups in the regexp, including group 0.
    pub fn group_count(&self) -> usize {
        self.regs.captures.len()
    }

    /// Offset where group `i` starts, or `None` if the group didn't
    /// participate in the match.
    pub fn start(&self, i: usize) -> Option<usize> {
        self.capture(i).and_then(|c| c.begin)
    }

    /// Offset where group `i` ends, or `None` if the group didn't
    /// participate in the match.
    pub fn end(&self, i: usize) -> Option<usize> {
        self.capture(i).and_then(|c| c.end)
    }

    /// Returns true if group `i` participated in the match.
    pub fn is_group_matched(&self, i: usize) -> bool {
        self.capture(i).is_some()
    }

    /// Name of group `i`, if it is a named group.
    pub fn group_name(&self, i: usize) -> Option<&str> {
        self.regexp.group_name(i)
    }

    /// Highest group number that participated in the match. Groups after
    /// this one are unset.
    pub fn highest_group(&self) -> usize {
        self.regs.highest_group
    }

    /// Text matched by group `i`.
    pub fn group(&self, i: usize) -> Option<String> {
        let capture = self.capture(i)?;
        Some(self.subject.substring(capture.begin?, capture.end?))
    }

    /// Returns the characters of the subject in the range `start..end`.
    pub fn substring(&self, start: usize, end: usize) -> String {
        self.subject.substring(start, end)
    }

    // Returns the capture for group `i` if it is set and well-formed.
    fn capture(&self, i: usize) -> Option<Capture> {
        let capture = *self.regs.captures.get(i)?;
        match capture {
            Capture { begin: Some(begin), end: Some(end) } if begin <= end => {
                Some(capture)
            }
            _ => None,
        }
    }
}

enum Candidate {
    /// A match may start at this position.
    Yes,
    /// A match can't start at this position, but may start later.
    No,
    /// A match can't start at this position nor after it.
    Never,
}

fn check_hints<S: Subject + ?Sized>(
    hints: &Hints,
    subject: &S,
    pos: usize,
    len: usize,
) -> Candidate {
    if pos + hints.min_length > len || pos + hints.prefix.len() > len {
        return Candidate::Never;
    }

    if hints.anchored_start && pos > 0 {
        return Candidate::Never;
    }

    if pos < len {
        let c = subject.char_at(pos);
        if hints.first_char.is_some_and(|first| first != c) {
            return Candidate::No;
        }
        if let Some(set) = &hints.first_set {
            if c.is_ascii() && !set[c as usize] {
                return Candidate::No;
            }
        }
    } else if hints.first_set.is_some() || hints.first_char.is_some() {
        // These hints exist only for patterns that always consume at least
        // one character.
        return Candidate::Never;
    }

    let prefix_matches = hints
        .prefix
        .iter()
        .enumerate()
        .all(|(i, c)| subject.char_at(pos + i) == *c);

    if prefix_matches {
        Candidate::Yes
    } else {
        Candidate::No
    }
}
