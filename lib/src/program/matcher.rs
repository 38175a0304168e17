/*! Backtracking interpreter for [`Program`]s.

The interpreter walks the node graph starting at a given node and offset.
Nodes that can only succeed in one way (characters, literals, assertions,
conditionals) are executed in a loop, without recursion. Nodes that open a
choice point or modify the match registers call [`Matcher::run`] recursively
for their continuation, so that they can try another choice or undo their
changes when the continuation fails.

Every node that modifies the registers saves the previous value before doing
so, and restores it only when its continuation returns failure. A successful
path leaves all its changes in place, while a failed path leaves the
registers exactly as they were before it was tried.
*/

use smallvec::SmallVec;

use crate::chars::unicode::is_word_char;
use crate::chars::{eq_ignore_case, CharMatcher};
use crate::errors::MatchError;
use crate::limits::Limits;
use crate::program::{Assertion, Node, NodeId, Program, RepeatMode};
use crate::state::{Capture, LoopSlot, Registers};
use crate::subject::Subject;

// Copy of the capture registers, used by nodes that must roll back the
// captures made by a sub-program that matched.
struct Snapshot {
    captures: SmallVec<[Capture; 8]>,
    highest_group: usize,
}

/// Executes a [`Program`] against a subject.
pub(crate) struct Matcher<'m, S: Subject + ?Sized> {
    program: &'m Program,
    subject: &'m S,
    regs: &'m mut Registers,
    limits: Limits,
    len: usize,
    steps: u64,
}

impl<'m, S: Subject + ?Sized> Matcher<'m, S> {
    pub fn new(
        program: &'m Program,
        subject: &'m S,
        regs: &'m mut Registers,
        limits: Limits,
    ) -> Self {
        let len = subject.len();
        Self { program, subject, regs, limits, len, steps: 0 }
    }

    /// Tries to match the whole program starting exactly at `offset`.
    /// Returns the offset where the match ends.
    pub fn attempt(&mut self, offset: usize) -> Result<Option<usize>, MatchError> {
        self.regs.reset_captures();
        self.run(self.program.start(), offset, 0)
    }

    /// Returns the registers, with the captures of the last successful
    /// attempt.
    pub fn registers(&mut self) -> &mut Registers {
        self.regs
    }

    #[inline]
    fn step(&mut self) -> Result<(), MatchError> {
        self.steps += 1;
        match self.limits.max_steps {
            Some(limit) if self.steps > limit => {
                Err(MatchError::StepLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            captures: SmallVec::from_slice(&self.regs.captures),
            highest_group: self.regs.highest_group,
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.regs.captures.copy_from_slice(&snapshot.captures);
        self.regs.highest_group = snapshot.highest_group;
    }

    #[inline]
    fn matches_at(&self, matcher: &CharMatcher, offset: usize) -> bool {
        offset < self.len && matcher.matches(self.subject.char_at(offset))
    }

    /// Runs the program from node `id` at `offset`. Returns the offset at
    /// which [`NodeId::END`] was reached, or `None` if no path from `id`
    /// leads to it.
    pub fn run(
        &mut self,
        mut id: NodeId,
        mut offset: usize,
        depth: usize,
    ) -> Result<Option<usize>, MatchError> {
        if depth > self.limits.max_depth {
            return Err(MatchError::DepthLimitExceeded {
                limit: self.limits.max_depth,
            });
        }

        let program = self.program;

        loop {
            self.step()?;

            match program.node(id) {
                Node::End => return Ok(Some(offset)),
                Node::Char { matcher, next } => {
                    if !self.matches_at(matcher, offset) {
                        return Ok(None);
                    }
                    offset += 1;
                    id = *next;
                }
                Node::Literal { chars, case_insensitive, next } => {
                    if offset + chars.len() > self.len {
                        return Ok(None);
                    }
                    for (i, expected) in chars.iter().enumerate() {
                        let c = self.subject.char_at(offset + i);
                        let same = if *case_insensitive {
                            eq_ignore_case(c, *expected)
                        } else {
                            c == *expected
                        };
                        if !same {
                            return Ok(None);
                        }
                    }
                    offset += chars.len();
                    id = *next;
                }
                Node::Assert { assertion, next } => {
                    if !self.check_assertion(*assertion, offset) {
                        return Ok(None);
                    }
                    id = *next;
                }
                Node::GroupStart { group, next } => {
                    let group = *group;
                    let saved = self.regs.open[group];
                    self.regs.open[group] = Some(offset);
                    let result = self.run(*next, offset, depth + 1)?;
                    if result.is_none() {
                        self.regs.open[group] = saved;
                    }
                    return Ok(result);
                }
                Node::GroupEnd { group, next } => {
                    let group = *group;
                    let saved = self.regs.captures[group];
                    let saved_highest = self.regs.highest_group;
                    self.regs.captures[group] =
                        Capture { begin: self.regs.open[group], end: Some(offset) };
                    self.regs.highest_group = self.regs.highest_group.max(group);
                    let result = self.run(*next, offset, depth + 1)?;
                    if result.is_none() {
                        self.regs.captures[group] = saved;
                        self.regs.highest_group = saved_highest;
                    }
                    return Ok(result);
                }
                Node::BackRef { group, case_insensitive, next } => {
                    let (begin, end) = match self.regs.captures[*group] {
                        Capture { begin: Some(begin), end: Some(end) }
                            if begin <= end =>
                        {
                            (begin, end)
                        }
                        _ => return Ok(None),
                    };
                    let n = end - begin;
                    if offset + n > self.len {
                        return Ok(None);
                    }
                    for i in 0..n {
                        let expected = self.subject.char_at(begin + i);
                        let c = self.subject.char_at(offset + i);
                        let same = if *case_insensitive {
                            eq_ignore_case(c, expected)
                        } else {
                            c == expected
                        };
                        if !same {
                            return Ok(None);
                        }
                    }
                    offset += n;
                    id = *next;
                }
                Node::Alternation { alternatives } => {
                    let Some((last, rest)) = alternatives.split_last() else {
                        return Ok(None);
                    };
                    for alt in rest {
                        if let Some(end) = self.run(*alt, offset, depth + 1)? {
                            return Ok(Some(end));
                        }
                    }
                    id = *last;
                }
                Node::LoopHead { slot, .. } => {
                    let slot = *slot;
                    let saved = self.regs.loops[slot];
                    self.regs.loops[slot] = LoopSlot::default();
                    let result = self.loop_step(id, offset, depth + 1)?;
                    if result.is_none() {
                        self.regs.loops[slot] = saved;
                    }
                    return Ok(result);
                }
                Node::LoopTail { head } => {
                    let head = *head;
                    let Node::LoopHead { slot, .. } = program.node(head) else {
                        return Ok(None);
                    };
                    let slot = *slot;
                    let saved = self.regs.loops[slot].count;
                    self.regs.loops[slot].count = saved.saturating_add(1);
                    let result = self.loop_step(head, offset, depth + 1)?;
                    if result.is_none() {
                        self.regs.loops[slot].count = saved;
                    }
                    return Ok(result);
                }
                Node::CharRepeat { matcher, min, max, mode, next } => {
                    let (min, max, next) = (*min as usize, *max, *next);
                    let available = self.len.saturating_sub(offset);
                    let limit = max.map_or(available, |max| available.min(max as usize));

                    if *mode == RepeatMode::Lazy {
                        return self.lazy_char_repeat(matcher, min, limit, next, offset, depth);
                    }

                    let mut n = 0;
                    while n < limit && self.matches_at(matcher, offset + n) {
                        n += 1;
                    }
                    if n < min {
                        return Ok(None);
                    }
                    if *mode == RepeatMode::Greedy {
                        // Give back one character at a time, the last
                        // attempt (with `min` characters) continues below
                        // without recursion.
                        while n > min {
                            if let Some(end) = self.run(next, offset + n, depth + 1)? {
                                return Ok(Some(end));
                            }
                            n -= 1;
                        }
                    }
                    offset += n;
                    id = next;
                }
                Node::Possessive { body, min, max, next } => {
                    return self.possessive(*body, *min, *max, *next, offset, depth);
                }
                Node::Atomic { body, next } => {
                    let snapshot = self.snapshot();
                    let Some(end) = self.run(*body, offset, depth + 1)? else {
                        return Ok(None);
                    };
                    let result = self.run(*next, end, depth + 1)?;
                    if result.is_none() {
                        self.restore(&snapshot);
                    }
                    return Ok(result);
                }
                Node::LookAhead { body, negated, next } => {
                    let snapshot = self.snapshot();
                    let matched = self.run(*body, offset, depth + 1)?.is_some();
                    match self.after_lookaround(matched, *negated, &snapshot) {
                        Some(true) => {
                            let result = self.run(*next, offset, depth + 1)?;
                            if result.is_none() {
                                self.restore(&snapshot);
                            }
                            return Ok(result);
                        }
                        Some(false) => id = *next,
                        None => return Ok(None),
                    }
                }
                Node::LookBehind { branches, negated, next } => {
                    let snapshot = self.snapshot();
                    let mut matched = false;
                    for (width, body) in branches.iter() {
                        let Some(start) = offset.checked_sub(*width) else {
                            continue;
                        };
                        match self.run(*body, start, depth + 1)? {
                            Some(end) if end == offset => {
                                matched = true;
                                break;
                            }
                            Some(_) => self.restore(&snapshot),
                            None => {}
                        }
                    }
                    match self.after_lookaround(matched, *negated, &snapshot) {
                        Some(true) => {
                            let result = self.run(*next, offset, depth + 1)?;
                            if result.is_none() {
                                self.restore(&snapshot);
                            }
                            return Ok(result);
                        }
                        Some(false) => id = *next,
                        None => return Ok(None),
                    }
                }
                Node::Conditional { group, yes, no } => {
                    id = match self.regs.captures[*group] {
                        Capture { begin: Some(begin), end: Some(end) }
                            if begin <= end =>
                        {
                            *yes
                        }
                        _ => *no,
                    };
                }
            }
        }
    }

    // Decides how to proceed after the body of a lookaround was tried.
    // Returns `None` if the assertion failed, `Some(true)` if it succeeded
    // and kept captures that must be rolled back if the continuation fails,
    // and `Some(false)` if it succeeded without changing the registers.
    fn after_lookaround(
        &mut self,
        matched: bool,
        negated: bool,
        snapshot: &Snapshot,
    ) -> Option<bool> {
        match (matched, negated) {
            (true, false) => Some(true),
            (false, false) => None,
            (true, true) => {
                self.restore(snapshot);
                None
            }
            (false, true) => Some(false),
        }
    }

    fn check_assertion(&self, assertion: Assertion, offset: usize) -> bool {
        let len = self.len;
        let char_at = |i: usize| self.subject.char_at(i);
        match assertion {
            Assertion::StartOfInput => offset == 0,
            Assertion::StartOfLine => {
                offset == 0 || (offset < len && char_at(offset - 1) == '\n')
            }
            Assertion::EndOfInput => offset == len,
            Assertion::EndOfInputOrNewline => {
                offset == len || (offset + 1 == len && char_at(offset) == '\n')
            }
            Assertion::EndOfLine => offset == len || char_at(offset) == '\n',
            Assertion::SearchOrigin => offset == self.regs.search_start,
            Assertion::PreviousMatchEnd => offset == self.regs.last_match_end,
            Assertion::WordBoundary { unicode } => {
                self.at_word_boundary(offset, unicode)
            }
            Assertion::NotWordBoundary { unicode } => {
                !self.at_word_boundary(offset, unicode)
            }
        }
    }

    fn at_word_boundary(&self, offset: usize, unicode: bool) -> bool {
        let before =
            offset > 0 && is_word_char(self.subject.char_at(offset - 1), unicode);
        let after =
            offset < self.len && is_word_char(self.subject.char_at(offset), unicode);
        before != after
    }

    // Continues a loop after its head or one of its iterations. Decides
    // whether to run one more iteration or to leave the loop, and in which
    // order to try both options.
    fn loop_step(
        &mut self,
        head: NodeId,
        offset: usize,
        depth: usize,
    ) -> Result<Option<usize>, MatchError> {
        let program = self.program;
        let Node::LoopHead { slot, min, max, greedy, body, next } = program.node(head)
        else {
            return Ok(None);
        };

        let (slot, min, max, greedy, body, next) =
            (*slot, *min, *max, *greedy, *body, *next);

        let LoopSlot { count, start } = self.regs.loops[slot];

        if count < min {
            return self.iterate(slot, body, offset, depth);
        }

        // An iteration that didn't consume anything ends the loop, another
        // iteration would match the same empty string again.
        let can_iterate =
            max.map_or(true, |max| count < max) && start != Some(offset);

        if !can_iterate {
            return self.run(next, offset, depth);
        }

        if greedy {
            if let Some(end) = self.iterate(slot, body, offset, depth)? {
                return Ok(Some(end));
            }
            self.run(next, offset, depth)
        } else {
            if let Some(end) = self.run(next, offset, depth)? {
                return Ok(Some(end));
            }
            self.iterate(slot, body, offset, depth)
        }
    }

    fn iterate(
        &mut self,
        slot: usize,
        body: NodeId,
        offset: usize,
        depth: usize,
    ) -> Result<Option<usize>, MatchError> {
        let saved = self.regs.loops[slot].start;
        self.regs.loops[slot].start = Some(offset);
        let result = self.run(body, offset, depth + 1)?;
        if result.is_none() {
            self.regs.loops[slot].start = saved;
        }
        Ok(result)
    }

    fn lazy_char_repeat(
        &mut self,
        matcher: &CharMatcher,
        min: usize,
        limit: usize,
        next: NodeId,
        offset: usize,
        depth: usize,
    ) -> Result<Option<usize>, MatchError> {
        if min > limit {
            return Ok(None);
        }
        for i in 0..min {
            if !self.matches_at(matcher, offset + i) {
                return Ok(None);
            }
        }
        let mut n = min;
        loop {
            if let Some(end) = self.run(next, offset + n, depth + 1)? {
                return Ok(Some(end));
            }
            if n >= limit || !self.matches_at(matcher, offset + n) {
                return Ok(None);
            }
            n += 1;
        }
    }

    // Runs the body of a possessive loop as many times as possible and
    // continues with `next` without ever giving back an iteration.
    fn possessive(
        &mut self,
        body: NodeId,
        min: u32,
        max: Option<u32>,
        next: NodeId,
        offset: usize,
        depth: usize,
    ) -> Result<Option<usize>, MatchError> {
        let snapshot = self.snapshot();
        let mut count: u32 = 0;
        let mut pos = offset;

        while max.map_or(true, |max| count < max) {
            match self.run(body, pos, depth + 1)? {
                Some(end) if end == pos => {
                    // The body matched an empty string, any further
                    // iteration would do the same.
                    count = count.max(min);
                    break;
                }
                Some(end) => {
                    count += 1;
                    pos = end;
                }
                None => break,
            }
        }

        if count < min {
            self.restore(&snapshot);
            return Ok(None);
        }

        let result = self.run(next, pos, depth + 1)?;
        if result.is_none() {
            self.restore(&snapshot);
        }
        Ok(result)
    }
}
