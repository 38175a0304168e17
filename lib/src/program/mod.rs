/*! Compiled form of a regular expression.

A [`Program`] is an arena of [`Node`]s addressed by [`NodeId`]. Each node
stores the identifier of its continuation, the node that must be executed
after the node succeeds. The arena is immutable once the compiler is done
with it, and the same program can be executed by any number of match states
concurrently.

Loops are represented by a [`Node::LoopHead`] and a [`Node::LoopTail`]. The
body of the loop is compiled with the tail as its continuation, and the tail
refers back to the head by id. No node owns another node, so the graph is
free of reference cycles.

Node [`NodeId::END`] is always at index 0. Reaching it means that the
program (or the sub-program of a lookaround or atomic group) matched.
*/

use std::fmt::{Display, Formatter};

use crate::chars::CharMatcher;

pub(crate) mod matcher;

/// Identifier of a node in the program's arena.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) struct NodeId(u32);

impl NodeId {
    /// The node that signals a successful match.
    pub const END: NodeId = NodeId(0);

    /// Placeholder used for continuations that are patched later.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

/// Zero-width assertions about the position in the subject.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Assertion {
    /// `^` without multiline mode. Matches only at offset 0.
    StartOfInput,
    /// `^` in multiline mode.
    StartOfLine,
    /// `\z`, or `$` with the `D` flag.
    EndOfInput,
    /// `\Z`, or `$` without multiline mode. Matches at the end of the subject
    /// or before a newline that is the last character.
    EndOfInputOrNewline,
    /// `$` in multiline mode.
    EndOfLine,
    /// `\A`. Matches at the offset where the search started.
    SearchOrigin,
    /// `\G`. Matches where the previous match ended.
    PreviousMatchEnd,
    WordBoundary { unicode: bool },
    NotWordBoundary { unicode: bool },
}

impl Display for Assertion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Assertion::StartOfInput => write!(f, "START_OF_INPUT"),
            Assertion::StartOfLine => write!(f, "START_OF_LINE"),
            Assertion::EndOfInput => write!(f, "END_OF_INPUT"),
            Assertion::EndOfInputOrNewline => write!(f, "END_OF_INPUT_OR_NL"),
            Assertion::EndOfLine => write!(f, "END_OF_LINE"),
            Assertion::SearchOrigin => write!(f, "SEARCH_ORIGIN"),
            Assertion::PreviousMatchEnd => write!(f, "PREV_MATCH_END"),
            Assertion::WordBoundary { .. } => write!(f, "WORD_BOUNDARY"),
            Assertion::NotWordBoundary { .. } => write!(f, "NOT_WORD_BOUNDARY"),
        }
    }
}

/// Repetition discipline of a quantifier.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum RepeatMode {
    Greedy,
    Lazy,
    Possessive,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Node {
    /// The (sub-)program matched.
    End,

    /// Matches one character.
    Char { matcher: CharMatcher, next: NodeId },

    /// Matches a sequence of characters.
    Literal { chars: Box<[char]>, case_insensitive: bool, next: NodeId },

    Assert { assertion: Assertion, next: NodeId },

    /// Records the offset where capture group `group` begins.
    GroupStart { group: usize, next: NodeId },

    /// Commits the capture group `group`, from the offset recorded by its
    /// [`Node::GroupStart`] up to the current offset.
    GroupEnd { group: usize, next: NodeId },

    BackRef { group: usize, case_insensitive: bool, next: NodeId },

    /// Tries each alternative in order, the first one that leads to a
    /// successful match wins.
    Alternation { alternatives: Box<[NodeId]> },

    /// Entry point of a loop. `slot` identifies the loop's iteration counter
    /// in the match state.
    LoopHead {
        slot: usize,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        body: NodeId,
        next: NodeId,
    },

    /// End of one iteration of the loop that starts at `head`.
    LoopTail { head: NodeId },

    /// Loop whose body is a single character. Executed without recursing
    /// once per iteration.
    CharRepeat {
        matcher: CharMatcher,
        min: u32,
        max: Option<u32>,
        mode: RepeatMode,
        next: NodeId,
    },

    /// Possessive loop. The body is a sub-program that ends in
    /// [`NodeId::END`].
    Possessive { body: NodeId, min: u32, max: Option<u32>, next: NodeId },

    /// Atomic group. The body is a sub-program that ends in
    /// [`NodeId::END`].
    Atomic { body: NodeId, next: NodeId },

    LookAhead { body: NodeId, negated: bool, next: NodeId },

    /// Lookbehind made of one or more alternatives, each one with a fixed
    /// width. The body of each alternative is a sub-program that must end
    /// exactly at the current offset when started `width` characters
    /// before it.
    LookBehind { branches: Box<[(usize, NodeId)]>, negated: bool, next: NodeId },

    /// Continues with `yes` if group `group` has matched, or with `no`
    /// otherwise.
    Conditional { group: usize, yes: NodeId, no: NodeId },
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    nodes: Vec<Node>,
    start: NodeId,
    loop_slots: usize,
}

impl Program {
    pub(crate) fn new() -> Self {
        Self { nodes: vec![Node::End], start: NodeId::END, loop_slots: 0 }
    }

    /// Adds a node to the arena and returns its id.
    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Returns a mutable reference to a node that was already added.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the number of nodes in the arena.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn start(&self) -> NodeId {
        self.start
    }

    pub(crate) fn set_start(&mut self, start: NodeId) {
        self.start = start;
    }

    pub(crate) fn loop_slots(&self) -> usize {
        self.loop_slots
    }

    /// Reserves a new loop slot and returns its index.
    pub(crate) fn new_loop_slot(&mut self) -> usize {
        self.loop_slots += 1;
        self.loop_slots - 1
    }
}

fn fmt_max(max: &Option<u32>) -> String {
    match max {
        Some(max) => max.to_string(),
        None => "inf".to_string(),
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for (i, node) in self.nodes.iter().enumerate() {
            write!(f, "{}: ", NodeId(i as u32))?;
            match node {
                Node::End => writeln!(f, "END")?,
                Node::Char { matcher, next } => {
                    writeln!(f, "CHAR {} -> {}", matcher, next)?
                }
                Node::Literal { chars, case_insensitive, next } => writeln!(
                    f,
                    "LIT \"{}\"{} -> {}",
                    chars.iter().collect::<String>().escape_debug(),
                    if *case_insensitive { "/i" } else { "" },
                    next
                )?,
                Node::Assert { assertion, next } => {
                    writeln!(f, "ASSERT {} -> {}", assertion, next)?
                }
                Node::GroupStart { group, next } => {
                    writeln!(f, "GROUP_START {} -> {}", group, next)?
                }
                Node::GroupEnd { group, next } => {
                    writeln!(f, "GROUP_END {} -> {}", group, next)?
                }
                Node::BackRef { group, case_insensitive, next } => writeln!(
                    f,
                    "BACKREF {}{} -> {}",
                    group,
                    if *case_insensitive { "/i" } else { "" },
                    next
                )?,
                Node::Alternation { alternatives } => {
                    write!(f, "ALT")?;
                    for alt in alternatives.iter() {
                        write!(f, " {}", alt)?;
                    }
                    writeln!(f)?
                }
                Node::LoopHead { slot, min, max, greedy, body, next } => writeln!(
                    f,
                    "LOOP_HEAD #{} {{{},{}}}{} body={} -> {}",
                    slot,
                    min,
                    fmt_max(max),
                    if *greedy { "" } else { "?" },
                    body,
                    next
                )?,
                Node::LoopTail { head } => writeln!(f, "LOOP_TAIL head={}", head)?,
                Node::CharRepeat { matcher, min, max, mode, next } => writeln!(
                    f,
                    "CHAR_REPEAT {} {{{},{}}}{} -> {}",
                    matcher,
                    min,
                    fmt_max(max),
                    match mode {
                        RepeatMode::Greedy => "",
                        RepeatMode::Lazy => "?",
                        RepeatMode::Possessive => "+",
                    },
                    next
                )?,
                Node::Possessive { body, min, max, next } => writeln!(
                    f,
                    "POSSESSIVE {{{},{}}} body={} -> {}",
                    min,
                    fmt_max(max),
                    body,
                    next
                )?,
                Node::Atomic { body, next } => {
                    writeln!(f, "ATOMIC body={} -> {}", body, next)?
                }
                Node::LookAhead { body, negated, next } => writeln!(
                    f,
                    "{} body={} -> {}",
                    if *negated { "NEG_LOOKAHEAD" } else { "LOOKAHEAD" },
                    body,
                    next
                )?,
                Node::LookBehind { branches, negated, next } => {
                    write!(
                        f,
                        "{}",
                        if *negated { "NEG_LOOKBEHIND" } else { "LOOKBEHIND" }
                    )?;
                    for (width, body) in branches.iter() {
                        write!(f, " {}:{}", width, body)?;
                    }
                    writeln!(f, " -> {}", next)?
                }
                Node::Conditional { group, yes, no } => writeln!(
                    f,
                    "COND {} yes={} no={}",
                    group, yes, no
                )?,
            }
        }
        Ok(())
    }
}
