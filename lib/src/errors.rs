use thiserror::Error;

/// Errors returned while compiling a regular expression.
///
/// Every variant carries the offset (in characters, not bytes) within the
/// pattern text where the problem was detected. For delimited patterns (see
/// [`crate::Regexp::parse`]) the offset is relative to the text between the
/// delimiters.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum CompileError {
    #[error("missing closing parenthesis for group opened at offset {offset}")]
    UnterminatedGroup { offset: usize },

    #[error("unmatched closing parenthesis at offset {offset}")]
    UnmatchedParenthesis { offset: usize },

    #[error("missing terminating ] for character class at offset {offset}")]
    UnterminatedClass { offset: usize },

    #[error("quantifier does not follow a repeatable item at offset {offset}")]
    NothingToRepeat { offset: usize },

    #[error("numbers out of order in {{}} quantifier at offset {offset}")]
    InvalidRepetition { offset: usize },

    #[error("number too big in {{}} quantifier at offset {offset} (max: {max})")]
    RepetitionTooLarge { offset: usize, max: u32 },

    #[error("invalid hexadecimal escape at offset {offset}")]
    InvalidHexEscape { offset: usize },

    #[error("invalid control escape at offset {offset}")]
    InvalidControlEscape { offset: usize },

    #[error("pattern ends with a backslash")]
    TrailingBackslash { offset: usize },

    #[error("unrecognized escape sequence `\\{escape}` at offset {offset}")]
    UnknownEscape { offset: usize, escape: char },

    #[error("range out of order in character class at offset {offset} (`{start}-{end}`)")]
    InvalidRange { offset: usize, start: char, end: char },

    #[error("unknown POSIX class name `{name}` at offset {offset}")]
    UnknownPosixClass { offset: usize, name: String },

    #[error("POSIX named classes are supported only within a class (offset {offset})")]
    PosixClassOutsideSet { offset: usize },

    #[error("unknown property name `{name}` after \\P or \\p at offset {offset}")]
    UnknownProperty { offset: usize, name: String },

    #[error("invalid group name at offset {offset}")]
    InvalidGroupName { offset: usize },

    #[error("two named groups have the same name `{name}` (offset {offset})")]
    DuplicateGroupName { offset: usize, name: String },

    #[error("reference to non-existent group `{name}` at offset {offset}")]
    UnknownGroupName { offset: usize, name: String },

    #[error("reference to non-existent group {group} at offset {offset}")]
    InvalidBackReference { offset: usize, group: usize },

    #[error("lookbehind assertion is not fixed length (offset {offset})")]
    LookBehindNotFixedLength { offset: usize },

    #[error("malformed condition in conditional group at offset {offset}")]
    InvalidCondition { offset: usize },

    #[error("conditional group contains more than two branches (offset {offset})")]
    TooManyBranches { offset: usize },

    #[error("unrecognized character after (? at offset {offset}")]
    UnknownGroupType { offset: usize },

    #[error("parentheses are too deeply nested at offset {offset} (max: {limit})")]
    NestingTooDeep { offset: usize, limit: usize },

    #[error("empty regular expression")]
    EmptyPattern,

    #[error("delimiter must not be alphanumeric or backslash (found `{delimiter}`)")]
    InvalidDelimiter { delimiter: char },

    #[error("no ending delimiter `{delimiter}` found")]
    MissingDelimiter { delimiter: char },

    #[error("unknown modifier `{flag}`")]
    UnknownFlag { flag: char },
}

/// Errors returned while matching a compiled regular expression.
///
/// These are produced only by the safety limits described in
/// [`crate::Limits`]. Failing to find a match is not an error.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum MatchError {
    /// Backtracking went deeper than [`crate::Limits::max_depth`].
    #[error("pattern too complex: backtracking depth exceeded {limit}")]
    DepthLimitExceeded { limit: usize },

    /// The attempt visited more nodes than [`crate::Limits::max_steps`].
    #[error("pattern too complex: step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
}
