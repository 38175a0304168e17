use serde::{Deserialize, Serialize};

/// Default value for [`Limits::max_depth`]. It fits in the default 2 MiB
/// stack of a spawned thread, even in unoptimized builds. Raise it only when
/// matching on a thread with a larger stack.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Resource limits applied to every match attempt.
///
/// A backtracking matcher can take exponential time, and the number of
/// nested choice points it keeps alive grows with the input. These limits
/// turn both situations into a [`crate::MatchError`] instead of a hang or a
/// stack overflow. With limits large enough for the pattern and subject at
/// hand, results are exactly the same as without them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Maximum number of nested backtracking frames.
    pub max_depth: usize,
    /// Maximum number of nodes visited by a single `find` or `exec` call.
    /// `None` means no limit.
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, max_steps: None }
    }
}

impl Limits {
    /// Returns a copy of these limits with a different maximum depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns a copy of these limits with a different step budget.
    pub fn max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }
}
