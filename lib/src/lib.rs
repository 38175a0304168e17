/*! A backtracking regular expression engine written in Rust from scratch.

The engine understands the pattern syntax of PCRE as used by PHP's
`preg_*` functions: greedy, lazy and possessive quantifiers, capturing,
named and atomic groups, backreferences, lookahead and lookbehind,
conditional groups, POSIX classes and Unicode properties.

There are two main types in this crate: [`Regexp`] and [`MatchState`]. A
regexp is compiled once and never changes afterwards, it can be shared
between threads. A match state binds a regexp to a subject and holds the
capture groups of the last match, it is used for iterating over the matches
of the regexp in that subject.

Being a backtracking engine, some patterns can take exponential time on some
subjects. The [`Limits`] attached to each regexp bound the resources used by
a single search, turning runaway searches into a [`MatchError`].

# Example

```rust
# use backre::{Flags, Text};
// Compile a regexp.
let re = backre::compile(r"(?<key>\w+)=(?<value>\w+)", Flags::default()).unwrap();

// Search it in some text.
let subject = Text::from("a=1, b=2");
let mut state = re.new_match_state(&subject);

let mut pairs = Vec::new();
while state.find().unwrap() {
    pairs.push((state.group(1).unwrap(), state.group(2).unwrap()));
}

assert_eq!(pairs, [("a".into(), "1".into()), ("b".into(), "2".into())]);
```
*/

#![warn(missing_docs)]

pub use cache::RegexpCache;
pub use cache::DEFAULT_CAPACITY;
pub use errors::CompileError;
pub use errors::MatchError;
pub use flags::Flags;
pub use limits::Limits;
pub use limits::DEFAULT_MAX_DEPTH;
pub use regexp::Regexp;
pub use state::MatchState;
pub use subject::Subject;
pub use subject::Text;

mod cache;
mod chars;
mod compiler;
mod errors;
mod flags;
mod limits;
mod program;
mod regexp;
mod state;
mod subject;

#[cfg(test)]
mod tests;

/// Compiles a regular expression.
///
/// This is a shortcut for [`Regexp::new`].
pub fn compile(pattern: &str, flags: Flags) -> Result<Regexp, CompileError> {
    Regexp::new(pattern, flags)
}
