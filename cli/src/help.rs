pub const CONFIG_FILE: &str = r#"Config file for bre

Specifies a config file which controls the behavior of bre. If config file is not
specified, ${HOME}/.backre.toml is used. If it does not exist the default options are
applied.

Supported options:

[limits]
max_depth = 512         # maximum backtracking depth
max_steps = 1000000     # maximum number of steps per search (unlimited by default)

[search]
line_numbers = false    # same as --line-number
color = true            # highlight matches when printing to a terminal"#;

pub const PATTERN_LONG_HELP: &str = r#"Delimited regular expression

The pattern is written between delimiters and can be followed by flags, like in
PHP's preg functions. Any character that is not a letter, digit, backslash or
whitespace can be used as delimiter. Brackets can be used as a pair of delimiters.

Supported flags:

  i  case-insensitive
  m  multiline, ^ and $ match at line boundaries
  s  dot matches newlines
  x  extended, whitespace and # comments are ignored
  u  unicode character classes
  U  quantifiers are lazy by default
  D  $ matches only at the very end of the subject
  A  matches must start at the search origin

Examples:

/foo(bar)?/i
#https?://\w+#
{^\d{3}-\d{4}$}"#;

pub const SEARCH_LONG_HELP: &str = r#"Search for a pattern in files

Prints the lines that match the pattern. If no path is given the text is read from
stdin. Directories are searched only when --recursive is used.

Examples:

bre search '/fo+/i' notes.txt
bre search -r -n '/\bTODO\b/' src
cat notes.txt | bre search -o '/\d+/'"#;

pub const TEST_LONG_HELP: &str = r#"Show every match of a pattern in a string

Prints the position of every match of the pattern in SUBJECT, together with the
text captured by each group. Positions are character offsets.

Example:

bre test '/(?<key>\w+)=(\d+)/' 'a=1 b=2'"#;

pub const DEBUG_LONG_HELP: &str = r#"Print the compiled form of a pattern

Shows the nodes the pattern is compiled to, and the hints used for skipping
positions where a match can't start."#;
