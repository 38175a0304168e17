/*! End-to-end tests. */
use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::{Flags, Limits, MatchError, Regexp, Text, DEFAULT_MAX_DEPTH};

// Returns the bounds of every match of `re` in `subject`.
fn find_all(re: &Regexp, subject: &str, use_hints: bool) -> Vec<(usize, usize)> {
    let subject = Text::from(subject);
    let mut state = re.new_match_state(&subject);
    state.use_hints(use_hints);
    let mut matches = Vec::new();
    while state.find().unwrap() {
        matches.push((state.start(0).unwrap(), state.end(0).unwrap()));
    }
    matches
}

// Returns every group of the first match of `re` in `subject`, or `None`
// if there's no match.
fn groups(re: &Regexp, subject: &str) -> Option<Vec<Option<String>>> {
    let subject = Text::from(subject);
    let mut state = re.new_match_state(&subject);
    if !state.find().unwrap() {
        return None;
    }
    Some((0..state.group_count()).map(|i| state.group(i)).collect())
}

macro_rules! assert_match {
    ($re:expr, $subject:expr, $expected:expr) => {{
        let re = Regexp::parse($re).unwrap();
        let groups = groups(&re, $subject);
        assert_eq!(
            groups.as_ref().and_then(|g| g[0].as_deref()),
            Some($expected),
            "\n\n`{}` should match `{}` in {:?}",
            $re,
            $expected,
            $subject
        );
    }};
}

macro_rules! assert_no_match {
    ($re:expr, $subject:expr) => {{
        let re = Regexp::parse($re).unwrap();
        assert_eq!(
            groups(&re, $subject),
            None,
            "\n\n`{}` should not match {:?}",
            $re,
            $subject
        );
    }};
}

macro_rules! assert_groups {
    ($re:expr, $subject:expr, $expected:expr) => {{
        let re = Regexp::parse($re).unwrap();
        let expected: Vec<Option<&str>> = $expected.to_vec();
        let expected: Vec<Option<String>> =
            expected.into_iter().map(|g| g.map(String::from)).collect();
        assert_eq!(groups(&re, $subject), Some(expected));
    }};
}

macro_rules! assert_matches {
    ($re:expr, $subject:expr, $expected:expr) => {{
        let re = Regexp::parse($re).unwrap();
        let expected: Vec<(usize, usize)> = $expected.to_vec();
        assert_eq!(find_all(&re, $subject, true), expected);
    }};
}

#[test]
fn literals() {
    assert_match!("/abc/", "xxabcxx", "abc");
    assert_match!("/a.c/", "abc", "abc");
    assert_no_match!("/a.c/", "a\nc");
    assert_match!("/a.c/s", "a\nc", "a\nc");
    assert_match!(r"/\Q.*\E/", "a.*b", ".*");
    assert_no_match!(r"/\Q.*\E/", "ab");
    assert_match!(r"/\x41\x{263A}/", "zA☺", "A☺");
    assert_match!(r"/a\Rb/", "a\r\nb", "a\r\nb");
    assert_match!(r"/a\h+b/", "a \tb", "a \tb");
    assert_match!("/a{x/", "a{x", "a{x");
}

#[test]
fn alternation_order() {
    let re = Regexp::parse("/a|ab/").unwrap();
    let subject = Text::from("ab");
    let mut state = re.new_match_state(&subject);
    assert_eq!(state.exec(0).unwrap(), Some(0));
    assert_eq!(state.end(0), Some(1));

    assert_match!("/ab|a/", "ab", "ab");
    assert_match!("/(?:a|ab)c/", "abc", "abc");
}

#[test]
fn greedy_lazy_possessive() {
    assert_match!("/a+/", "aaa", "aaa");
    assert_match!("/a+?/", "aaa", "a");
    assert_match!("/a{2,}?/", "aaaa", "aa");
    assert_match!("/a??b/", "ab", "ab");
    assert_match!("/<.*>/", "<a><b>", "<a><b>");
    assert_match!("/<.*?>/", "<a><b>", "<a>");

    // Possessive repetitions never give back what they consumed.
    assert_no_match!("/a++a/", "aaa");
    assert_match!("/a+a/", "aaa", "aaa");
    assert_no_match!("/(?:a|b)++b/", "aab");
    assert_match!("/(?:a|b)+b/", "aab", "aab");
    assert_match!("/a?+b/", "ab", "ab");
    assert_match!("/a{1,2}+a/", "aaa", "aaa");
    assert_no_match!("/a{1,2}+a/", "aa");

    // The `U` flag inverts greediness.
    assert_match!("/a+/U", "aaa", "a");
    assert_match!("/a+?/U", "aaa", "aaa");
}

#[test]
fn bounded_repetitions() {
    assert_match!("/(?:ab){2,3}/", "abababab", "ababab");
    assert_match!("/(?:ab){2}/", "ababab", "abab");
    assert_no_match!("/(?:ab){2}/", "abxab");
    assert_match!("/x(?:ab){0,1}y/", "xy", "xy");
    assert_match!("/^(?:a|b){3}$/", "aba", "aba");
    assert_no_match!("/^(?:a|b){3}$/", "abab");
}

#[test]
fn atomic_groups() {
    assert_no_match!("/(?>a|ab)c/", "abc");
    assert_match!("/(?>ab|a)c/", "abc", "abc");
    assert_no_match!("/(?>a+)a/", "aaa");
    assert_match!("/(?>a+)b/", "aaab", "aaab");
}

#[test]
fn group_transactionality() {
    let re = Regexp::parse("/(a)(b)|(a)(c)/").unwrap();
    let subject = Text::from("ac");
    let mut state = re.new_match_state(&subject);

    assert_eq!(state.exec(0).unwrap(), Some(0));
    assert_eq!(state.group_count(), 5);
    assert_eq!(state.start(1), None);
    assert_eq!(state.end(1), None);
    assert_eq!(state.start(2), None);
    assert!(!state.is_group_matched(1));
    assert!(!state.is_group_matched(2));
    assert!(state.is_group_matched(3));
    assert_eq!(state.group(3).as_deref(), Some("a"));
    assert_eq!(state.group(4).as_deref(), Some("c"));
    assert_eq!(state.highest_group(), 4);
}

#[test]
fn captures() {
    assert_groups!("/(a|b)+/", "ab", [Some("ab"), Some("b")]);
    assert_groups!("/(a)|(b)/", "b", [Some("b"), None, Some("b")]);
    assert_groups!("/(ab)*?c/", "ababc", [Some("ababc"), Some("ab")]);
    assert_groups!("/(a(b)?)+/", "aba", [Some("aba"), Some("a"), Some("b")]);
    assert_groups!(
        r"/(?<year>\d{4})-(?<month>\d\d)/",
        "on 2024-05-01",
        [Some("2024-05"), Some("2024"), Some("05")]
    );

    let re = Regexp::parse("/(a)|(b)/").unwrap();
    let subject = Text::from("a");
    let mut state = re.new_match_state(&subject);
    assert!(state.find().unwrap());
    assert_eq!(state.highest_group(), 1);

    let re = Regexp::parse(r"/(?<word>\w+) (\w+)/").unwrap();
    let subject = Text::from("hello world");
    let state = re.new_match_state(&subject);
    assert_eq!(state.group_name(0), None);
    assert_eq!(state.group_name(1), Some("word"));
    assert_eq!(state.group_name(2), None);
}

#[test]
fn zero_width_loops_terminate() {
    let re = Regexp::parse("/(a*)*/").unwrap();
    let subject = Text::from("");
    let mut state = re.new_match_state(&subject);
    assert!(state.find().unwrap());
    assert_eq!(state.start(0), Some(0));
    assert_eq!(state.end(0), Some(0));
    assert!(!state.find().unwrap());

    assert_matches!("/(a*)*/", "b", [(0, 0), (1, 1)]);
    assert_matches!("/(a*)+/", "aab", [(0, 2), (2, 2), (3, 3)]);
    assert_matches!("/(?:a?)*?b/", "aab", [(0, 3)]);
    assert_matches!("/(?:\\b)*a/", "a a", [(0, 1), (2, 3)]);
    assert_matches!("/(?:|a)*+/", "aa", [(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn empty_matches_advance() {
    assert_matches!("/x*/", "axb", [(0, 0), (1, 2), (2, 2), (3, 3)]);
    assert_matches!("/a|/", "ba", [(0, 0), (1, 2), (2, 2)]);
}

#[test]
fn lookahead() {
    assert_match!("/foo(?=bar)/", "foobaz foobar", "foo");
    assert_no_match!("/foo(?=bar)/", "foobaz");
    assert_match!(r"/\d+(?!px)\b/", "12px 34em 56", "56");

    // Captures made inside a positive lookahead are kept.
    assert_groups!("/(?=(a+))a/", "aaa", [Some("a"), Some("aaa")]);

    // Captures made inside a negative lookahead are discarded.
    assert_groups!("/(?!(b))a/", "a", [Some("a"), None]);
}

#[test]
fn lookbehind() {
    let re = Regexp::parse("/(?<=abc)d/").unwrap();
    let subject = Text::from("abcd");
    let mut state = re.new_match_state(&subject);
    assert!(state.find().unwrap());
    assert_eq!(state.start(0), Some(3));
    assert_eq!(state.end(0), Some(4));

    assert_no_match!("/(?<=abc)d/", "abd");
    assert_no_match!("/(?<=abc)d/", "xbcd");
    assert_no_match!("/(?<=abc)d/", "d");

    // Alternatives of different lengths.
    assert_match!("/(?<=ab|c)d/", "cd", "d");
    assert_match!("/(?<=ab|c)d/", "abd", "d");
    assert_no_match!("/(?<=ab|c)d/", "bd");

    assert_matches!("/(?<!a)b/", "ab cb", [(4, 5)]);
    assert_groups!("/(?<=(a))b/", "ab", [Some("b"), Some("a")]);

    assert!(Regexp::parse("/(?<=a*)b/").is_err());
    assert!(Regexp::parse("/(?<=a|bc*)b/").is_err());
}

#[test]
fn back_references() {
    assert_match!(r"/(a|b)\1/", "aa", "aa");
    assert_match!(r"/(a|b)\1/", "bb", "bb");
    assert_no_match!(r"/(a|b)\1/", "ab");
    assert_match!(r"/(a)\1/i", "aA", "aA");
    assert_no_match!(r"/(a)\1/", "aA");
    assert_match!(r"/(?<q>['])\w+\k<q>/", "say 'hi'", "'hi'");
    assert_match!(r"/(?P<q>x)(?P=q)/", "axx", "xx");
    assert_match!(r"/(a)(b)\g{-1}\g1/", "abba", "abba");

    // A back-reference to a group that didn't participate never matches.
    assert_no_match!(r"/(a)?\1b/", "b");
}

#[test]
fn conditionals() {
    assert_match!(r"/^(<)?\w+(?(1)>)$/", "<a>", "<a>");
    assert_match!(r"/^(<)?\w+(?(1)>)$/", "a", "a");
    assert_no_match!(r"/^(<)?\w+(?(1)>)$/", "<a");
    assert_match!(r#"/(?<q>")?\w+(?(q)")/"#, "\"ab\"", "\"ab\"");
    assert_match!(r#"/(?<q>")?\w+(?(q)")/"#, "\"ab", "ab");
    assert_match!(r"/(a)?(?(1)b|c)/", "c", "c");
    assert_match!(r"/(a)?(?(1)b|c)/", "ab", "ab");
}

#[test]
fn anchors() {
    let re = Regexp::parse("/^a/").unwrap();
    let subject = Text::from("aaa");
    let mut state = re.new_match_state(&subject);
    assert!(!state.find_from(1).unwrap());

    let re = Regexp::parse(r"/\Aa/").unwrap();
    let mut state = re.new_match_state(&subject);
    assert!(state.find_from(2).unwrap());
    assert_eq!(state.start(0), Some(2));

    assert_matches!(r"/\Ga/", "aab", [(0, 1), (1, 2)]);
    assert_matches!("/a/A", "aab", [(0, 1), (1, 2)]);
    assert_no_match!("/b/A", "ab");

    assert_match!("/a$/", "a\n", "a");
    assert_no_match!("/a$/D", "a\n");
    assert_no_match!(r"/a\z/", "a\n");
    assert_match!(r"/a\Z/", "a\n", "a");
    assert_no_match!("/a$/", "a\nb");
    assert_matches!("/$/", "a\n", [(1, 1), (2, 2)]);

    assert_match!("/^b/m", "a\nb", "b");
    assert_match!("/a$/m", "a\nb", "a");
    assert_matches!("/^/m", "a\nb", [(0, 0), (2, 2)]);
    assert_matches!("/^/m", "a\n", [(0, 0)]);

    assert_match!(r"/\bfoo\b/", "a foo b", "foo");
    assert_no_match!(r"/\bfoo\b/", "afoo");
    assert_match!(r"/\Boo/", "foo", "oo");
}

#[test]
fn case_insensitive() {
    assert_match!("/hello/i", "say HeLLo", "HeLLo");
    assert_match!("/[a-c]+/i", "xBCa", "BCa");
    assert_match!("/[^a-c]/i", "ABx", "x");
    assert_match!("/(?i)k(?-i)k/", "Kk", "Kk");
    assert_no_match!("/(?i)k(?-i)k/", "KK");
    assert_match!("/a(?i:b)c/", "aBc", "aBc");
    assert_no_match!("/a(?i:b)c/", "aBC");
    assert_match!("/(?i:a)b/", "xAb", "Ab");
    assert_no_match!("/(?i:a)b/", "AB");
    assert_match!("/a(?i)b/", "AbaB", "aB");
    assert_no_match!("/a(?i)b/", "Ab");
    assert_match!("/(?i)ab(?-i)cd(?i)ef/", "ABcdEf", "ABcdEf");
    assert_no_match!("/(?i)ab(?-i)cd(?i)ef/", "ABCDEF");
    assert_match!("/σ+/iu", "ΣσΣ", "ΣσΣ");
}

#[test]
fn character_classes() {
    assert_match!(r"/\d+/", "ab123c", "123");
    assert_match!(r"/\D+/", "12ab3", "ab");
    assert_match!(r"/\s+/", "a \t\nb", " \t\n");
    assert_match!(r"/[[:alpha:]]+/", "12abc1", "abc");
    assert_match!(r"/[[:^digit:]x]+/", "12ab3", "ab");
    assert_match!(r"/[\w.-]+@\w+/", "mail: john.doe-1@host", "john.doe-1@host");
    assert_match!(r"/[]a]+/", "x]a]", "]a]");

    // Without the `u` flag classes are ASCII only.
    assert_match!(r"/\w+/", "héllo", "h");
    assert_match!(r"/\w+/u", "héllo", "héllo");
    assert_match!(r"/[[:alpha:]]+/u", "1héllo", "héllo");

    assert_match!(r"/\p{Greek}+/u", "abc αβγ", "αβγ");
    assert_match!(r"/\p{Lu}/", "abcDef", "D");
    assert_match!(r"/\PL+/", "ab12cd", "12");
    assert_match!(r"/\p{^L}+/", "ab12cd", "12");
}

#[test]
fn extended_mode() {
    let flags = Flags { extended: true, ..Flags::default() };
    let re = Regexp::new("a b  # comment\n c", flags).unwrap();
    assert_eq!(find_all(&re, "abc", true), vec![(0, 3)]);
    assert_eq!(find_all(&re, "a b c", true), Vec::<(usize, usize)>::new());

    let re = Regexp::new(r"a\ b [ ]", flags).unwrap();
    assert_eq!(find_all(&re, "a b ", true), vec![(0, 4)]);
}

#[test]
fn phone_number() {
    assert_groups!(
        r"/^(\d{3})-(\d{4})$/",
        "555-1234",
        [Some("555-1234"), Some("555"), Some("1234")]
    );
    assert_no_match!(r"/^(\d{3})-(\d{4})$/", "55-1234");
}

#[test]
fn exec() {
    let re = Regexp::parse("/b+/").unwrap();
    let subject = Text::from("abb");
    let mut state = re.new_match_state(&subject);

    assert_eq!(state.exec(0).unwrap(), None);
    assert_eq!(state.start(0), None);
    assert_eq!(state.exec(1).unwrap(), Some(1));
    assert_eq!(state.end(0), Some(3));
    assert_eq!(state.substring(1, 3), "bb");
    assert_eq!(state.exec(4).unwrap(), None);
}

#[test]
fn reset() {
    let re = Regexp::parse("/a/").unwrap();
    let subject = Text::from("aa");
    let mut state = re.new_match_state(&subject);

    assert!(state.find().unwrap());
    assert!(state.find().unwrap());
    assert!(!state.find().unwrap());

    state.reset();
    assert!(state.find().unwrap());
    assert_eq!(state.start(0), Some(0));
}

#[test]
fn subjects() {
    let re = Regexp::parse(r"/caf\xe9/").unwrap();

    let latin1: &[u8] = b"un caf\xe9";
    let mut state = re.new_match_state(latin1);
    assert!(state.find().unwrap());
    assert_eq!(state.start(0), Some(3));
    assert_eq!(state.group(0).as_deref(), Some("café"));

    let chars: Vec<char> = "café!".chars().collect();
    let mut state = re.new_match_state(&chars);
    assert!(state.find().unwrap());
    assert_eq!(state.end(0), Some(4));
    assert_eq!(state.subject().len(), 5);
}

#[test]
fn determinism() {
    let patterns = [
        r"(a|ab)(c|bcd)(d*)",
        r"(\w+)\s*=\s*(\w*)",
        r"((a)|b)+",
        r"(?:(a)|(b))*?c",
        r"(x)?y(?(1)z)",
    ];
    let subjects = ["abcd", "key = value; k=", "abab", "ababc", "xyz y"];

    for pattern in patterns {
        let re = Regexp::new(pattern, Flags::default()).unwrap();
        for subject in subjects {
            let first = groups(&re, subject);
            let second = groups(&re, subject);
            assert_eq!(first, second, "{} on {:?}", pattern, subject);
        }
    }
}

#[test]
fn hints_do_not_change_results() {
    let patterns = [
        "abc",
        "a|b|c",
        "x*y",
        "(?:foo|bar)+baz",
        "[a-c]x|d",
        "^ab",
        r"\Aab",
        "(?i)hello",
        "a?b?c",
        r"(a)\1",
        "(?=b)b",
        "(?<=a)b",
        "$",
        "^",
        "(?m)^b",
        r"\bfoo",
        "é+",
        "fo{2,}",
        r"(?:ab)++c",
        r"(a)?(?(1)b|c)",
        "(?i)k(?-i)k",
        "a(?i)b",
        "(?i:a)b",
        "(?i:x)Y",
        "(?m)^a$",
        "(?U)a+b",
        "a+?b",
    ];
    let subjects = [
        "",
        "abc",
        "xxxyabcabc",
        "foobarbaz barfoobaz",
        "cx dx ax",
        "aab\nbab",
        "HeLLo hello",
        "ccbbaa",
        "aabab",
        "ééé foo",
        "foooo fo",
        "ababababc",
        "KK Kk kK kk",
        "Ab aB AB ab",
        "xY XY xy Xy",
        "a\nb\na\n",
        "aaab AAAB",
    ];

    for flags in ["", "i", "m", "U", "A", "mU"] {
        let flags = Flags::parse(flags).unwrap();
        for pattern in patterns {
            let re = Regexp::new(pattern, flags).unwrap();
            for subject in subjects {
                assert_eq!(
                    find_all(&re, subject, true),
                    find_all(&re, subject, false),
                    "`{}` ({}) on {:?}",
                    pattern,
                    flags,
                    subject
                );
            }
        }
    }
}

#[test]
fn step_limit() {
    let limits = Limits::default().max_steps(Some(10_000));
    let re = Regexp::parse("/(a+)+b/").unwrap().with_limits(limits);
    let subject = Text::from("a".repeat(28).as_str());
    let mut state = re.new_match_state(&subject);

    assert_eq!(
        state.find().unwrap_err(),
        MatchError::StepLimitExceeded { limit: 10_000 }
    );

    // The same limit is enough for a simple search.
    let re = Regexp::parse("/a+b/").unwrap().with_limits(limits);
    let subject = Text::from("aaab");
    assert!(re.is_match(&subject).unwrap());
}

#[test]
fn depth_limit() {
    let limits = Limits::default().max_depth(50);
    let re = Regexp::parse("/(?:ab)*/").unwrap().with_limits(limits);
    let subject = Text::from("ab".repeat(100).as_str());
    let mut state = re.new_match_state(&subject);

    assert_eq!(
        state.find().unwrap_err(),
        MatchError::DepthLimitExceeded { limit: 50 }
    );

    // With the default limits the same search succeeds.
    let re = Regexp::parse("/(?:ab)*/").unwrap();
    let mut state = re.new_match_state(&subject);
    assert!(state.find().unwrap());
    assert_eq!(state.end(0), Some(200));

    // Single character repetitions don't use any depth.
    let re = Regexp::parse("/a*b/").unwrap().with_limits(limits);
    let subject = Text::from(format!("{}b", "a".repeat(1000)).as_str());
    assert!(re.is_match(&subject).unwrap());
}

#[test]
fn default_depth_limit_fits_thread_stack() {
    // Threads are spawned with the default stack size, which is the
    // smallest one the default depth limit must fit in.
    std::thread::spawn(|| {
        let re = Regexp::parse("/(?:ab)*/").unwrap();
        let depth = DEFAULT_MAX_DEPTH;

        let subject = Text::from("ab".repeat(depth / 2 - 8).as_str());
        assert!(re.is_match(&subject).unwrap());

        let subject = Text::from("ab".repeat(depth).as_str());
        assert_eq!(
            re.is_match(&subject).unwrap_err(),
            MatchError::DepthLimitExceeded { limit: depth }
        );

        // Groups inside the loop add frames of their own.
        let re = Regexp::parse("/(?:(a)(?=b)(b))*/").unwrap();
        assert_eq!(
            re.is_match(&subject).unwrap_err(),
            MatchError::DepthLimitExceeded { limit: depth }
        );
    })
    .join()
    .unwrap();
}

#[test]
fn shared_between_threads() {
    let re = Arc::new(Regexp::parse(r"/(\d+)-(\d+)/").unwrap());

    std::thread::scope(|s| {
        for i in 0..4 {
            let re = re.clone();
            s.spawn(move || {
                let text = format!("id {}-{}", i, i * 10);
                let subject = Text::from(text.as_str());
                let mut state = re.new_match_state(&subject);
                assert!(state.find().unwrap());
                assert_eq!(state.group(2), Some((i * 10).to_string()));
            });
        }
    });
}
