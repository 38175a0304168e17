use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use backre::{MatchState, Regexp, Text};
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use walkdir::WalkDir;
use yansi::Color::{Cyan, Green, Red};
use yansi::Paint;

use crate::commands::{compile_pattern, pattern_arg};
use crate::config::Config;
use crate::help;

#[rustfmt::skip]
pub fn search() -> Command {
    super::command("search")
        .about("Search for a pattern in files")
        .long_about(help::SEARCH_LONG_HELP)
        .arg(pattern_arg())
        .arg(
            arg!([PATH])
                .help("Files or directories to search, stdin is read if none is given")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append)
        )
        // Keep options sorted alphabetically by their long name.
        .arg(
            arg!(-c --"count")
                .help("Print only the number of matching lines per file")
        )
        .arg(
            arg!(-g --"groups")
                .help("Print the text captured by each group")
        )
        .arg(
            arg!(-n --"line-number")
                .help("Prefix each line with its line number")
        )
        .arg(
            arg!(-o --"only-matching")
                .help("Print only the matching text, one match per line")
        )
        .arg(
            arg!(-r --"recursive")
                .help("Search directories recursively")
        )
}

/// How results are printed.
#[derive(Clone, Copy)]
struct OutputOptions {
    count: bool,
    groups: bool,
    only_matching: bool,
    line_numbers: bool,
    show_path: bool,
}

pub fn exec_search(args: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    let pattern = args.get_one::<String>("PATTERN").unwrap();
    let regexp = compile_pattern(pattern, config.limits)?;

    let paths: Vec<PathBuf> = args
        .get_many::<PathBuf>("PATH")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    let recursive = args.get_flag("recursive");

    let mut options = OutputOptions {
        count: args.get_flag("count"),
        groups: args.get_flag("groups"),
        only_matching: args.get_flag("only-matching"),
        line_numbers: args.get_flag("line-number")
            || config.search.line_numbers,
        show_path: paths.len() > 1 || recursive,
    };

    let mut out = io::stdout().lock();

    if paths.is_empty() {
        options.show_path = false;
        let mut input = Vec::new();
        io::stdin()
            .read_to_end(&mut input)
            .context("can not read from stdin")?;
        return search_text(&regexp, &decode(&input), None, options, &mut out);
    }

    for path in paths {
        if path.is_dir() {
            if !recursive {
                bail!(
                    "`{}` is a directory, use --recursive for searching it",
                    path.display()
                );
            }
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.with_context(|| {
                    format!("can not walk `{}`", path.display())
                })?;
                if entry.file_type().is_file() {
                    search_file(&regexp, entry.path(), options, &mut out)?;
                }
            }
        } else {
            search_file(&regexp, &path, options, &mut out)?;
        }
    }

    Ok(())
}

fn search_file<W: Write>(
    regexp: &Regexp,
    path: &Path,
    options: OutputOptions,
    out: &mut W,
) -> anyhow::Result<()> {
    let data = fs::read(path)
        .with_context(|| format!("can not read `{}`", path.display()))?;

    search_text(regexp, &decode(&data), Some(path), options, out)
        .with_context(|| format!("error searching `{}`", path.display()))
}

// Files are expected to be UTF-8, but invalid sequences are replaced
// instead of producing an error.
fn decode(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn search_text<W: Write>(
    regexp: &Regexp,
    text: &str,
    path: Option<&Path>,
    options: OutputOptions,
    out: &mut W,
) -> anyhow::Result<()> {
    let prefix = |line_number: usize| {
        let mut prefix = String::new();
        if let Some(path) = path.filter(|_| options.show_path) {
            prefix.push_str(&format!("{}:", path.display().paint(Cyan)));
        }
        if options.line_numbers {
            prefix.push_str(&format!("{}:", line_number.paint(Green)));
        }
        prefix
    };

    let mut matching_lines = 0;

    for (i, line) in text.lines().enumerate() {
        let subject = Text::from(line);
        let mut state = regexp.new_match_state(&subject);

        let mut matches = Vec::new();
        while state.find()? {
            matches.push(collect_groups(&state));
        }

        if matches.is_empty() {
            continue;
        }

        matching_lines += 1;

        if options.count {
            continue;
        }

        if options.only_matching || options.groups {
            for groups in matches {
                writeln!(out, "{}{}", prefix(i + 1), groups[0].text)?;
                if options.groups {
                    for (n, group) in groups.iter().enumerate().skip(1) {
                        write_group(out, regexp, n, group)?;
                    }
                }
            }
        } else {
            writeln!(out, "{}{}", prefix(i + 1), highlight(&subject, &matches))?;
        }
    }

    if options.count {
        match path.filter(|_| options.show_path) {
            Some(path) => {
                writeln!(out, "{}:{}", path.display().paint(Cyan), matching_lines)?
            }
            None => writeln!(out, "{}", matching_lines)?,
        }
    }

    Ok(())
}

/// Bounds and text of a capture group. `None` bounds means that the group
/// didn't participate in the match.
struct Group {
    bounds: Option<(usize, usize)>,
    text: String,
}

fn collect_groups(state: &MatchState<'_, Text>) -> Vec<Group> {
    (0..state.group_count())
        .map(|i| match (state.start(i), state.end(i)) {
            (Some(start), Some(end)) => Group {
                bounds: Some((start, end)),
                text: state.substring(start, end),
            },
            _ => Group { bounds: None, text: String::new() },
        })
        .collect()
}

fn write_group<W: Write>(
    out: &mut W,
    regexp: &Regexp,
    n: usize,
    group: &Group,
) -> io::Result<()> {
    let label = match regexp.group_name(n) {
        Some(name) => format!("{} ({})", n, name),
        None => n.to_string(),
    };
    match group.bounds {
        Some(_) => writeln!(out, "  {}: {}", label, group.text),
        None => writeln!(out, "  {}: <unset>", label),
    }
}

// Returns the line with every match highlighted.
fn highlight(subject: &Text, matches: &[Vec<Group>]) -> String {
    let mut result = String::new();
    let mut pos = 0;
    for groups in matches {
        if let Some((start, end)) = groups[0].bounds {
            result.extend(&subject[pos..start]);
            result.push_str(&groups[0].text.as_str().paint(Red).bold().to_string());
            pos = end;
        }
    }
    result.extend(&subject[pos..]);
    result
}
