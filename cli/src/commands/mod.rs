mod debug;
mod search;

pub use debug::*;
pub use search::*;
pub use test::*;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use backre::{Limits, Regexp};
use clap::{arg, command, crate_authors, value_parser, Command};

use crate::{commands, help, APP_HELP_TEMPLATE};

pub fn command(name: &'static str) -> Command {
    Command::new(name).help_template(
        r#"{about-with-newline}
{usage-heading}
  {usage}

{all-args}
"#,
    )
}

pub fn cli() -> Command {
    command!()
        .author(crate_authors!("\n")) // requires `cargo` feature
        .arg_required_else_help(true)
        .arg(
            arg!(-C --config <CONFIG_FILE> "Config file")
                .value_parser(existing_path_parser)
                .long_help(help::CONFIG_FILE),
        )
        .help_template(APP_HELP_TEMPLATE)
        .subcommand_required(true)
        .subcommands(vec![
            commands::search(),
            commands::test(),
            commands::debug(),
        ])
}

/// The `<PATTERN>` argument shared by all commands.
fn pattern_arg() -> clap::Arg {
    arg!(<PATTERN>)
        .help("Delimited regular expression (e.g: /foo/i)")
        .long_help(help::PATTERN_LONG_HELP)
        .value_parser(value_parser!(String))
}

/// Compiles a delimited pattern given in the command line.
fn compile_pattern(pattern: &str, limits: Limits) -> anyhow::Result<Regexp> {
    let regexp = Regexp::parse(pattern)
        .with_context(|| format!("invalid pattern `{}`", pattern))?;
    Ok(regexp.with_limits(limits))
}

/// Parses a path and makes sure that it exists.
fn existing_path_parser(input: &str) -> Result<PathBuf, anyhow::Error> {
    let path = PathBuf::from(input);
    if path.try_exists()? {
        Ok(path)
    } else {
        Err(anyhow!("file not found"))
    }
}
