mod commands;
mod config;
mod help;

use std::path::PathBuf;
use std::{io, panic, process};

use anyhow::Context;
use crossterm::tty::IsTty;
use yansi::Color::Red;
use yansi::Paint;

use crate::commands::cli;
use crate::config::{load_config_from_file, Config};

const APP_HELP_TEMPLATE: &str = r#"bre {version}, search text with backtracking regular expressions.

{author-with-newline}
{before-help}{usage-heading}
  {usage}

{all-args}{after-help}
"#;

const EXIT_ERROR: i32 = 1;
const CONFIG_FILE: &str = ".backre.toml";

fn main() -> anyhow::Result<()> {
    // Enable support for ANSI escape codes in Windows. In other platforms
    // this is a no-op.
    if let Err(err) = enable_ansi_support::enable_ansi_support() {
        println!("could not enable ANSI support: {}", err)
    }

    #[cfg(feature = "logging")]
    env_logger::init();

    // If stdout is not a tty (for example, because it was redirected to a
    // file) turn off colors. This way you can redirect the output to a file
    // without ANSI escape codes messing up the file content.
    if !io::stdout().is_tty() {
        yansi::disable();
    }

    let args = cli().get_matches_from(wild::args());

    // Set our custom panic hook that kills the process when some panic
    // occurs in a thread.
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(EXIT_ERROR);
    }));

    let result = load_config(args.get_one::<PathBuf>("config")).and_then(
        |config| {
            if !config.search.color {
                yansi::disable();
            }
            match args.subcommand() {
                Some(("search", args)) => commands::exec_search(args, &config),
                Some(("test", args)) => commands::exec_test(args, &config),
                Some(("debug", args)) => commands::exec_debug(args),
                _ => unreachable!(),
            }
        },
    );

    if let Err(err) = result {
        if let Some(source) = err.source() {
            eprintln!("{} {}: {}", "error:".paint(Red).bold(), err, source);
        } else {
            eprintln!("{} {}", "error:".paint(Red).bold(), err);
        }
        process::exit(EXIT_ERROR);
    }

    Ok(())
}

/// Loads the config file given with `--config`. If no config file was
/// given, `${HOME}/.backre.toml` is used if it exists and is valid.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return load_config_from_file(path).with_context(|| {
            format!("invalid config file `{}`", path.display())
        });
    }

    Ok(match home::home_dir() {
        Some(home_path) if !home_path.as_os_str().is_empty() => {
            load_config_from_file(&home_path.join(CONFIG_FILE))
                .unwrap_or_default()
        }
        _ => Config::default(),
    })
}
