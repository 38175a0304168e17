use backre::Limits;
use clap::{ArgMatches, Command};

use crate::commands::{compile_pattern, pattern_arg};
use crate::help;

pub fn debug() -> Command {
    super::command("debug")
        .about("Print the compiled form of a pattern")
        .long_about(help::DEBUG_LONG_HELP)
        .arg(pattern_arg())
}

pub fn exec_debug(args: &ArgMatches) -> anyhow::Result<()> {
    let pattern = args.get_one::<String>("PATTERN").unwrap();
    let regexp = compile_pattern(pattern, Limits::default())?;

    println!("{}", regexp);
    print!("{}", regexp.dump());

    Ok(())
}
