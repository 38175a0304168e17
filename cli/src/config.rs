use std::path::Path;

use backre::Limits;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration for the CLI.
#[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Resource limits applied to every search.
    #[serde(default)]
    pub limits: Limits,
    /// Configuration for the `search` command.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Configuration for the `search` command.
#[derive(Deserialize, Serialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Prefix each line with its line number, like `--line-number` does.
    pub line_numbers: bool,
    /// Highlight matches with colors when the output is a terminal.
    pub color: bool,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig { line_numbers: false, color: true }
    }
}

/// Load a config file from a given path. Path must contain a valid TOML file
/// or this function will propagate the error.
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<Config, Box<figment::Error>> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    Ok(config)
}
