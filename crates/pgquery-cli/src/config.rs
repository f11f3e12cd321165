//! `pgquery.toml`: defaults for the parse, split and deparse commands.
//!
//! ```toml
//! library = "/usr/local/lib/libpg_query.so"
//!
//! [parse]
//! mode = "default"
//! flags = ["disable_backslash_quote"]
//!
//! [split]
//! algorithm = "parser"
//!
//! [deparse]
//! pretty_print = true
//! indent_size = 4
//! ```

use std::path::{Path, PathBuf};

use pgquery::{DeparseOptions, ParseMode, ParseOptions, ParserFlags, SplitAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{convert_io_error, CliError};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pgquery.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the libpg_query shared library.
    pub library: Option<PathBuf>,
    pub parse: ParseSection,
    pub split: SplitSection,
    pub deparse: DeparseOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseSection {
    pub mode: ParseMode,
    pub flags: Vec<FlagName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitSection {
    pub algorithm: SplitAlgorithm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagName {
    DisableBackslashQuote,
    DisableStandardConformingStrings,
    DisableEscapeStringWarning,
}

impl FlagName {
    fn flag(self) -> ParserFlags {
        match self {
            FlagName::DisableBackslashQuote => ParserFlags::DISABLE_BACKSLASH_QUOTE,
            FlagName::DisableStandardConformingStrings => {
                ParserFlags::DISABLE_STANDARD_CONFORMING_STRINGS
            }
            FlagName::DisableEscapeStringWarning => ParserFlags::DISABLE_ESCAPE_STRING_WARNING,
        }
    }
}

impl Config {
    /// Loads `explicit` if given (it must exist), else `pgquery.toml` from
    /// `dir` if present, else the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    log::debug!("No {} in {}, using defaults", DEFAULT_CONFIG_FILE, dir.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| convert_io_error(e, path.clone(), "reading configuration"))?;
        let config = Self::from_toml(&text).map_err(|source| CliError::ConfigError {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn parse_options(&self) -> ParseOptions {
        let flags = self
            .parse
            .flags
            .iter()
            .fold(ParserFlags::empty(), |acc, name| acc | name.flag());
        ParseOptions::new(self.parse.mode, flags)
    }
}
