use std::path::PathBuf;

use pgquery::{LibPgQuery, ParseOptions, Parser};

use crate::config::Config;
use crate::error::CliError;

pub mod fingerprint;
pub mod format;
pub mod normalize;
pub mod parse;
pub mod scan;
pub mod split;

/// The loaded library plus the configuration every command reads from.
pub struct Session {
    pub parser: Parser<&'static LibPgQuery>,
    pub config: Config,
}

impl Session {
    /// `--library` wins over the config file, which wins over `$PGQUERY_LIBRARY`.
    pub fn open(config: Config, library: Option<PathBuf>) -> Result<Self, CliError> {
        let library = match library.or_else(|| config.library.clone()) {
            Some(path) => LibPgQuery::install_global(path)?,
            None => LibPgQuery::global()?,
        };
        log::debug!("Using libpg_query at {:?}", library.path());
        Ok(Self {
            parser: Parser::new(library),
            config,
        })
    }

    pub fn parse_options(&self) -> ParseOptions {
        self.config.parse_options()
    }
}

/// Pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
