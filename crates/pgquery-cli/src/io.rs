use std::io::Read;
use std::path::PathBuf;

use crate::error::{convert_io_error, CliError};

/// SQL text read from a file or stdin, with the name used in diagnostics.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub sql: String,
}

pub fn read_input(path: Option<PathBuf>) -> Result<Input, CliError> {
    match path {
        Some(path) => {
            let sql = std::fs::read_to_string(&path)
                .map_err(|e| convert_io_error(e, path.clone(), "reading SQL file"))?;
            Ok(Input {
                name: path.display().to_string(),
                sql,
            })
        }
        None => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .map_err(|e| convert_io_error(e, PathBuf::from("<stdin>"), "reading stdin"))?;
            Ok(Input {
                name: "<stdin>".to_string(),
                sql,
            })
        }
    }
}
