use pgquery::ParseMode;

use super::{print_json, Session};
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

pub fn handle_fingerprint(
    session: &Session,
    input: &Input,
    mode: Option<ParseMode>,
    json: bool,
) -> Result<(), CliError> {
    let mut options = session.parse_options();
    if let Some(mode) = mode {
        options.mode = mode;
    }
    let fingerprint = session
        .parser
        .fingerprint(&input.sql, options)
        .map_err(|e| {
            convert_query_error(
                e,
                ErrorContext {
                    name: &input.name,
                    source: &input.sql,
                },
            )
        })?;

    if json {
        print_json(&fingerprint)
    } else {
        println!("{}", fingerprint);
        Ok(())
    }
}
