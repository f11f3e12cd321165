use super::Session;
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

pub fn handle_normalize(session: &Session, input: &Input, utility: bool) -> Result<(), CliError> {
    let normalized = if utility {
        session.parser.normalize_utility(&input.sql)
    } else {
        session.parser.normalize(&input.sql)
    }
    .map_err(|e| {
        convert_query_error(
            e,
            ErrorContext {
                name: &input.name,
                source: &input.sql,
            },
        )
    })?;
    println!("{}", normalized);
    Ok(())
}
