use super::Session;
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

pub fn handle_scan(session: &Session, input: &Input) -> Result<(), CliError> {
    let scanned = session.parser.scan(&input.sql).map_err(|e| {
        convert_query_error(
            e,
            ErrorContext {
                name: &input.name,
                source: &input.sql,
            },
        )
    })?;

    for token in &scanned.tokens {
        println!(
            "{:>5}..{:<5} {:<24} {}",
            token.start,
            token.end,
            format!("{:?}", token.keyword_kind()),
            token.text(&input.sql).unwrap_or("?")
        );
    }
    Ok(())
}
