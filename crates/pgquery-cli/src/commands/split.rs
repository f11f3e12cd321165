use pgquery::SplitAlgorithm;

use super::{print_json, Session};
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

pub fn handle_split(
    session: &Session,
    input: &Input,
    algorithm: Option<SplitAlgorithm>,
    spans: bool,
) -> Result<(), CliError> {
    let algorithm = algorithm.unwrap_or(session.config.split.algorithm);
    let ctx = ErrorContext {
        name: &input.name,
        source: &input.sql,
    };

    if spans {
        let spans = session
            .parser
            .split_spans(&input.sql, algorithm)
            .map_err(|e| convert_query_error(e, ctx))?;
        return print_json(&spans);
    }

    let statements = session
        .parser
        .split(&input.sql, algorithm)
        .map_err(|e| convert_query_error(e, ctx))?;
    log::info!("Split {} statements with the {:?} algorithm", statements.len(), algorithm);
    for statement in statements {
        println!("{};", statement.trim());
    }
    Ok(())
}
