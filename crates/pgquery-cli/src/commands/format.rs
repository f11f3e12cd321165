use pgquery::Error;

use super::{print_json, Session};
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

/// Parses the input and prints it back pretty-printed with the `[deparse]`
/// options, keeping comments when the library can locate them.
pub fn handle_format(session: &Session, input: &Input) -> Result<(), CliError> {
    let ctx = ErrorContext {
        name: &input.name,
        source: &input.sql,
    };
    let tree = session
        .parser
        .parse(&input.sql, session.parse_options())
        .map_err(|e| convert_query_error(e, ctx))?;

    let comments = match session.parser.extract_comments(&input.sql) {
        Ok(comments) => comments,
        Err(Error::Unsupported { symbol }) => {
            log::warn!("{} is not available; comments will be dropped", symbol);
            Vec::new()
        }
        Err(e) => return Err(convert_query_error(e, ctx)),
    };

    let formatted = session
        .parser
        .deparse_with_comments(&tree, &session.config.deparse, &comments)
        .map_err(|e| convert_query_error(e, ctx))?;
    if formatted.ends_with('\n') {
        print!("{}", formatted);
    } else {
        println!("{}", formatted);
    }
    Ok(())
}

pub fn handle_comments(session: &Session, input: &Input) -> Result<(), CliError> {
    let comments = session.parser.extract_comments(&input.sql).map_err(|e| {
        convert_query_error(
            e,
            ErrorContext {
                name: &input.name,
                source: &input.sql,
            },
        )
    })?;
    print_json(&comments)
}
