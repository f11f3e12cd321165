use pgquery::ParseMode;
use serde::Serialize;

use super::{print_json, Session};
use crate::error::{convert_query_error, CliError, ErrorContext};
use crate::io::Input;

#[derive(Debug, Serialize)]
struct StatementInfo<'a> {
    location: usize,
    length: usize,
    node_tag: Option<u32>,
    kind: Option<&'static str>,
    text: &'a str,
}

pub fn handle_parse(
    session: &Session,
    input: &Input,
    mode: Option<ParseMode>,
    statements_only: bool,
) -> Result<(), CliError> {
    let mut options = session.parse_options();
    if let Some(mode) = mode {
        options.mode = mode;
    }
    let ctx = ErrorContext {
        name: &input.name,
        source: &input.sql,
    };

    if !statements_only {
        let tree = session
            .parser
            .parse_json(&input.sql, options)
            .map_err(|e| convert_query_error(e, ctx))?;
        return print_json(&tree);
    }

    let tree = session
        .parser
        .parse(&input.sql, options)
        .map_err(|e| convert_query_error(e, ctx))?;
    let statements = tree
        .stmts
        .iter()
        .map(|stmt| {
            let location = usize::try_from(stmt.stmt_location).unwrap_or(0);
            // A zero length runs to the end of the input.
            let length = match usize::try_from(stmt.stmt_len).unwrap_or(0) {
                0 => input.sql.len().saturating_sub(location),
                len => len,
            };
            StatementInfo {
                location,
                length,
                node_tag: stmt.node_tag(),
                kind: stmt.node().and_then(|node| node.name()),
                text: input
                    .sql
                    .get(location..location + length)
                    .map(str::trim)
                    .unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();
    print_json(&statements)
}
