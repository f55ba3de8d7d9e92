//! Identifier and literal quoting
//!
//! Names go through [`quote_identifier`] / [`qualified_name`], values go
//! through [`quote_literal`]. Nothing else in the crate formats user input
//! into SQL text.

use crate::error::{Error, Result};

/// Quote an identifier: wrap in double quotes, double embedded double quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal: wrap in single quotes, double embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote each part independently and join with `.`.
///
/// An empty slice is a caller bug and returns [`Error::EmptyQualifiedName`].
pub fn qualified_name<S: AsRef<str>>(parts: &[S]) -> Result<String> {
    if parts.is_empty() {
        return Err(Error::EmptyQualifiedName);
    }
    Ok(join_quoted(parts))
}

/// Quote and join a list of literals, e.g. `('a', 'b')` contents.
pub fn literal_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| quote_literal(v.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote and join a list of identifiers, e.g. a column list.
pub fn identifier_list<S: AsRef<str>>(idents: &[S]) -> String {
    idents
        .iter()
        .map(|i| quote_identifier(i.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn join_quoted<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| quote_identifier(p.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}
