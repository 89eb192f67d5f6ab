use std::collections::HashSet;

use syn::{Error, LitStr, Result};

pub(crate) fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a comma-separated column list such as `"id, tenant_id"`.
///
/// Duplicates are compared case-insensitively, matching how the runtime
/// compares policy columns.
pub(crate) fn parse_column_list(lit: &LitStr, what: &str) -> Result<Vec<String>> {
    let raw = lit.value();
    let cols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if cols.is_empty() {
        return Err(Error::new(
            lit.span(),
            format!("{what} must specify at least one column"),
        ));
    }

    let mut seen = HashSet::<String>::new();
    for col in &cols {
        if !is_valid_sql_ident(col) {
            return Err(Error::new(
                lit.span(),
                format!(
                    "{what} contains invalid SQL identifier '{col}' (expected [A-Za-z_][A-Za-z0-9_]*)"
                ),
            ));
        }
        if !seen.insert(col.to_lowercase()) {
            return Err(Error::new(
                lit.span(),
                format!("{what} contains duplicate column '{col}'"),
            ));
        }
    }

    Ok(cols)
}

/// Parse a single column override such as `column = "body"`.
pub(crate) fn parse_column(lit: &LitStr, what: &str) -> Result<String> {
    let column = lit.value().trim().to_string();
    if column.is_empty() {
        return Err(Error::new(lit.span(), format!("{what} must not be empty")));
    }
    if !is_valid_sql_ident(&column) {
        return Err(Error::new(
            lit.span(),
            format!("{what} '{column}' is not a valid SQL identifier (expected [A-Za-z_][A-Za-z0-9_]*)"),
        ));
    }
    Ok(column)
}
