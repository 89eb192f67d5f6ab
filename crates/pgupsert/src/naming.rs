//! Field-name to column-name conventions.
//!
//! A [`NameMapper`] is applied to every field that does not carry an explicit
//! `#[orm(column = "...")]` override. It must be deterministic and total.

use heck::ToSnakeCase;

/// Maps a field identifier to its default column name.
pub type NameMapper = fn(&str) -> String;

/// `CreatedAt` -> `created_at`, `computedColumn3` -> `computed_column3`.
///
/// Idempotent on identifiers that are already snake_case.
pub fn snake_case(ident: &str) -> String {
    ident.to_snake_case()
}

/// `CreatedAt` -> `createdat`.
pub fn lowercase(ident: &str) -> String {
    ident.to_lowercase()
}

/// Use the field identifier unchanged.
pub fn identity(ident: &str) -> String {
    ident.to_string()
}

/// Case-insensitive column name comparison.
pub(crate) fn eq_column(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

pub(crate) fn contains_column<S: AsRef<str>>(list: &[S], column: &str) -> bool {
    list.iter().any(|c| eq_column(c.as_ref(), column))
}
