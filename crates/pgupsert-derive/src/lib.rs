//! Derive macros for pgupsert
//!
//! Provides `#[derive(Record)]`, which turns a struct's field list into the
//! static column metadata consumed by `pgupsert::ColumnIntrospector`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;
mod sql_ident;

/// Derive the `Record` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use pgupsert::Record;
///
/// #[derive(Record)]
/// #[orm(skip_columns = "computed_column3")]
/// pub struct Comment {
///     #[orm(key)]
///     pub id: uuid::Uuid,
///     pub created_at: chrono::DateTime<chrono::Utc>,
///     #[orm(column = "body")]
///     pub description: String,
///     #[orm(skip)]
///     pub computed_column2: f64,
///     pub computed_column3: f64,
/// }
/// ```
///
/// # Struct attributes
///
/// - `#[orm(conflict_keys = "a, b")]` - Conflict target columns. Overrides every
///   field-level `key` marker.
/// - `#[orm(skip_columns = "c, d")]` - Columns never emitted for this type.
///
/// # Field attributes
///
/// - `#[orm(column = "name")]` - Use `name` verbatim instead of the mapped field name
/// - `#[orm(key)]` - Mark the column as part of the conflict target
/// - `#[orm(skip)]` - Never persist this field
/// - `#[orm(flatten)]` - Splice the columns of a nested `Record` in place
///
/// Fields without `pub` visibility are not persisted.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
