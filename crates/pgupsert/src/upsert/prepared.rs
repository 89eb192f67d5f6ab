use std::fmt;
use std::marker::PhantomData;

use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;

use crate::client::GenericClient;
use crate::error::{UpsertError, UpsertResult};
use crate::record::Record;

/// An upsert statement prepared on a specific connection.
///
/// Prepared statements are per-connection: execute it on the connection (or
/// transaction) it was prepared on.
pub struct PreparedUpsert<T> {
    statement: Statement,
    sql: String,
    param_names: Vec<String>,
    field_indices: Vec<usize>,
    _record: PhantomData<fn(&T)>,
}

impl<T> PreparedUpsert<T> {
    pub(super) fn new(
        statement: Statement,
        sql: String,
        param_names: Vec<String>,
        field_indices: Vec<usize>,
    ) -> Self {
        Self {
            statement,
            sql,
            param_names,
            field_indices,
            _record: PhantomData,
        }
    }

    /// The positional SQL that was prepared.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in `$n` order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

impl<T: Record> PreparedUpsert<T> {
    /// Bind `record`'s values by column name and execute. Returns affected rows.
    pub async fn execute<C: GenericClient>(&self, conn: &C, record: &T) -> UpsertResult<u64> {
        let values = record.values();
        let params = bind_params(&values, &self.field_indices, &self.param_names)?;
        conn.execute_prepared(&self.statement, &params).await
    }
}

pub(super) fn bind_params<'a>(
    values: &[&'a (dyn ToSql + Sync)],
    field_indices: &[usize],
    param_names: &[String],
) -> UpsertResult<Vec<&'a (dyn ToSql + Sync)>> {
    field_indices
        .iter()
        .zip(param_names)
        .map(|(&idx, name)| {
            values.get(idx).copied().ok_or_else(|| {
                UpsertError::bind(format!(
                    "record has no value for ':{name}' (field index {idx}, {} values)",
                    values.len()
                ))
            })
        })
        .collect()
}

impl<T> fmt::Debug for PreparedUpsert<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedUpsert")
            .field("sql", &self.sql)
            .field("param_names", &self.param_names)
            .finish()
    }
}
