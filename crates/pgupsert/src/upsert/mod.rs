//! Upsert statement synthesis.
//!
//! [`UpsertStatementBuilder`] turns a record's [`ColumnSet`], a table name and
//! a call-level skip list into a single `INSERT ... ON CONFLICT` statement:
//!
//! ```text
//! INSERT INTO comment (id,created_at,description) VALUES(:id,:created_at,:description)
//!     ON CONFLICT(id) DO UPDATE SET (created_at,description)=(excluded.created_at,excluded.description)
//! ```
//!
//! The conflict action depends on how many non-key columns remain:
//!
//! | update columns | action                                   |
//! |----------------|------------------------------------------|
//! | 0              | `DO NOTHING`                             |
//! | 1              | `DO UPDATE SET c=excluded.c`             |
//! | 2+             | `DO UPDATE SET (a,b)=(excluded.a,excluded.b)` |
//!
//! Without any conflict key the statement is a plain `INSERT`.
//!
//! # Example
//!
//! ```ignore
//! use pgupsert::{UpsertStatementBuilder, cancellation};
//!
//! let (_handle, cancel) = cancellation();
//! let builder = UpsertStatementBuilder::new();
//! let stmt = builder
//!     .prepare(&client, &cancel, "comment", &comment, &["computed_column"])
//!     .await?;
//! stmt.execute(&client, &comment).await?;
//! ```

mod prepared;

pub use prepared::PreparedUpsert;

use std::fmt;
use std::marker::PhantomData;

use crate::cancel::Cancellation;
use crate::client::GenericClient;
use crate::columns::{ColumnIntrospector, ColumnSet};
use crate::error::{UpsertError, UpsertResult};
use crate::named::{self, PositionalSql};
use crate::naming::{self, NameMapper};
use crate::record::Record;

/// Shape of the `ON CONFLICT` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// No conflict key: plain `INSERT`, no conflict clause.
    Insert,
    /// `ON CONFLICT (...) DO NOTHING`
    DoNothing,
    /// `ON CONFLICT (...) DO UPDATE SET c=excluded.c`
    UpdateColumn,
    /// `ON CONFLICT (...) DO UPDATE SET (a,b)=(excluded.a,excluded.b)`
    UpdateRow,
}

/// Synthesizes upsert statements for [`Record`] types.
///
/// Stateless: every call introspects the record type again.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertStatementBuilder {
    introspector: ColumnIntrospector,
}

impl UpsertStatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with a custom introspector.
    pub fn with_introspector(introspector: ColumnIntrospector) -> Self {
        Self { introspector }
    }

    /// Builder whose introspector uses a custom naming convention.
    pub fn with_name_mapper(name_mapper: NameMapper) -> Self {
        Self::with_introspector(ColumnIntrospector::with_name_mapper(name_mapper))
    }

    pub fn introspector(&self) -> &ColumnIntrospector {
        &self.introspector
    }

    /// Build the upsert statement for `record`'s type.
    ///
    /// Only the type of `record` matters here; its values are bound when the
    /// prepared statement is executed.
    pub fn build<T: Record>(
        &self,
        table: &str,
        _record: &T,
        extra_skip: &[&str],
    ) -> UpsertResult<UpsertStatement<T>> {
        self.build_for::<T>(table, extra_skip)
    }

    /// Build the upsert statement for `T` without an instance at hand.
    pub fn build_for<T: Record>(
        &self,
        table: &str,
        extra_skip: &[&str],
    ) -> UpsertResult<UpsertStatement<T>> {
        let all = self.introspector.introspect::<T>()?;
        let columns = all.without(extra_skip);

        let conflict_keys: Vec<String> = columns
            .conflict_key_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let update_columns: Vec<String> = columns
            .iter()
            .map(|c| c.column_name.as_str())
            .filter(|c| !naming::contains_column(&conflict_keys, c))
            .filter(|c| !naming::contains_column(extra_skip, c))
            .map(str::to_string)
            .collect();

        let action = if conflict_keys.is_empty() {
            ConflictAction::Insert
        } else {
            match update_columns.len() {
                0 => ConflictAction::DoNothing,
                1 => ConflictAction::UpdateColumn,
                _ => ConflictAction::UpdateRow,
            }
        };

        let sql = render_sql(table, &columns, &conflict_keys, &update_columns, action);

        tracing::debug!(
            target: "pgupsert.sql",
            table,
            action = ?action,
            sql = %sql,
            "synthesized upsert statement"
        );

        Ok(UpsertStatement {
            table: table.to_string(),
            sql,
            columns,
            conflict_keys,
            update_columns,
            action,
            _record: PhantomData,
        })
    }

    /// Build the statement and prepare it on `conn`.
    ///
    /// Fails with [`UpsertError::StorePrepare`] if the store rejects the SQL or
    /// `cancel` fires first.
    pub async fn prepare<T, C>(
        &self,
        conn: &C,
        cancel: &Cancellation,
        table: &str,
        record: &T,
        extra_skip: &[&str],
    ) -> UpsertResult<PreparedUpsert<T>>
    where
        T: Record,
        C: GenericClient,
    {
        self.build(table, record, extra_skip)?
            .prepare(conn, cancel)
            .await
    }

    /// Build, prepare and execute in one call. Returns affected rows.
    pub async fn upsert<T, C>(
        &self,
        conn: &C,
        cancel: &Cancellation,
        table: &str,
        record: &T,
        extra_skip: &[&str],
    ) -> UpsertResult<u64>
    where
        T: Record,
        C: GenericClient,
    {
        self.prepare(conn, cancel, table, record, extra_skip)
            .await?
            .execute(conn, record)
            .await
    }
}

fn render_sql(
    table: &str,
    columns: &ColumnSet,
    conflict_keys: &[String],
    update_columns: &[String],
    action: ConflictAction,
) -> String {
    let names = columns.all_names();
    let placeholders: Vec<String> = names.iter().map(|c| format!(":{c}")).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES({})",
        table,
        names.join(","),
        placeholders.join(",")
    );

    let suffix = match action {
        ConflictAction::Insert => return sql,
        ConflictAction::DoNothing => "NOTHING".to_string(),
        ConflictAction::UpdateColumn => {
            let col = &update_columns[0];
            format!("UPDATE SET {col}=excluded.{col}")
        }
        ConflictAction::UpdateRow => format!(
            "UPDATE SET ({})=({})",
            update_columns.join(","),
            excluded(update_columns).join(",")
        ),
    };

    sql.push_str(&format!(
        " ON CONFLICT({}) DO {}",
        conflict_keys.join(","),
        suffix
    ));
    sql
}

fn excluded(columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| format!("excluded.{c}")).collect()
}

/// A synthesized upsert statement for record type `T`.
///
/// Placeholders are named after their columns (`:created_at`), which is the
/// contract the binding step relies on.
pub struct UpsertStatement<T> {
    table: String,
    sql: String,
    columns: ColumnSet,
    conflict_keys: Vec<String>,
    update_columns: Vec<String>,
    action: ConflictAction,
    _record: PhantomData<fn(&T)>,
}

impl<T> UpsertStatement<T> {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL text with `:column` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Inserted columns, after call-level skips.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn conflict_keys(&self) -> &[String] {
        &self.conflict_keys
    }

    /// Columns assigned from `excluded` on conflict.
    pub fn update_columns(&self) -> &[String] {
        &self.update_columns
    }

    pub fn conflict_action(&self) -> ConflictAction {
        self.action
    }

    /// SQL rewritten to PostgreSQL `$n` parameters.
    pub fn to_positional(&self) -> PositionalSql {
        named::compile(&self.sql)
    }
}

impl<T: Record> UpsertStatement<T> {
    /// Prepare this statement on `conn`.
    pub async fn prepare<C: GenericClient>(
        self,
        conn: &C,
        cancel: &Cancellation,
    ) -> UpsertResult<PreparedUpsert<T>> {
        let positional = self.to_positional();
        let field_indices = self.resolve_bindings(&positional.names)?;

        if cancel.is_cancelled() {
            return Err(UpsertError::store_prepare(
                positional.sql,
                UpsertError::Cancelled,
            ));
        }

        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpsertError::Cancelled),
            res = conn.prepare_statement(&positional.sql) => res,
        };

        match prepared {
            Ok(statement) => Ok(PreparedUpsert::new(
                statement,
                positional.sql,
                positional.names,
                field_indices,
            )),
            Err(err) => Err(UpsertError::store_prepare(positional.sql, err)),
        }
    }

    fn resolve_bindings(&self, names: &[String]) -> UpsertResult<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .find(|c| c.column_name == *name)
                    .map(|c| c.field_index)
                    .ok_or_else(|| {
                        UpsertError::bind(format!(
                            "placeholder ':{name}' does not match any column of the record"
                        ))
                    })
            })
            .collect()
    }
}

impl<T> fmt::Debug for UpsertStatement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpsertStatement")
            .field("table", &self.table)
            .field("sql", &self.sql)
            .field("conflict_keys", &self.conflict_keys)
            .field("update_columns", &self.update_columns)
            .field("action", &self.action)
            .finish()
    }
}

impl<T> Clone for UpsertStatement<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            sql: self.sql.clone(),
            columns: self.columns.clone(),
            conflict_keys: self.conflict_keys.clone(),
            update_columns: self.update_columns.clone(),
            action: self.action,
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Display for UpsertStatement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests;
