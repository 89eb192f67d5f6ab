//! Generic client trait for store preparation and execution.

use crate::error::UpsertResult;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Upsert statements can be prepared and executed on a direct connection, a
/// pooled connection or inside a caller-managed transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = UpsertResult<u64>> + Send;

    /// Prepare a statement on this connection.
    ///
    /// Prepared statements are **per-connection** and must not be used across connections.
    fn prepare_statement(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = UpsertResult<Statement>> + Send;

    /// Execute a prepared statement and return affected row count.
    fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = UpsertResult<u64>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    async fn prepare_statement(&self, sql: &str) -> UpsertResult<Statement> {
        Ok(tokio_postgres::Client::prepare(self, sql).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        Ok(tokio_postgres::Client::execute(self, stmt, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    async fn prepare_statement(&self, sql: &str) -> UpsertResult<Statement> {
        Ok(tokio_postgres::Transaction::prepare(self, sql).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, stmt, params).await?)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        GenericClient::execute(&**self, sql, params).await
    }

    async fn prepare_statement(&self, sql: &str) -> UpsertResult<Statement> {
        GenericClient::prepare_statement(&**self, sql).await
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        GenericClient::execute_prepared(&**self, stmt, params).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::ClientWrapper {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        GenericClient::execute(&**self, sql, params).await
    }

    async fn prepare_statement(&self, sql: &str) -> UpsertResult<Statement> {
        GenericClient::prepare_statement(&**self, sql).await
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        GenericClient::execute_prepared(&**self, stmt, params).await
    }
}
