//! Connection pool helpers.
//!
//! Pooled clients implement [`GenericClient`](crate::GenericClient), so upserts
//! can be prepared directly on `pool.get().await?`. Remember that a
//! [`PreparedUpsert`](crate::PreparedUpsert) belongs to the pooled connection
//! it was prepared on.

use crate::error::{UpsertError, UpsertResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

const DEFAULT_MAX_SIZE: usize = 16;

/// Pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of open connections.
    pub max_size: usize,
    /// How a returned connection is checked before reuse.
    pub recycling_method: RecyclingMethod,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            recycling_method: RecyclingMethod::Fast,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Run a test query on every checkout instead of trusting the socket.
    pub fn verified(mut self) -> Self {
        self.recycling_method = RecyclingMethod::Verified;
        self
    }
}

/// Create a `NoTls` pool with default settings.
///
/// ```ignore
/// let pool = pgupsert::create_pool(&database_url)?;
/// let client = pool.get().await?;
/// builder.upsert(&client, &cancel, "comment", &comment, &[]).await?;
/// ```
pub fn create_pool(database_url: &str) -> UpsertResult<Pool> {
    create_pool_with_config(database_url, PoolConfig::default())
}

/// Create a `NoTls` pool with explicit settings.
pub fn create_pool_with_config(database_url: &str, config: PoolConfig) -> UpsertResult<Pool> {
    create_pool_with_tls(database_url, tokio_postgres::NoTls, config)
}

/// Create a pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(database_url: &str, tls: T, config: PoolConfig) -> UpsertResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    if database_url.trim().is_empty() {
        return Err(UpsertError::Connection(
            "DB not initialized: empty connection string".to_string(),
        ));
    }

    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| UpsertError::Connection(e.to_string()))?;

    let manager_config = ManagerConfig {
        recycling_method: config.recycling_method,
    };
    let mgr = Manager::from_config(pg_config, tls, manager_config);

    Pool::builder(mgr)
        .max_size(config.max_size)
        .build()
        .map_err(|e| UpsertError::Pool(e.to_string()))
}
