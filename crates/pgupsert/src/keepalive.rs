//! Long-lived connections with a periodic liveness probe.
//!
//! [`connect`] opens a `NoTls` connection, pings it once before returning and
//! then keeps pinging it in the background until the supplied
//! [`Cancellation`] fires. Probe failures are logged, not returned: the
//! prober keeps running so a transient outage does not kill it.
//!
//! ```ignore
//! let (handle, cancel) = pgupsert::cancellation();
//! let conn = pgupsert::keepalive::connect(&database_url, cancel).await?;
//! UpsertStatementBuilder::new()
//!     .upsert(&conn, &Cancellation::never(), "comment", &comment, &[])
//!     .await?;
//! handle.cancel();
//! ```

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};

use crate::cancel::Cancellation;
use crate::client::GenericClient;
use crate::error::{UpsertError, UpsertResult};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_PROBE_SQL: &str = "SELECT 1";
const DEFAULT_LABEL: &str = "postgres";

/// Keep-alive configuration.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Delay between background probes. The first probe runs at connect time.
    pub interval: Duration,
    /// Statement sent as the probe.
    pub probe_sql: String,
    /// Name attached to probe log events.
    pub label: String,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            probe_sql: DEFAULT_PROBE_SQL.to_string(),
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl KeepAliveConfig {
    /// Create config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probe interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the probe statement.
    pub fn probe_sql(mut self, sql: impl Into<String>) -> Self {
        self.probe_sql = sql.into();
        self
    }

    /// Set the log label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A connection whose liveness is probed in the background.
///
/// Derefs to [`tokio_postgres::Client`]. Dropping it stops the prober and the
/// connection driver.
pub struct KeepAliveClient {
    client: Arc<Client>,
    driver: JoinHandle<()>,
    prober: JoinHandle<()>,
}

impl KeepAliveClient {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether the background prober has stopped (cancelled or aborted).
    pub fn is_probing_stopped(&self) -> bool {
        self.prober.is_finished()
    }
}

impl Deref for KeepAliveClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

impl Drop for KeepAliveClient {
    fn drop(&mut self) {
        self.prober.abort();
        self.driver.abort();
    }
}

impl std::fmt::Debug for KeepAliveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAliveClient")
            .field("closed", &self.client.is_closed())
            .field("probing", &!self.prober.is_finished())
            .finish()
    }
}

impl GenericClient for KeepAliveClient {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> UpsertResult<u64> {
        GenericClient::execute(&*self.client, sql, params).await
    }

    async fn prepare_statement(&self, sql: &str) -> UpsertResult<Statement> {
        GenericClient::prepare_statement(&*self.client, sql).await
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> UpsertResult<u64> {
        GenericClient::execute_prepared(&*self.client, stmt, params).await
    }
}

/// Connect with default [`KeepAliveConfig`].
pub async fn connect(database_url: &str, cancel: Cancellation) -> UpsertResult<KeepAliveClient> {
    connect_with_config(database_url, cancel, KeepAliveConfig::default()).await
}

/// Connect, ping once, then probe every `config.interval` until `cancel` fires.
pub async fn connect_with_config(
    database_url: &str,
    cancel: Cancellation,
    config: KeepAliveConfig,
) -> UpsertResult<KeepAliveClient> {
    if database_url.trim().is_empty() {
        return Err(UpsertError::Connection(
            "DB not initialized: empty connection string".to_string(),
        ));
    }

    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| UpsertError::Connection(e.to_string()))?;

    let (client, connection) = pg_config
        .connect(NoTls)
        .await
        .map_err(|e| UpsertError::Connection(e.to_string()))?;

    let label = config.label.clone();
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(target: "pgupsert.keepalive", label = %label, error = %e, "connection closed");
        }
    });

    let client = Arc::new(client);
    if let Err(e) = ping(&client, &config.probe_sql).await {
        driver.abort();
        return Err(e);
    }

    tracing::debug!(
        target: "pgupsert.keepalive",
        label = %config.label,
        interval = ?config.interval,
        "connected"
    );

    let probe_client = Arc::clone(&client);
    let probe_sql = config.probe_sql.clone();
    let prober = tokio::spawn(probe_loop(config.interval, cancel, config.label, move || {
        let client = Arc::clone(&probe_client);
        let sql = probe_sql.clone();
        async move { ping(&client, &sql).await }
    }));

    Ok(KeepAliveClient {
        client,
        driver,
        prober,
    })
}

async fn ping(client: &Client, probe_sql: &str) -> UpsertResult<()> {
    client.simple_query(probe_sql).await?;
    Ok(())
}

/// Run `probe` every `interval` (first run one interval from now) until
/// `cancel` fires. Failures are logged and the loop continues.
async fn probe_loop<F, Fut>(interval: Duration, cancel: Cancellation, label: String, mut probe: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = UpsertResult<()>>,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(target: "pgupsert.keepalive", label = %label, "keep-alive stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = probe().await {
                    tracing::error!(target: "pgupsert.keepalive", label = %label, error = %e, "keep-alive probe failed");
                }
            }
        }
    }
}
