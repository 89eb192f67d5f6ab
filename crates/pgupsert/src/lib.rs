//! # pgupsert
//!
//! Derive column metadata from Rust structs and synthesize PostgreSQL
//! single-row upsert statements.
//!
//! ## Features
//!
//! - **Static introspection**: `#[derive(Record)]` records each field's column
//!   name, conflict-key marker and nesting at compile time
//! - **One statement shape**: `INSERT ... ON CONFLICT(keys) DO NOTHING | DO UPDATE SET ...`
//! - **Named parameters**: placeholders are `:column`, bound by name at execution
//! - **Transaction-friendly**: prepare on anything implementing [`GenericClient`]
//! - **Cancellable**: store preparation observes an ambient [`Cancellation`]
//!
//! ## Example
//!
//! ```ignore
//! use pgupsert::{Record, UpsertStatementBuilder, cancellation};
//!
//! #[derive(Record)]
//! pub struct Comment {
//!     #[orm(key)]
//!     pub id: uuid::Uuid,
//!     pub created_at: chrono::DateTime<chrono::Utc>,
//!     pub description: String,
//! }
//!
//! let stmt = UpsertStatementBuilder::new().build("comment", &comment, &[])?;
//! assert_eq!(
//!     stmt.sql(),
//!     "INSERT INTO comment (id,created_at,description) VALUES(:id,:created_at,:description) \
//!      ON CONFLICT(id) DO UPDATE SET (created_at,description)=(excluded.created_at,excluded.description)"
//! );
//!
//! let (_handle, cancel) = cancellation();
//! let prepared = stmt.prepare(&client, &cancel).await?;
//! prepared.execute(&client, &comment).await?;
//! ```

pub mod cancel;
pub mod client;
pub mod columns;
pub mod error;
pub mod keepalive;
pub mod named;
pub mod naming;
pub mod prelude;
pub mod record;
pub mod upsert;

pub use cancel::{CancelHandle, Cancellation, cancellation};
pub use client::GenericClient;
pub use columns::{ColumnDescriptor, ColumnIntrospector, ColumnSet};
pub use error::{UpsertError, UpsertResult};
pub use keepalive::{KeepAliveClient, KeepAliveConfig};
pub use naming::NameMapper;
pub use record::{FieldKind, FieldMeta, Record, RecordShape, UpsertPolicy};
pub use upsert::{ConflictAction, PreparedUpsert, UpsertStatement, UpsertStatementBuilder};

// Referenced by `#[derive(Record)]` output.
pub use tokio_postgres::types::ToSql;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{PoolConfig, create_pool, create_pool_with_config, create_pool_with_tls};

// Re-export derive macro
#[cfg(feature = "derive")]
pub use pgupsert_derive::Record;
