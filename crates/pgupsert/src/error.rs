//! Error types for pgupsert

use thiserror::Error;

/// Result type alias for pgupsert operations
pub type UpsertResult<T> = Result<T, UpsertError>;

/// Error types for column introspection, statement synthesis and execution
#[derive(Debug, Error)]
pub enum UpsertError {
    /// The record type (or a flattened field) is not record-like, or its
    /// columns cannot be derived unambiguously.
    #[error("Type shape error for `{type_name}`: {message}")]
    TypeShape { type_name: String, message: String },

    /// The store rejected the synthesized statement, or preparation was
    /// cancelled before it completed.
    #[error("Store prepare error for `{sql}`: {source}")]
    StorePrepare {
        sql: String,
        #[source]
        source: Box<UpsertError>,
    },

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A named placeholder could not be resolved to a record value
    #[error("Bind error: {0}")]
    Bind(String),

    /// The ambient cancellation fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl UpsertError {
    /// Create a type shape error for the given type.
    pub fn type_shape(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeShape {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Wrap a store-side failure with the SQL that was being prepared.
    pub fn store_prepare(sql: impl Into<String>, source: UpsertError) -> Self {
        Self::StorePrepare {
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Create a bind error
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }

    /// Check if this is a type shape error
    pub fn is_type_shape(&self) -> bool {
        matches!(self, Self::TypeShape { .. })
    }

    /// Check if this is a store prepare error
    pub fn is_store_prepare(&self) -> bool {
        matches!(self, Self::StorePrepare { .. })
    }

    /// Check if this error (or the cause of a prepare error) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::StorePrepare { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The underlying `tokio_postgres` error, looking through prepare wrappers.
    pub fn as_db_error(&self) -> Option<&tokio_postgres::Error> {
        match self {
            Self::Query(err) => Some(err),
            Self::StorePrepare { source, .. } => source.as_db_error(),
            _ => None,
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for UpsertError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
