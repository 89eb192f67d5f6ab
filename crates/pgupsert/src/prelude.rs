//! Convenient imports for typical `pgupsert` usage.
//!
//! ```ignore
//! use pgupsert::prelude::*;
//! ```

pub use crate::{
    Cancellation, GenericClient, Record, UpsertError, UpsertResult, UpsertStatementBuilder,
    cancellation,
};

#[cfg(feature = "pool")]
pub use crate::{PoolConfig, create_pool, create_pool_with_config};
