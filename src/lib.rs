//! Async facade over the synchronous SQLite engine.
//!
//! All operations against one database file funnel through a single pooled
//! connection guarded by a lock, so the engine never sees interleaved
//! callers; each async operation runs on a blocking worker thread and
//! resolves to the engine's own result or error.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlite_dispatch::prelude::*;
//!
//! # async fn demo() -> Result<(), SqliteDispatchError> {
//! let pool = Arc::new(ConnectionPool::new());
//! let db = AsyncDatabase::new(pool, "app.db");
//!
//! db.execute_batch("CREATE TABLE IF NOT EXISTS note (id INTEGER PRIMARY KEY, body TEXT)")
//!     .await?;
//! let n = db
//!     .execute(
//!         "INSERT INTO note (body) VALUES (?)",
//!         &[RowValues::Text("hello".into())],
//!     )
//!     .await?;
//! assert_eq!(n, 1);
//! # Ok(()) }
//! ```

pub mod connection;
pub mod error;
pub mod facade;
pub mod ops;
pub mod params;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod results;
pub mod schema;
pub mod spec;
pub mod types;

pub use connection::LockingConnection;
pub use error::SqliteDispatchError;
pub use facade::{AsyncDatabase, DbSession};
pub use pool::ConnectionPool;
pub use query::AsyncTableQuery;
pub use spec::ConnectionSpec;
pub use types::RowValues;
