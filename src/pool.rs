use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::connection::LockingConnection;
use crate::error::SqliteDispatchError;
use crate::spec::ConnectionSpec;

/// Registry of one [`LockingConnection`] per connection string.
///
/// All async operations against the same connection string resolve to the
/// same connection, whose lock serializes them. The pool is constructed
/// explicitly and shared via `Arc` by whoever composes the application; it
/// is not a hidden process-wide singleton.
///
/// ```rust
/// use std::sync::Arc;
/// use sqlite_dispatch::prelude::*;
///
/// let pool = Arc::new(ConnectionPool::new());
/// let db = AsyncDatabase::new(pool, "file::memory:?cache=shared");
/// # let _ = db;
/// ```
#[derive(Debug, Default)]
pub struct ConnectionPool {
    entries: Mutex<HashMap<String, Arc<LockingConnection>>>,
}

impl ConnectionPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the connection for a specification, opening it on first use.
    ///
    /// Creation happens under the pool-wide lock, so concurrent first-use
    /// calls for the same key open exactly one engine handle. A failed open
    /// inserts nothing: the next call retries from scratch.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if a new connection cannot be opened.
    pub fn get_connection(
        &self,
        spec: &ConnectionSpec,
    ) -> Result<Arc<LockingConnection>, SqliteDispatchError> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(spec.key()) {
            return Ok(Arc::clone(existing));
        }

        let conn = Arc::new(LockingConnection::open(spec)?);
        entries.insert(spec.key().to_owned(), Arc::clone(&conn));
        debug!(key = spec.key(), "pooled new connection");
        Ok(conn)
    }

    /// Close every pooled connection and clear the registry.
    ///
    /// Assumes a quiescent pool: an operation holding a connection's lock at
    /// reset time keeps its connection alive through its own `Arc` until the
    /// operation finishes, but subsequent operations open a fresh handle.
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        debug!(count = entries.len(), "resetting connection pool");
        entries.clear();
    }

    /// Host-lifecycle hook: close open connections while suspended.
    pub fn application_suspended(&self) {
        self.reset();
    }

    /// Number of pooled connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
