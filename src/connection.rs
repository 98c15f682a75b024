use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use tracing::trace;

use crate::error::SqliteDispatchError;
use crate::spec::ConnectionSpec;

/// One open engine handle plus the mutual-exclusion primitive that gates it.
///
/// The mutex is the only thing enforcing the engine's single-caller
/// constraint: whoever holds the guard returned by [`lock`](Self::lock) owns
/// the connection for the duration of one logical operation. The handle
/// itself stays open across operations; it closes when the pool drops the
/// last reference.
pub struct LockingConnection {
    conn: Mutex<Connection>,
}

impl LockingConnection {
    /// Open the engine handle for a specification.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the database file cannot be opened.
    pub(crate) fn open(spec: &ConnectionSpec) -> Result<Self, SqliteDispatchError> {
        let conn = Connection::open(spec.database_path())?;
        trace!(path = %spec.database_path().display(), "opened engine handle");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection for one logical operation.
    ///
    /// Blocks the calling thread until the connection is free; the returned
    /// guard releases on every exit path, including a panic in the guarded
    /// code (the mutex does not poison). Call this from worker threads, not
    /// from an async context.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl std::fmt::Debug for LockingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockingConnection")
            .field("locked", &self.conn.is_locked())
            .finish()
    }
}
