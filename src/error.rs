use thiserror::Error;

/// Error type for all crate operations.
///
/// Engine failures pass through transparently: a caller awaiting an async
/// operation sees the same `rusqlite::Error` it would have seen calling the
/// engine synchronously.
#[derive(Debug, Error)]
pub enum SqliteDispatchError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The worker task running the operation failed to complete (panic or
    /// runtime shutdown). The operation's outcome is unknown.
    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),
}
