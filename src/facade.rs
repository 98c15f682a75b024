//! Async facade over the pooled, locked connection.
//!
//! Every method follows one protocol: move the work to a blocking worker
//! thread, resolve the pooled connection for this database's specification,
//! take the connection's lock, run the synchronous engine operation, and
//! surface the `Result` to the awaiting caller. Errors from the engine pass
//! through unmodified; a worker panic surfaces as
//! [`SqliteDispatchError::Task`].

use std::panic;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::task;
use tracing::debug;

use crate::error::SqliteDispatchError;
use crate::ops;
use crate::pool::ConnectionPool;
use crate::query::AsyncTableQuery;
use crate::results::ResultSet;
use crate::schema::{CreateTablesResult, TableModel, TableSchema};
use crate::spec::ConnectionSpec;
use crate::types::RowValues;

/// Schedule one locked operation on a worker thread.
///
/// The pool lookup and the lock acquisition both happen on the worker, never
/// on the caller's async context; the caller suspends until the closure
/// finishes.
pub(crate) async fn dispatch<R, F>(
    pool: Arc<ConnectionPool>,
    spec: ConnectionSpec,
    op: F,
) -> Result<R, SqliteDispatchError>
where
    F: FnOnce(&mut Connection) -> Result<R, SqliteDispatchError> + Send + 'static,
    R: Send + 'static,
{
    task::spawn_blocking(move || {
        let conn = pool.get_connection(&spec)?;
        let mut guard = conn.lock();
        op(&mut guard)
    })
    .await
    .map_err(|e| SqliteDispatchError::Task(e.to_string()))?
}

/// Asynchronous handle to one database.
///
/// Cheap to clone; clones share the pool and therefore the same underlying
/// connection and lock. Concurrent operations through any number of handles
/// with the same connection string execute one at a time; operations against
/// different connection strings run in parallel.
#[derive(Debug, Clone)]
pub struct AsyncDatabase {
    pool: Arc<ConnectionPool>,
    spec: ConnectionSpec,
}

impl AsyncDatabase {
    /// Bind a connection string to a pool. No I/O happens until the first
    /// operation.
    pub fn new(pool: Arc<ConnectionPool>, connection_string: impl Into<String>) -> Self {
        Self {
            pool,
            spec: ConnectionSpec::new(connection_string),
        }
    }

    /// Like [`new`](Self::new), resolving relative connection strings
    /// against an application data root.
    pub fn with_data_root(
        pool: Arc<ConnectionPool>,
        connection_string: impl Into<String>,
        root: impl AsRef<std::path::Path>,
    ) -> Self {
        Self {
            pool,
            spec: ConnectionSpec::with_data_root(connection_string, root),
        }
    }

    #[must_use]
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    async fn with_connection<R, F>(&self, op: F) -> Result<R, SqliteDispatchError>
    where
        F: FnOnce(&mut Connection) -> Result<R, SqliteDispatchError> + Send + 'static,
        R: Send + 'static,
    {
        dispatch(Arc::clone(&self.pool), self.spec.clone(), op).await
    }

    /// Create the table for one model.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the DDL fails.
    pub async fn create_table<T: TableModel>(&self) -> Result<usize, SqliteDispatchError> {
        self.with_connection(|conn| ops::create_table(conn, T::schema()))
            .await
    }

    /// Create several tables under one lock acquisition, aggregating the
    /// per-table outcome by table name.
    ///
    /// # Errors
    ///
    /// Stops at the first failing descriptor and returns its engine error.
    pub async fn create_tables(
        &self,
        schemas: &[&'static TableSchema],
    ) -> Result<CreateTablesResult, SqliteDispatchError> {
        let schemas = schemas.to_vec();
        self.with_connection(move |conn| {
            let mut result = CreateTablesResult::default();
            for schema in schemas {
                let affected = ops::create_table(conn, schema)?;
                result.results.insert(schema.name, affected);
            }
            Ok(result)
        })
        .await
    }

    /// Drop the table for one model.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the DDL fails.
    pub async fn drop_table<T: TableModel>(&self) -> Result<usize, SqliteDispatchError> {
        self.with_connection(|conn| ops::drop_table(conn, T::schema()))
            .await
    }

    /// Insert one row.
    ///
    /// # Errors
    ///
    /// Constraint violations and other engine failures pass through.
    pub async fn insert<T: TableModel>(&self, item: T) -> Result<usize, SqliteDispatchError> {
        self.with_connection(move |conn| ops::insert(conn, &item))
            .await
    }

    /// Insert many rows atomically under one lock acquisition.
    ///
    /// # Errors
    ///
    /// On any failure the whole batch rolls back and the engine error is
    /// returned.
    pub async fn insert_all<T: TableModel>(
        &self,
        items: Vec<T>,
    ) -> Result<usize, SqliteDispatchError> {
        self.with_connection(move |conn| ops::insert_all(conn, &items))
            .await
    }

    /// Update one row, matched by primary key.
    ///
    /// # Errors
    ///
    /// Fails if the model has no primary key column, or on engine failure.
    pub async fn update<T: TableModel>(&self, item: T) -> Result<usize, SqliteDispatchError> {
        self.with_connection(move |conn| ops::update(conn, &item))
            .await
    }

    /// Delete one row, matched by primary key.
    ///
    /// # Errors
    ///
    /// Fails if the model has no primary key column, or on engine failure.
    pub async fn delete<T: TableModel>(&self, item: T) -> Result<usize, SqliteDispatchError> {
        self.with_connection(move |conn| ops::delete(conn, &item))
            .await
    }

    /// Fetch one row by primary key, resolving a miss to `None` instead of
    /// an error.
    ///
    /// # Errors
    ///
    /// Engine and row-mapping failures pass through; a missing row is not an
    /// error.
    pub async fn find<T: TableModel>(
        &self,
        pk: RowValues,
    ) -> Result<Option<T>, SqliteDispatchError> {
        self.with_connection(move |conn| ops::find(conn, &pk)).await
    }

    /// Fetch one row by primary key.
    ///
    /// # Errors
    ///
    /// A missing row surfaces as the engine's `QueryReturnedNoRows`.
    pub async fn get<T: TableModel>(&self, pk: RowValues) -> Result<T, SqliteDispatchError> {
        self.with_connection(move |conn| ops::get(conn, &pk)).await
    }

    /// Execute one DML/DDL statement with positional parameters.
    ///
    /// # Errors
    ///
    /// Engine failures pass through.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqliteDispatchError> {
        debug!(sql = %sql, "dispatching statement");
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(move |conn| ops::execute(conn, &sql, &params))
            .await
    }

    /// Execute several statements inside one transaction.
    ///
    /// # Errors
    ///
    /// Engine failures pass through; the batch rolls back.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), SqliteDispatchError> {
        debug!(sql = %sql, "dispatching batch");
        let sql = sql.to_owned();
        self.with_connection(move |conn| ops::execute_batch(conn, &sql))
            .await
    }

    /// Run a query that yields a single value.
    ///
    /// # Errors
    ///
    /// An empty result surfaces as the engine's `QueryReturnedNoRows`.
    pub async fn execute_scalar<T>(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<T, SqliteDispatchError>
    where
        T: rusqlite::types::FromSql + Send + 'static,
    {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(move |conn| ops::execute_scalar(conn, &sql, &params))
            .await
    }

    /// Run an arbitrary query and materialize all rows.
    ///
    /// # Errors
    ///
    /// Engine failures pass through.
    pub async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqliteDispatchError> {
        debug!(sql = %sql, "dispatching query");
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(move |conn| ops::query(conn, &sql, &params))
            .await
    }

    /// Run an arbitrary query and map each row through a model.
    ///
    /// # Errors
    ///
    /// Engine and row-mapping failures pass through.
    pub async fn query_as<T: TableModel>(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<T>, SqliteDispatchError> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(move |conn| ops::query_as(conn, &sql, &params))
            .await
    }

    /// Run `action` inside a transaction, under a single lock acquisition.
    ///
    /// The callback gets a [`DbSession`] bound to the already-locked
    /// connection; operations on the session need no further locking.
    /// Commits when the callback returns `Ok`, rolls back and re-raises its
    /// error otherwise. A panic in the callback also rolls back before
    /// propagating, so the pooled connection never stays inside an abandoned
    /// transaction. Resolving a *new* connection for the same database from
    /// inside the callback deadlocks against the held lock; use the session
    /// instead.
    ///
    /// # Errors
    ///
    /// The callback's error after a successful rollback; a rollback failure
    /// takes precedence and may mask the callback's error.
    pub async fn run_in_transaction<R, F>(&self, action: F) -> Result<R, SqliteDispatchError>
    where
        F: FnOnce(&mut DbSession<'_>) -> Result<R, SqliteDispatchError> + Send + 'static,
        R: Send + 'static,
    {
        self.with_connection(move |conn| {
            conn.execute_batch("BEGIN")?;
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                let mut session = DbSession { conn };
                action(&mut session)
            }));
            match outcome {
                Ok(Ok(value)) => {
                    conn.execute_batch("COMMIT")?;
                    Ok(value)
                }
                Ok(Err(err)) => {
                    conn.execute_batch("ROLLBACK")?;
                    Err(err)
                }
                Err(payload) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    panic::resume_unwind(payload)
                }
            }
        })
        .await
    }

    /// Start a deferred query against one table.
    ///
    /// Construction is pure: no connection is locked and no I/O happens
    /// until a terminal operation on the returned builder runs.
    #[must_use]
    pub fn table<T: TableModel>(&self) -> AsyncTableQuery<T> {
        AsyncTableQuery::new(Arc::clone(&self.pool), self.spec.clone())
    }
}

/// Synchronous operations on a connection already locked by
/// [`AsyncDatabase::run_in_transaction`].
///
/// Everything a session does joins the surrounding transaction.
pub struct DbSession<'c> {
    conn: &'c mut Connection,
}

impl DbSession<'_> {
    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn create_table<T: TableModel>(&mut self) -> Result<usize, SqliteDispatchError> {
        ops::create_table(self.conn, T::schema())
    }

    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn insert<T: TableModel>(&mut self, item: &T) -> Result<usize, SqliteDispatchError> {
        ops::insert(self.conn, item)
    }

    /// Batch insert joining the surrounding transaction.
    ///
    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn insert_many<T: TableModel>(&mut self, items: &[T]) -> Result<usize, SqliteDispatchError> {
        ops::insert_many(self.conn, items)
    }

    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn update<T: TableModel>(&mut self, item: &T) -> Result<usize, SqliteDispatchError> {
        ops::update(self.conn, item)
    }

    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn delete<T: TableModel>(&mut self, item: &T) -> Result<usize, SqliteDispatchError> {
        ops::delete(self.conn, item)
    }

    /// # Errors
    ///
    /// Engine and row-mapping failures pass through; a missing row is not an
    /// error.
    pub fn find<T: TableModel>(&mut self, pk: &RowValues) -> Result<Option<T>, SqliteDispatchError> {
        ops::find(self.conn, pk)
    }

    /// # Errors
    ///
    /// A missing row surfaces as the engine's `QueryReturnedNoRows`.
    pub fn get<T: TableModel>(&mut self, pk: &RowValues) -> Result<T, SqliteDispatchError> {
        ops::get(self.conn, pk)
    }

    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, SqliteDispatchError> {
        ops::execute(self.conn, sql, params)
    }

    /// # Errors
    ///
    /// An empty result surfaces as the engine's `QueryReturnedNoRows`.
    pub fn execute_scalar<T: rusqlite::types::FromSql>(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<T, SqliteDispatchError> {
        ops::execute_scalar(self.conn, sql, params)
    }

    /// # Errors
    ///
    /// Engine failures pass through.
    pub fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqliteDispatchError> {
        ops::query(self.conn, sql, params)
    }

    /// # Errors
    ///
    /// Engine and row-mapping failures pass through.
    pub fn query_as<T: TableModel>(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<T>, SqliteDispatchError> {
        ops::query_as(self.conn, sql, params)
    }
}
