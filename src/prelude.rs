//! Convenient imports for common functionality.

pub use crate::connection::LockingConnection;
pub use crate::error::SqliteDispatchError;
pub use crate::facade::{AsyncDatabase, DbSession};
pub use crate::params::{bind_params, to_sqlite_values};
pub use crate::pool::ConnectionPool;
pub use crate::query::AsyncTableQuery;
pub use crate::results::{DbRow, ResultSet};
pub use crate::schema::{ColumnDef, CreateTablesResult, TableModel, TableSchema};
pub use crate::spec::ConnectionSpec;
pub use crate::types::RowValues;
