use std::collections::HashMap;

use crate::error::SqliteDispatchError;
use crate::results::DbRow;
use crate::types::RowValues;

/// One column of a table descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    /// SQLite column type plus any constraints, e.g. `"INTEGER"` or
    /// `"TEXT NOT NULL"`.
    pub sql_type: &'static str,
    pub primary_key: bool,
}

/// Explicit schema metadata for one table.
///
/// Descriptors are plain consts, listed explicitly where tables are created
/// rather than discovered by reflection:
///
/// ```rust
/// use sqlite_dispatch::schema::{ColumnDef, TableSchema};
///
/// static PERSON: TableSchema = TableSchema {
///     name: "person",
///     columns: &[
///         ColumnDef { name: "id", sql_type: "INTEGER", primary_key: true },
///         ColumnDef { name: "name", sql_type: "TEXT NOT NULL", primary_key: false },
///     ],
/// };
/// # let _ = &PERSON;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    #[must_use]
    pub fn primary_key(&self) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    #[must_use]
    pub fn create_sql(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("\"{}\" {} PRIMARY KEY", c.name, c.sql_type)
                } else {
                    format!("\"{}\" {}", c.name, c.sql_type)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", self.name, cols)
    }

    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS \"{}\"", self.name)
    }

    /// `SELECT` of every schema column, in declaration order.
    #[must_use]
    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM \"{}\"", self.column_list(), self.name)
    }

    #[must_use]
    pub fn insert_sql(&self) -> String {
        let placeholders = (0..self.columns.len())
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.name,
            self.column_list(),
            placeholders
        )
    }

    pub(crate) fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Maps a Rust type onto one table: its descriptor plus row (de)construction.
///
/// `to_values` must yield one value per schema column, in declaration order;
/// a `Null` primary key lets SQLite assign a rowid on insert.
pub trait TableModel: Send + Sized + 'static {
    fn schema() -> &'static TableSchema;

    /// The values of this instance, in schema column order.
    fn to_values(&self) -> Vec<RowValues>;

    /// Rebuild an instance from a queried row.
    ///
    /// # Errors
    ///
    /// Returns an error when a column is missing or has an unexpected type.
    fn from_row(row: &DbRow) -> Result<Self, SqliteDispatchError>;
}

/// Per-table outcome of a multi-table creation call, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct CreateTablesResult {
    pub results: HashMap<&'static str, usize>,
}
