//! Deferred table queries: build synchronously, execute asynchronously.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::SqliteDispatchError;
use crate::facade::dispatch;
use crate::ops;
use crate::pool::ConnectionPool;
use crate::schema::{TableModel, TableSchema};
use crate::spec::ConnectionSpec;
use crate::types::RowValues;

/// Immutable description of a filtered/ordered/limited table read.
///
/// Composition never touches the database; rendering to SQL happens only
/// when a terminal operation executes.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    filters: Vec<(String, Vec<RowValues>)>,
    order: Vec<(String, bool)>,
    skip: Option<u64>,
    take: Option<u64>,
}

impl QuerySpec {
    pub(crate) fn select_sql(&self, schema: &TableSchema) -> (String, Vec<RowValues>) {
        let mut sql = schema.select_sql();
        let mut params = Vec::new();

        if !self.filters.is_empty() {
            let clauses = self
                .filters
                .iter()
                .map(|(fragment, _)| format!("({fragment})"))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&clauses);
            for (_, filter_params) in &self.filters {
                params.extend(filter_params.iter().cloned());
            }
        }

        if !self.order.is_empty() {
            let terms = self
                .order
                .iter()
                .map(|(column, descending)| {
                    format!("\"{}\" {}", column, if *descending { "DESC" } else { "ASC" })
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms);
        }

        if self.take.is_some() || self.skip.is_some() {
            // SQLite has no bare OFFSET; LIMIT -1 means unbounded.
            match self.take {
                Some(take) => sql.push_str(&format!(" LIMIT {take}")),
                None => sql.push_str(" LIMIT -1"),
            }
            if let Some(skip) = self.skip {
                sql.push_str(&format!(" OFFSET {skip}"));
            }
        }

        (sql, params)
    }

    /// COUNT over the filters only; order and limits do not apply.
    pub(crate) fn count_sql(&self, schema: &TableSchema) -> (String, Vec<RowValues>) {
        let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", schema.name);
        let mut params = Vec::new();
        if !self.filters.is_empty() {
            let clauses = self
                .filters
                .iter()
                .map(|(fragment, _)| format!("({fragment})"))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&clauses);
            for (_, filter_params) in &self.filters {
                params.extend(filter_params.iter().cloned());
            }
        }
        (sql, params)
    }
}

/// Deferred query bound to one table and one pooled connection.
///
/// Composition methods take `&self` and return a refined copy; the receiver
/// is never mutated and stays reusable. Only the terminal operations
/// ([`to_list`](Self::to_list), [`count`](Self::count),
/// [`element_at`](Self::element_at)) lock the connection and run SQL.
///
/// Filter fragments use unnumbered `?` placeholders; parameters bind in
/// filter order:
///
/// ```rust,no_run
/// # use sqlite_dispatch::prelude::*;
/// # async fn demo<Person: TableModel>(db: AsyncDatabase) -> Result<(), SqliteDispatchError> {
/// let adults = db
///     .table::<Person>()
///     .filter("age >= ?", vec![RowValues::Int(18)])
///     .order_by("name")
///     .take(10)
///     .to_list()
///     .await?;
/// # let _ = adults; Ok(()) }
/// ```
pub struct AsyncTableQuery<T: TableModel> {
    pool: Arc<ConnectionPool>,
    spec: ConnectionSpec,
    query: QuerySpec,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TableModel> Clone for AsyncTableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            spec: self.spec.clone(),
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TableModel> AsyncTableQuery<T> {
    pub(crate) fn new(pool: Arc<ConnectionPool>, spec: ConnectionSpec) -> Self {
        Self {
            pool,
            spec,
            query: QuerySpec::default(),
            _marker: PhantomData,
        }
    }

    /// Add a WHERE clause; multiple filters combine with AND.
    #[must_use]
    pub fn filter(&self, fragment: impl Into<String>, params: Vec<RowValues>) -> Self {
        let mut refined = self.clone();
        refined.query.filters.push((fragment.into(), params));
        refined
    }

    /// Skip the first `n` matching rows.
    #[must_use]
    pub fn skip(&self, n: u64) -> Self {
        let mut refined = self.clone();
        refined.query.skip = Some(n);
        refined
    }

    /// Yield at most `n` rows.
    #[must_use]
    pub fn take(&self, n: u64) -> Self {
        let mut refined = self.clone();
        refined.query.take = Some(n);
        refined
    }

    /// Order ascending by `column`; later calls add secondary sort terms.
    #[must_use]
    pub fn order_by(&self, column: impl Into<String>) -> Self {
        let mut refined = self.clone();
        refined.query.order.push((column.into(), false));
        refined
    }

    /// Order descending by `column`; later calls add secondary sort terms.
    #[must_use]
    pub fn order_by_desc(&self, column: impl Into<String>) -> Self {
        let mut refined = self.clone();
        refined.query.order.push((column.into(), true));
        refined
    }

    /// Execute and materialize every matching row.
    ///
    /// # Errors
    ///
    /// Engine and row-mapping failures pass through.
    pub async fn to_list(&self) -> Result<Vec<T>, SqliteDispatchError> {
        let (sql, params) = self.query.select_sql(T::schema());
        dispatch(Arc::clone(&self.pool), self.spec.clone(), move |conn| {
            ops::query_as(conn, &sql, &params)
        })
        .await
    }

    /// Count the matching rows (filters only; skip/take do not apply).
    ///
    /// # Errors
    ///
    /// Engine failures pass through.
    pub async fn count(&self) -> Result<u64, SqliteDispatchError> {
        let (sql, params) = self.query.count_sql(T::schema());
        let n: i64 = dispatch(Arc::clone(&self.pool), self.spec.clone(), move |conn| {
            ops::execute_scalar(conn, &sql, &params)
        })
        .await?;
        u64::try_from(n)
            .map_err(|_| SqliteDispatchError::Execution(format!("negative row count: {n}")))
    }

    /// Fetch the row at `index` within this query's results.
    ///
    /// # Errors
    ///
    /// An index past the end of the results fails with the engine's
    /// `QueryReturnedNoRows`, never a default value.
    pub async fn element_at(&self, index: u64) -> Result<T, SqliteDispatchError> {
        if let Some(take) = self.query.take
            && index >= take
        {
            return Err(rusqlite::Error::QueryReturnedNoRows.into());
        }

        let mut narrowed = self.query.clone();
        narrowed.skip = Some(narrowed.skip.unwrap_or(0) + index);
        narrowed.take = Some(1);

        let (sql, params) = narrowed.select_sql(T::schema());
        let mut rows: Vec<T> = dispatch(Arc::clone(&self.pool), self.spec.clone(), move |conn| {
            ops::query_as(conn, &sql, &params)
        })
        .await?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(rusqlite::Error::QueryReturnedNoRows.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    static ITEM: TableSchema = TableSchema {
        name: "item",
        columns: &[
            ColumnDef {
                name: "id",
                sql_type: "INTEGER",
                primary_key: true,
            },
            ColumnDef {
                name: "score",
                sql_type: "INTEGER NOT NULL",
                primary_key: false,
            },
        ],
    };

    #[test]
    fn renders_bare_select() {
        let spec = QuerySpec::default();
        let (sql, params) = spec.select_sql(&ITEM);
        assert_eq!(sql, "SELECT \"id\", \"score\" FROM \"item\"");
        assert!(params.is_empty());
    }

    #[test]
    fn renders_filters_order_and_limits() {
        let spec = QuerySpec {
            filters: vec![
                ("score > ?".to_string(), vec![RowValues::Int(10)]),
                ("id != ?".to_string(), vec![RowValues::Int(3)]),
            ],
            order: vec![("score".to_string(), true), ("id".to_string(), false)],
            skip: Some(4),
            take: Some(2),
        };
        let (sql, params) = spec.select_sql(&ITEM);
        assert_eq!(
            sql,
            "SELECT \"id\", \"score\" FROM \"item\" WHERE (score > ?) AND (id != ?) \
             ORDER BY \"score\" DESC, \"id\" ASC LIMIT 2 OFFSET 4"
        );
        assert_eq!(params, vec![RowValues::Int(10), RowValues::Int(3)]);
    }

    #[test]
    fn skip_without_take_uses_unbounded_limit() {
        let spec = QuerySpec {
            skip: Some(3),
            ..QuerySpec::default()
        };
        let (sql, _) = spec.select_sql(&ITEM);
        assert!(sql.ends_with("LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn count_ignores_order_and_limits() {
        let spec = QuerySpec {
            filters: vec![("score > ?".to_string(), vec![RowValues::Int(1)])],
            order: vec![("id".to_string(), false)],
            skip: Some(1),
            take: Some(1),
        };
        let (sql, params) = spec.count_sql(&ITEM);
        assert_eq!(sql, "SELECT COUNT(*) FROM \"item\" WHERE (score > ?)");
        assert_eq!(params, vec![RowValues::Int(1)]);
    }
}
