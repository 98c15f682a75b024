//! Synchronous engine operations.
//!
//! Every function here runs on a worker thread while the connection's lock
//! is held. The async facade wraps them one-for-one; [`DbSession`] exposes
//! them inside an open transaction.
//!
//! [`DbSession`]: crate::facade::DbSession

use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, Statement, ToSql};

use crate::error::SqliteDispatchError;
use crate::params::{bind_params, to_sqlite_values};
use crate::results::ResultSet;
use crate::schema::{TableModel, TableSchema};
use crate::types::RowValues;

pub fn create_table(
    conn: &mut Connection,
    schema: &TableSchema,
) -> Result<usize, SqliteDispatchError> {
    Ok(conn.execute(&schema.create_sql(), [])?)
}

pub fn drop_table(
    conn: &mut Connection,
    schema: &TableSchema,
) -> Result<usize, SqliteDispatchError> {
    Ok(conn.execute(&schema.drop_sql(), [])?)
}

pub fn insert<T: TableModel>(conn: &mut Connection, item: &T) -> Result<usize, SqliteDispatchError> {
    let schema = T::schema();
    Ok(conn.execute(&schema.insert_sql(), bind_params(&item.to_values()))?)
}

/// Insert a batch with one prepared statement, without transaction control.
/// Used inside an already-open transaction.
pub fn insert_many<T: TableModel>(
    conn: &mut Connection,
    items: &[T],
) -> Result<usize, SqliteDispatchError> {
    let schema = T::schema();
    let mut stmt = conn.prepare(&schema.insert_sql())?;
    let mut affected = 0;
    for item in items {
        affected += stmt.execute(bind_params(&item.to_values()))?;
    }
    Ok(affected)
}

/// Insert a batch atomically: all rows commit together or none do.
pub fn insert_all<T: TableModel>(
    conn: &mut Connection,
    items: &[T],
) -> Result<usize, SqliteDispatchError> {
    let tx = conn.transaction()?;
    let schema = T::schema();
    let mut affected = 0;
    {
        let mut stmt = tx.prepare(&schema.insert_sql())?;
        for item in items {
            affected += stmt.execute(bind_params(&item.to_values()))?;
        }
    }
    tx.commit()?;
    Ok(affected)
}

pub fn update<T: TableModel>(conn: &mut Connection, item: &T) -> Result<usize, SqliteDispatchError> {
    let schema = T::schema();
    let pk_idx = primary_key_index(schema)?;
    let pk = schema.columns[pk_idx];

    let assignments = schema
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .map(|c| format!("\"{}\" = ?", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    if assignments.is_empty() {
        return Err(SqliteDispatchError::Execution(format!(
            "table \"{}\" has only its primary key; nothing to update",
            schema.name
        )));
    }
    let sql = format!(
        "UPDATE \"{}\" SET {} WHERE \"{}\" = ?",
        schema.name, assignments, pk.name
    );

    let mut values = item.to_values();
    let pk_value = values.remove(pk_idx);
    values.push(pk_value);
    Ok(conn.execute(&sql, bind_params(&values))?)
}

pub fn delete<T: TableModel>(conn: &mut Connection, item: &T) -> Result<usize, SqliteDispatchError> {
    let schema = T::schema();
    let pk_idx = primary_key_index(schema)?;
    let sql = format!(
        "DELETE FROM \"{}\" WHERE \"{}\" = ?",
        schema.name, schema.columns[pk_idx].name
    );
    let pk_value = item.to_values().swap_remove(pk_idx);
    Ok(conn.execute(&sql, bind_params(&[pk_value]))?)
}

/// Fetch one row by primary key, `None` when no row matches.
pub fn find<T: TableModel>(
    conn: &mut Connection,
    pk: &RowValues,
) -> Result<Option<T>, SqliteDispatchError> {
    let schema = T::schema();
    let pk_idx = primary_key_index(schema)?;
    let sql = format!(
        "{} WHERE \"{}\" = ? LIMIT 1",
        schema.select_sql(),
        schema.columns[pk_idx].name
    );
    let result = query(conn, &sql, std::slice::from_ref(pk))?;
    match result.rows.first() {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

/// Fetch one row by primary key.
///
/// # Errors
///
/// A missing row surfaces as the engine's `QueryReturnedNoRows`.
pub fn get<T: TableModel>(conn: &mut Connection, pk: &RowValues) -> Result<T, SqliteDispatchError> {
    find(conn, pk)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn execute(
    conn: &mut Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<usize, SqliteDispatchError> {
    Ok(conn.execute(sql, bind_params(params))?)
}

/// Run multiple statements inside one transaction.
pub fn execute_batch(conn: &mut Connection, sql: &str) -> Result<(), SqliteDispatchError> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.commit()?;
    Ok(())
}

/// Run a query that yields a single value, e.g. `SELECT COUNT(*)`.
pub fn execute_scalar<T: rusqlite::types::FromSql>(
    conn: &mut Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<T, SqliteDispatchError> {
    Ok(conn.query_row(sql, bind_params(params), |row| row.get(0))?)
}

pub fn query(
    conn: &mut Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqliteDispatchError> {
    let mut stmt = conn.prepare(sql)?;
    build_result_set(&mut stmt, &to_sqlite_values(params))
}

pub fn query_as<T: TableModel>(
    conn: &mut Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<Vec<T>, SqliteDispatchError> {
    let result = query(conn, sql, params)?;
    result.rows.iter().map(T::from_row).collect()
}

/// Materialize all rows of a prepared statement.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, SqliteDispatchError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::default();
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            row_values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqliteDispatchError> {
    match row.get_ref(idx)? {
        rusqlite::types::ValueRef::Null => Ok(RowValues::Null),
        rusqlite::types::ValueRef::Integer(i) => Ok(RowValues::Int(i)),
        rusqlite::types::ValueRef::Real(f) => Ok(RowValues::Float(f)),
        rusqlite::types::ValueRef::Text(bytes) => {
            Ok(RowValues::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        rusqlite::types::ValueRef::Blob(b) => Ok(RowValues::Blob(b.to_vec())),
    }
}

fn primary_key_index(schema: &TableSchema) -> Result<usize, SqliteDispatchError> {
    schema
        .columns
        .iter()
        .position(|c| c.primary_key)
        .ok_or_else(|| {
            SqliteDispatchError::Execution(format!(
                "table \"{}\" has no primary key column",
                schema.name
            ))
        })
}
