use rusqlite::ParamsFromIter;
use rusqlite::types::Value;

use crate::types::RowValues;

/// Bind generic row values to SQLite value types.
#[must_use]
pub fn to_sqlite_values(params: &[RowValues]) -> Vec<Value> {
    let mut vec_values = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            RowValues::Int(i) => Value::Integer(*i),
            RowValues::Float(f) => Value::Real(*f),
            RowValues::Text(s) => Value::Text(s.to_string()),
            RowValues::Bool(b) => Value::Integer(i64::from(*b)),
            RowValues::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                Value::Text(formatted)
            }
            RowValues::Null => Value::Null,
            RowValues::JSON(jsval) => Value::Text(jsval.to_string()),
            RowValues::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        vec_values.push(v);
    }
    vec_values
}

/// Same conversion, packaged for positional binding in `execute`/`query`.
#[must_use]
pub fn bind_params(params: &[RowValues]) -> ParamsFromIter<Vec<Value>> {
    rusqlite::params_from_iter(to_sqlite_values(params))
}
