#![allow(dead_code)]

use sqlite_dispatch::prelude::*;
use tempfile::TempDir;

pub static PERSON: TableSchema = TableSchema {
    name: "person",
    columns: &[
        ColumnDef {
            name: "id",
            sql_type: "INTEGER",
            primary_key: true,
        },
        ColumnDef {
            name: "name",
            sql_type: "TEXT NOT NULL",
            primary_key: false,
        },
        ColumnDef {
            name: "age",
            sql_type: "INTEGER NOT NULL",
            primary_key: false,
        },
    ],
};

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
}

impl Person {
    pub fn new(id: i64, name: &str, age: i64) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            age,
        }
    }
}

impl TableModel for Person {
    fn schema() -> &'static TableSchema {
        &PERSON
    }

    fn to_values(&self) -> Vec<RowValues> {
        vec![
            self.id.map_or(RowValues::Null, RowValues::Int),
            RowValues::Text(self.name.clone()),
            RowValues::Int(self.age),
        ]
    }

    fn from_row(row: &DbRow) -> Result<Self, SqliteDispatchError> {
        let id = row.get("id").and_then(RowValues::as_int);
        let name = row
            .get("name")
            .and_then(RowValues::as_text)
            .ok_or_else(|| SqliteDispatchError::Execution("person row missing name".into()))?
            .to_string();
        let age = row
            .get("age")
            .and_then(RowValues::as_int)
            .ok_or_else(|| SqliteDispatchError::Execution("person row missing age".into()))?;
        Ok(Self { id, name, age })
    }
}

/// A fresh on-disk database; keep the `TempDir` alive for the test's
/// duration.
pub fn temp_db(name: &str) -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join(name).to_string_lossy().into_owned();
    (dir, path)
}
