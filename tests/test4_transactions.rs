mod common;

use std::sync::Arc;

use common::{temp_db, Person};
use sqlite_dispatch::prelude::*;

async fn fresh_db(name: &str) -> (tempfile::TempDir, AsyncDatabase) {
    let (dir, path) = temp_db(name);
    let pool = Arc::new(ConnectionPool::new());
    let db = AsyncDatabase::new(pool, &path);
    db.create_table::<Person>().await.unwrap();
    (dir, db)
}

#[tokio::test]
async fn commit_makes_all_writes_visible() {
    let (_dir, db) = fresh_db("commit.db").await;

    let inserted = db
        .run_in_transaction(|session| {
            let mut n = session.insert(&Person::new(1, "alice", 30))?;
            n += session.insert(&Person::new(2, "bob", 25))?;
            Ok(n)
        })
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(db.table::<Person>().count().await.unwrap(), 2);
}

#[tokio::test]
async fn callback_error_rolls_back_every_write() {
    let (_dir, db) = fresh_db("rollback.db").await;
    db.insert(Person::new(1, "alice", 30)).await.unwrap();

    let err = db
        .run_in_transaction(|session| {
            session.insert(&Person::new(2, "bob", 25))?;
            session.execute("UPDATE person SET age = ? WHERE id = ?", &[
                RowValues::Int(31),
                RowValues::Int(1),
            ])?;
            Err::<(), _>(SqliteDispatchError::Execution("business rule failed".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SqliteDispatchError::Execution(_)));

    // Neither the insert nor the update survives.
    assert_eq!(db.table::<Person>().count().await.unwrap(), 1);
    let alice: Person = db.get(RowValues::Int(1)).await.unwrap();
    assert_eq!(alice.age, 30);
}

#[tokio::test]
async fn engine_failure_inside_the_callback_rolls_back() {
    let (_dir, db) = fresh_db("constraint.db").await;
    db.insert(Person::new(1, "alice", 30)).await.unwrap();

    let err = db
        .run_in_transaction(|session| {
            session.insert(&Person::new(2, "bob", 25))?;
            // Duplicate primary key; the `?` propagates the engine error out
            // of the callback.
            session.insert(&Person::new(1, "imposter", 99))?;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SqliteDispatchError::Sqlite(_)));
    assert_eq!(db.table::<Person>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn session_reads_observe_uncommitted_writes() {
    let (_dir, db) = fresh_db("session.db").await;

    let seen_inside = db
        .run_in_transaction(|session| {
            session.insert(&Person::new(1, "alice", 30))?;
            let person: Person = session.get(&RowValues::Int(1))?;
            session.update(&Person::new(1, "alice", person.age + 1))?;
            session.execute_scalar("SELECT age FROM person WHERE id = 1", &[])
        })
        .await
        .unwrap();
    let seen_inside: i64 = seen_inside;
    assert_eq!(seen_inside, 31);

    let committed: Person = db.get(RowValues::Int(1)).await.unwrap();
    assert_eq!(committed.age, 31);
}

#[tokio::test]
async fn session_batch_insert_joins_the_transaction() {
    let (_dir, db) = fresh_db("batch.db").await;

    let err = db
        .run_in_transaction(|session| {
            session.insert_many(&[
                Person::new(1, "alice", 30),
                Person::new(2, "bob", 25),
            ])?;
            Err::<(), _>(SqliteDispatchError::Execution("abort".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SqliteDispatchError::Execution(_)));
    assert_eq!(db.table::<Person>().count().await.unwrap(), 0);
}

#[tokio::test]
async fn panicking_callback_rolls_back_and_frees_the_connection() {
    let (_dir, db) = fresh_db("panic.db").await;
    db.insert(Person::new(1, "alice", 30)).await.unwrap();

    let err = db
        .run_in_transaction(|session| -> Result<(), SqliteDispatchError> {
            session.insert(&Person::new(2, "bob", 25))?;
            panic!("callback blew up");
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SqliteDispatchError::Task(_)));

    // The partial insert rolled back and the connection is out of the
    // abandoned transaction, so later transactions still work.
    assert_eq!(db.table::<Person>().count().await.unwrap(), 1);
    db.run_in_transaction(|session| {
        session.insert(&Person::new(3, "carol", 35))?;
        Ok(())
    })
    .await
    .unwrap();
    assert_eq!(db.table::<Person>().count().await.unwrap(), 2);
}

#[tokio::test]
async fn session_find_resolves_a_miss_to_none() {
    let (_dir, db) = fresh_db("find.db").await;

    let found = db
        .run_in_transaction(|session| {
            session.insert(&Person::new(1, "alice", 30))?;
            let hit: Option<Person> = session.find(&RowValues::Int(1))?;
            let miss: Option<Person> = session.find(&RowValues::Int(9))?;
            Ok((hit, miss))
        })
        .await
        .unwrap();
    assert_eq!(found.0.map(|p| p.name), Some("alice".to_string()));
    assert!(found.1.is_none());
}

#[tokio::test]
async fn transaction_returns_the_callback_value() {
    let (_dir, db) = fresh_db("value.db").await;

    let names = db
        .run_in_transaction(|session| {
            session.insert(&Person::new(1, "alice", 30))?;
            session.insert(&Person::new(2, "bob", 25))?;
            let rows: Vec<Person> =
                session.query_as("SELECT id, name, age FROM person ORDER BY id", &[])?;
            Ok(rows.into_iter().map(|p| p.name).collect::<Vec<_>>())
        })
        .await
        .unwrap();
    assert_eq!(names, vec!["alice", "bob"]);
}
