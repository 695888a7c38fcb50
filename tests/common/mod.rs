#![allow(dead_code)]

use fluentdb::{Datum, Document, Session};

/// In-memory session with an empty `users` table.
pub async fn test_session() -> Session {
    let session = Session::memory();
    session
        .schema()
        .create_table("users")
        .await
        .expect("Failed to create users table");
    session
}

pub fn doc(pairs: &[(&str, Datum)]) -> Document {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn s(value: &str) -> Datum {
    Datum::String(value.to_string())
}

pub fn i(value: i64) -> Datum {
    Datum::Integer(value)
}

pub fn user(id: &str, name: &str, age: i64) -> Document {
    doc(&[("id", s(id)), ("name", s(name)), ("age", i(age))])
}

pub async fn seed(session: &Session, table: &str, docs: Vec<Document>) {
    let outcome = session
        .table(table)
        .insert(docs)
        .await
        .expect("Failed to seed documents");
    assert_eq!(outcome.errors, 0, "seeding must not produce errors");
}

pub fn names(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .filter_map(|d| match d.get("name") {
            Some(Datum::String(name)) => Some(name.clone()),
            _ => None,
        })
        .collect()
}
