mod common;

use common::*;
use fluentdb::{Datum, Session};

async fn seeded() -> Session {
    let session = test_session().await;
    seed(
        &session,
        "users",
        vec![
            doc(&[
                ("id", s("u1")),
                ("name", s("Alice")),
                ("roles", Datum::Array(vec![s("admin")])),
            ]),
            doc(&[("id", s("u2")), ("name", s("Bob"))]),
        ],
    )
    .await;
    session
}

async fn roles_of(session: &Session, id: &str) -> Vec<Datum> {
    let doc = session.table("users").find(id).await.unwrap().unwrap();
    match doc.get("roles") {
        Some(Datum::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn test_push_appends() {
    let session = seeded().await;
    let outcome = session
        .table("users")
        .where_eq("id", "u1")
        .push("roles", "staff", false)
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 1);
    assert_eq!(roles_of(&session, "u1").await, vec![s("admin"), s("staff")]);
}

#[tokio::test]
async fn test_push_on_missing_field_creates_array() {
    let session = seeded().await;
    session
        .table("users")
        .where_eq("id", "u2")
        .push("roles", "guest", false)
        .await
        .unwrap();
    assert_eq!(roles_of(&session, "u2").await, vec![s("guest")]);
}

#[tokio::test]
async fn test_push_allows_duplicates_by_default() {
    let session = seeded().await;
    session
        .table("users")
        .where_eq("id", "u1")
        .push("roles", "admin", false)
        .await
        .unwrap();
    assert_eq!(roles_of(&session, "u1").await, vec![s("admin"), s("admin")]);
}

#[tokio::test]
async fn test_push_unique_is_idempotent() {
    let session = seeded().await;
    let outcome = session
        .table("users")
        .where_eq("id", "u1")
        .push("roles", "admin", true)
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 0);
    assert_eq!(roles_of(&session, "u1").await, vec![s("admin")]);
}

#[tokio::test]
async fn test_pull_removes_every_occurrence() {
    let session = seeded().await;
    session
        .table("users")
        .where_eq("id", "u1")
        .push("roles", "admin", false)
        .await
        .unwrap();

    let outcome = session
        .table("users")
        .where_eq("id", "u1")
        .pull("roles", "admin")
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 1);
    assert!(roles_of(&session, "u1").await.is_empty());
}

#[tokio::test]
async fn test_pull_missing_value_changes_nothing() {
    let session = seeded().await;
    let outcome = session
        .table("users")
        .where_eq("id", "u1")
        .pull("roles", "ghost")
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 0);
}

#[tokio::test]
async fn test_drop_fields() {
    let session = seeded().await;
    let outcome = session
        .table("users")
        .where_eq("id", "u1")
        .drop_fields(&["roles"])
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 1);

    let doc = session.table("users").find("u1").await.unwrap().unwrap();
    assert!(!doc.contains_key("roles"));
    assert!(doc.contains_key("name"));
}

#[tokio::test]
async fn test_unset_is_drop_fields() {
    let session = seeded().await;
    session
        .table("users")
        .unset(&["roles", "name"])
        .await
        .unwrap();

    let doc = session.table("users").find("u1").await.unwrap().unwrap();
    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["id"]);
}

#[tokio::test]
async fn test_drop_missing_field_changes_nothing() {
    let session = seeded().await;
    let outcome = session
        .table("users")
        .where_eq("id", "u2")
        .drop_fields(&["roles"])
        .await
        .unwrap();
    assert_eq!(outcome.replaced, 0);
}
