mod common;

use common::*;
use fluentdb::{Datum, Session};
use rust_decimal::Decimal;

async fn seeded() -> Session {
    let session = test_session().await;
    seed(
        &session,
        "users",
        vec![
            doc(&[("id", s("u1")), ("name", s("Alice")), ("age", i(3)), ("team", s("red"))]),
            doc(&[("id", s("u2")), ("name", s("Bob")), ("age", i(34)), ("team", s("blue"))]),
            doc(&[("id", s("u3")), ("name", s("Carol")), ("age", i(17)), ("team", s("red"))]),
            doc(&[("id", s("u4")), ("name", s("Dave")), ("age", i(17)), ("team", s("blue"))]),
            doc(&[("id", s("u5")), ("name", s("Eve"))]),
        ],
    )
    .await;
    session
}

#[tokio::test]
async fn test_count() {
    let session = seeded().await;
    assert_eq!(session.table("users").count().await.unwrap(), 5);
    assert_eq!(
        session
            .table("users")
            .where_not_null("age")
            .count()
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn test_sum_skips_missing_fields() {
    let session = seeded().await;
    let sum = session.table("users").sum("age").await.unwrap();
    assert_eq!(sum, i(71));
}

#[tokio::test]
async fn test_sum_of_nothing_is_zero() {
    let session = test_session().await;
    assert_eq!(session.table("users").sum("age").await.unwrap(), i(0));
}

#[tokio::test]
async fn test_min_and_max() {
    let session = seeded().await;
    assert_eq!(session.table("users").min("age").await.unwrap(), Some(i(3)));
    assert_eq!(session.table("users").max("age").await.unwrap(), Some(i(34)));
}

#[tokio::test]
async fn test_min_max_avg_of_nothing_are_none() {
    let session = test_session().await;
    assert_eq!(session.table("users").min("age").await.unwrap(), None);
    assert_eq!(session.table("users").max("age").await.unwrap(), None);
    assert_eq!(session.table("users").avg("age").await.unwrap(), None);
}

#[tokio::test]
async fn test_avg_is_exact() {
    let session = seeded().await;
    let avg = session.table("users").avg("age").await.unwrap();
    assert_eq!(avg, Some(Datum::Decimal(Decimal::new(1775, 2))));
}

#[tokio::test]
async fn test_aggregate_respects_filter() {
    let session = seeded().await;
    let sum = session
        .table("users")
        .where_eq("team", "red")
        .sum("age")
        .await
        .unwrap();
    assert_eq!(sum, i(20));
}

#[tokio::test]
async fn test_sum_mixes_integers_and_decimals() {
    let session = test_session().await;
    seed(
        &session,
        "users",
        vec![
            doc(&[("id", s("u1")), ("score", i(2))]),
            doc(&[("id", s("u2")), ("score", Datum::Decimal(Decimal::new(15, 1)))]),
        ],
    )
    .await;
    let sum = session.table("users").sum("score").await.unwrap();
    assert_eq!(sum, Datum::Decimal(Decimal::new(35, 1)));
}

#[tokio::test]
async fn test_order_by_multiple_fields() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .where_not_null("age")
        .order_by_desc("age")
        .order_by("name")
        .get()
        .await
        .unwrap();
    assert_eq!(names(&docs), vec!["Bob", "Carol", "Dave", "Alice"]);
}

#[tokio::test]
async fn test_skip_and_take() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .order_by("name")
        .skip(1)
        .take(2)
        .get()
        .await
        .unwrap();
    assert_eq!(names(&docs), vec!["Bob", "Carol"]);
}

#[tokio::test]
async fn test_columns_projection() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .where_eq("name", "Alice")
        .columns(&["name", "age"])
        .get()
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].len(), 2);
    assert_eq!(docs[0].get("name"), Some(&s("Alice")));
    assert_eq!(docs[0].get("id"), None);
}

#[tokio::test]
async fn test_projection_skips_absent_columns() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .where_eq("name", "Eve")
        .columns(&["name", "age"])
        .get()
        .await
        .unwrap();
    assert_eq!(docs[0].len(), 1);
}

#[tokio::test]
async fn test_group_by_keeps_first_per_value() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .where_not_null("team")
        .group_by("team")
        .get()
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn test_distinct_values() {
    let session = seeded().await;
    let mut teams = session
        .table("users")
        .distinct_values("team")
        .await
        .unwrap();
    teams.sort_by(|a, b| format!("{a}").cmp(&format!("{b}")));
    assert_eq!(teams, vec![s("blue"), s("red")]);
}

#[tokio::test]
async fn test_distinct_documents() {
    let session = seeded().await;
    let docs = session
        .table("users")
        .columns(&["team"])
        .distinct()
        .get()
        .await
        .unwrap();
    // red, blue, and the empty projection of Eve's document.
    assert_eq!(docs.len(), 3);
}
