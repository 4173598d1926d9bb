// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! End-to-end scenarios against in-memory SQLite through the `Any` pool.
//!
//! These drive the generated code path: template expansion, parameter
//! binding, pagination, batching, expression translation, and the
//! dynamic-identifier gate.

use sqlrepo::prelude::*;

#[derive(SqlEntity, Debug, Clone, PartialEq)]
#[sql_entity(table = "users")]
pub struct User {
    #[sql(id)]
    pub id: i64,
    pub name: String,
    pub score: Option<i64>,
    #[sql(column = "is_active")]
    pub active: bool,
    pub email: Option<String>,
}

#[repository(
    entity = User,
    table = "users",
    dialect = "sqlite",
    max_batch_size = 4,
    shapes(crud, query, command, batch, aggregate, partial_update, expression_update, advanced, schema)
)]
pub trait UserRepo {
    #[sql("SELECT {{columns}} FROM {{table}} ORDER BY {{pk}} {{limit}}")]
    async fn get_with_nullable_limit(&self, limit: Option<i64>) -> Result<Vec<User>, RepoError>;

    #[sql("SELECT {{columns}} FROM {{table}} WHERE is_active = {{bool_true}} ORDER BY {{pk}}")]
    async fn get_active(&self) -> Result<Vec<User>, RepoError>;

    #[sql("SELECT COUNT(*) FROM {{table}}")]
    async fn count_cancellable(&self, token: CancellationToken) -> Result<i64, RepoError>;
}

fn user(name: &str, score: i64) -> User {
    User {
        id: 0,
        name: name.to_string(),
        score: Some(score),
        active: true,
        email: None,
    }
}

async fn repo() -> SqlRepository {
    sqlrepo::sqlx::any::install_default_drivers();
    let pool = sqlrepo::sqlx::any::AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    sqlrepo::sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            score INTEGER,
            is_active INTEGER NOT NULL,
            email TEXT
        )",
    )
    .execute(&pool)
    .await
    .expect("create schema");
    SqlRepository::new(pool)
}

async fn seed(repo: &SqlRepository, count: i64) {
    let users: Vec<User> = (1..=count)
        .map(|i| user(&format!("User{i}"), i * 10))
        .collect();
    let ids = repo.batch_insert_and_get_ids(users).await.expect("seed");
    assert_eq!(ids.len() as i64, count);
}

#[tokio::test]
async fn nullable_limit_policy() {
    let repo = repo().await;
    seed(&repo, 15).await;

    let all = repo.get_with_nullable_limit(None).await.unwrap();
    assert_eq!(all.len(), 15);

    let none = repo.get_with_nullable_limit(Some(0)).await.unwrap();
    assert!(none.is_empty());

    let five = repo.get_with_nullable_limit(Some(5)).await.unwrap();
    let names: Vec<&str> = five.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["User1", "User2", "User3", "User4", "User5"]);
}

#[tokio::test]
async fn paged_results_are_consistent() {
    let repo = repo().await;
    seed(&repo, 15).await;

    let page = repo.get_page(3, 5).await.unwrap();
    assert_eq!(page.total_count, 15);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page_number, 3);
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0].name, "User11");

    let beyond = repo.get_page(5, 20).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_count, 15);
    assert_eq!(beyond.total_pages, 1);

    let ragged = repo.get_page(4, 4).await.unwrap();
    assert_eq!(ragged.items.len(), 3);
    assert_eq!(ragged.total_pages, 4);
}

#[tokio::test]
async fn boolean_literal_rendering() {
    let repo = repo().await;
    let mut inactive = user("Sleeper", 1);
    inactive.active = false;
    repo.insert(inactive).await.unwrap();
    repo.insert(user("Awake", 2)).await.unwrap();

    let active = repo.get_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Awake");
}

#[tokio::test]
async fn insert_assigns_generated_key() {
    let repo = repo().await;
    let created = repo.insert(user("First", 10)).await.unwrap();
    assert_eq!(created.id, 1);
    let created = repo.insert(user("Second", 20)).await.unwrap();
    assert_eq!(created.id, 2);

    let fetched = repo.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Second");
    assert_eq!(fetched.score, Some(20));
    assert!(fetched.active);
    assert_eq!(fetched.email, None);
}

#[tokio::test]
async fn batch_insert_returns_ids_in_input_order() {
    let repo = repo().await;
    let users: Vec<User> = (1..=10).map(|i| user(&format!("U{i}"), i)).collect();
    // max_batch_size = 4 forces three chunks.
    let ids = repo.batch_insert_and_get_ids(users).await.unwrap();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
    assert!(ids.iter().all(|id| *id > 0));

    let stored = repo.get_all().await.unwrap();
    assert_eq!(stored.len(), 10);
    assert_eq!(stored[0].name, "U1");
    assert_eq!(stored[9].name, "U10");
}

#[tokio::test]
async fn expression_predicates_and_in_lists() {
    let repo = repo().await;
    seed(&repo, 5).await;

    let found = repo
        .find_where(col("id").in_collection("ids", vec![1i64, 2, 3]))
        .await
        .unwrap();
    assert_eq!(found.len(), 3);

    let empty = repo
        .find_where(col("id").in_collection("ids", Vec::<i64>::new()))
        .await
        .unwrap();
    assert!(empty.is_empty());

    let by_score = repo.find_where(col("score").gt(val(30))).await.unwrap();
    assert_eq!(by_score.len(), 2);

    let named = repo
        .find_where(col("name").contains("ser1"))
        .await
        .unwrap();
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].name, "User1");
}

#[tokio::test]
async fn expression_placeholders_share_one_slot() {
    let repo = repo().await;
    seed(&repo, 10).await;

    let predicate = col("score")
        .ge(param("cutoff"))
        .and(col("id").ne(param("cutoff")))
        .bind("cutoff", 50);
    let found = repo.find_where(predicate).await.unwrap();
    // score >= 50 selects users 5..10; id <> 50 removes none of them.
    assert_eq!(found.len(), 6);

    let unknown = repo
        .find_where(col("score").ge(param("cutoff")).bind("wrong", 1))
        .await;
    match unknown {
        Err(RepoError::UnknownParameter { name, available }) => {
            assert_eq!(name, "wrong");
            assert_eq!(available, vec!["cutoff".to_string()]);
        }
        other => panic!("expected UnknownParameter, got {other:?}"),
    }

    let unbound = repo.find_where(col("score").ge(param("cutoff"))).await;
    assert!(matches!(unbound, Err(RepoError::UnboundParameter(name)) if name == "cutoff"));
}

#[tokio::test]
async fn single_row_discipline() {
    let repo = repo().await;
    seed(&repo, 3).await;

    let one = repo
        .find_single_where(col("name").eq(val("User2")))
        .await
        .unwrap();
    assert_eq!(one.unwrap().id, 2);

    let too_many = repo.find_single_where(col("active").eq(val(true))).await;
    assert!(matches!(too_many, Err(RepoError::MultipleRowsForOptional)));

    let first = repo
        .find_first_where(col("active").eq(val(true)))
        .await
        .unwrap();
    assert_eq!(first.unwrap().id, 1);

    let missing = repo
        .find_single_where(col("name").eq(val("Nobody")))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn partial_update_preserves_other_fields() {
    let repo = repo().await;
    let created = repo.insert(user("testuser", 25)).await.unwrap();

    let touched = repo
        .update_columns(
            created.id,
            SetList::new()
                .set("email", val("b@example.com"))
                .set("score", val(200)),
        )
        .await
        .unwrap();
    assert_eq!(touched, 1);

    let after = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(after.name, "testuser");
    assert!(after.active);
    assert_eq!(after.email.as_deref(), Some("b@example.com"));
    assert_eq!(after.score, Some(200));
}

#[tokio::test]
async fn expression_update_by_predicate() {
    let repo = repo().await;
    seed(&repo, 6).await;

    let changed = repo
        .update_where(
            SetList::new().set("score", val(0)),
            col("id").gt(val(4)),
        )
        .await
        .unwrap();
    assert_eq!(changed, 2);

    let zeroed = repo.find_where(col("score").eq(val(0))).await.unwrap();
    assert_eq!(zeroed.len(), 2);
}

#[tokio::test]
async fn full_update_rewrites_all_columns() {
    let repo = repo().await;
    let mut created = repo.insert(user("before", 1)).await.unwrap();
    created.name = "after".to_string();
    created.score = None;
    created.email = Some("x@y.z".to_string());

    let touched = repo.update(created.clone()).await.unwrap();
    assert_eq!(touched, 1);

    let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn counting_and_existence() {
    let repo = repo().await;
    seed(&repo, 4).await;

    assert_eq!(repo.count().await.unwrap(), 4);
    assert_eq!(repo.count_where(col("score").gt(val(20))).await.unwrap(), 2);
    assert!(repo.exists_where(col("name").eq(val("User1"))).await.unwrap());
    assert!(!repo.exists_where(col("name").eq(val("Ghost"))).await.unwrap());
}

#[tokio::test]
async fn deletes_by_key_and_predicate() {
    let repo = repo().await;
    seed(&repo, 5).await;

    assert_eq!(repo.delete_by_id(1).await.unwrap(), 1);
    assert_eq!(repo.delete_where(col("score").gt(val(30))).await.unwrap(), 2);
    assert_eq!(repo.count().await.unwrap(), 2);
    assert_eq!(repo.delete_all().await.unwrap(), 2);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn aggregates_over_dynamic_columns() {
    let repo = repo().await;
    seed(&repo, 4).await;

    let min = repo.min_of(SqlIdent::from("score")).await.unwrap();
    assert_eq!(min, SqlValue::Int(10));
    let max = repo.max_of(SqlIdent::from("score")).await.unwrap();
    assert_eq!(max, SqlValue::Int(40));
    let sum = repo.sum_of(SqlIdent::from("score")).await.unwrap();
    assert_eq!(sum, SqlValue::Int(100));
}

#[tokio::test]
async fn dynamic_identifier_gate() {
    let repo = repo().await;
    seed(&repo, 3).await;

    let injected = repo
        .get_distinct_values(SqlIdent::from("score'; DROP TABLE users --"))
        .await;
    assert!(matches!(injected, Err(RepoError::UnsafeIdentifier(_))));

    // The gate fires before any SQL reaches the database.
    assert_eq!(repo.count().await.unwrap(), 3);

    let distinct = repo
        .get_distinct_values(SqlIdent::from("score"))
        .await
        .unwrap();
    assert_eq!(
        distinct,
        vec![SqlValue::Int(10), SqlValue::Int(20), SqlValue::Int(30)]
    );
}

#[tokio::test]
async fn raw_passthrough_rows() {
    let repo = repo().await;
    seed(&repo, 2).await;

    let rows = repo
        .query_rows(SqlFragment::from(
            "SELECT name, score AS points FROM users ORDER BY id",
        ))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let columns: Vec<&str> = rows[0].columns().collect();
    assert_eq!(columns, vec!["name", "points"]);
    assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("User1".into())));
    assert_eq!(rows[1].get("points"), Some(&SqlValue::Int(20)));

    let affected = repo
        .execute_raw(SqlFragment::from("UPDATE users SET score = 5"))
        .await
        .unwrap();
    assert_eq!(affected, 2);
}

#[tokio::test]
async fn schema_maintenance() {
    let repo = repo().await;
    seed(&repo, 3).await;

    // SQLite has no TRUNCATE; the dialect falls back to DELETE FROM.
    repo.truncate().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 0);
    repo.analyze().await.unwrap();
}

#[tokio::test]
async fn cancellation_is_cooperative() {
    let repo = repo().await;
    seed(&repo, 2).await;

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = repo.count_cancellable(token).await;
    assert!(matches!(cancelled, Err(RepoError::Cancelled)));

    let token = CancellationToken::new();
    assert_eq!(repo.count_cancellable(token).await.unwrap(), 2);
}
