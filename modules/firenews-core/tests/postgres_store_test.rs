//! Integration tests for PostgresStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::sync::Arc;

use firenews_common::Label;
use firenews_core::articles::ARTICLES;
use firenews_core::testing::article;
use firenews_core::{
    ArticleRepository, DocumentStore, ModerationQueue, Scalar, ScoreOverride, SortDirection,
    StoreQuery,
};
use firenews_core::store::PostgresStore;
use serde_json::json;
use sqlx::PgPool;

/// Get a migrated store on a clean table, or skip if no test DB is available.
async fn test_store() -> Option<PostgresStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PostgresStore::new(pool.clone());
    store.migrate().await.ok()?;

    // Clean slate for each test
    sqlx::query("TRUNCATE documents").execute(&pool).await.ok()?;

    Some(store)
}

fn fields(value: serde_json::Value) -> firenews_core::FieldMap {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn create_get_and_partial_update() {
    let Some(store) = test_store().await else {
        return;
    };

    let id = store
        .create(ARTICLES, fields(json!({"title": "t", "fire_score": 40})))
        .await
        .unwrap();
    store
        .update(ARTICLES, &id, fields(json!({"fire_score": 90})))
        .await
        .unwrap();

    let doc = store.get(ARTICLES, &id).await.unwrap().unwrap();
    assert_eq!(doc.fields["title"], json!("t"));
    assert_eq!(doc.fields["fire_score"], json!(90));
    assert!(store.get(ARTICLES, "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn update_of_missing_document_fails() {
    let Some(store) = test_store().await else {
        return;
    };
    assert!(store
        .update(ARTICLES, "missing", fields(json!({"x": 1})))
        .await
        .is_err());
}

#[tokio::test]
async fn compound_query_filters_and_orders() {
    let Some(store) = test_store().await else {
        return;
    };
    for (score, flagged) in [(80, false), (40, true), (20, true)] {
        store
            .create(
                ARTICLES,
                fields(json!({"fire_score": score, "needs_moderation": flagged})),
            )
            .await
            .unwrap();
    }

    let query = StoreQuery::new(10)
        .filter_eq("needs_moderation", Scalar::Bool(true))
        .order_by("fire_score", SortDirection::Ascending);
    let docs = store.query(ARTICLES, &query).await.unwrap();
    let scores: Vec<_> = docs.iter().map(|d| d.fields["fire_score"].clone()).collect();
    assert_eq!(scores, vec![json!(20), json!(40)]);
}

#[tokio::test]
async fn override_workflow_round_trips_through_postgres() {
    let Some(store) = test_store().await else {
        return;
    };
    let store = Arc::new(store);
    let repo = Arc::new(ArticleRepository::new(store));
    let id = repo.create(&article("A1", Some(90), false)).await.unwrap();
    let queue = ModerationQueue::new(repo.clone(), 100);

    queue.report(&id, Some("spam")).await.unwrap();
    assert_eq!(queue.list_queue(10).await.unwrap().len(), 1);

    let outcome = queue
        .override_score(ScoreOverride {
            article_id: id.clone(),
            new_label: Label::Fake,
            confidence: Some(0.5),
            notes: Some("spam".into()),
        })
        .await
        .unwrap();
    assert_eq!(outcome.new_score, 25);

    let article = repo.get(&id).await.unwrap();
    assert_eq!(article.score_or_zero(), 25);
    assert!(!article.needs_moderation);
    assert_eq!(queue.notes(&id).await.unwrap().len(), 1);
}
