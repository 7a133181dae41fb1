//! Integration tests for `PgShoutRepository`.

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use void_core::error::DomainError;
use void_core::repository::ShoutRepository;
use void_store::pg_shout_repository::PgShoutRepository;

async fn insert_user(pool: &PgPool, username: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("INSERT INTO users (username) VALUES ($1) RETURNING id")
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_shout_returns_committed_row(pool: PgPool) {
    // Arrange
    let repo = PgShoutRepository::new(pool.clone());
    let alice = insert_user(&pool, "alice").await;
    let created_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

    // Act
    let shout = repo
        .insert_shout(alice, "hello world", created_at)
        .await
        .unwrap();

    // Assert
    assert!(shout.id > 0);
    assert_eq!(shout.user_id, alice);
    assert_eq!(shout.content, "hello world");
    assert_eq!(shout.created_at, created_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_shout_for_unknown_user_is_not_found(pool: PgPool) {
    let repo = PgShoutRepository::new(pool);

    let result = repo.insert_shout(9_999, "hello", Utc::now()).await;

    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_user_loads_username(pool: PgPool) {
    let repo = PgShoutRepository::new(pool.clone());
    let alice = insert_user(&pool, "alice").await;

    let user = repo.find_user(alice).await.unwrap();

    assert_eq!(user.id, alice);
    assert_eq!(user.username, "alice");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_unknown_user_is_not_found(pool: PgPool) {
    let repo = PgShoutRepository::new(pool);

    let result = repo.find_user(9_999).await;

    assert!(matches!(result, Err(DomainError::NotFound(_))));
}
