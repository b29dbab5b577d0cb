//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

/// Setup test database - apply the schema and truncate tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // Schema is idempotent (CREATE TABLE IF NOT EXISTS), safe to run every time
    pool.execute(include_str!("../../migrations/001_schema.sql"))
        .await
        .expect("Failed to apply schema");

    // Clean up DB for fresh state
    sqlx::query("TRUNCATE TABLE events, event_snapshots, character_profiles, activity_feed CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}
