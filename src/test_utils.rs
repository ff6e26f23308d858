//! Shared test fixtures: an in-memory database and a ready-made `AppState`.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::services::notify::Notifier;
use crate::services::weather::WeatherService;
use crate::AppState;

/// Fresh in-memory SQLite pool with migrations applied. A single connection
/// keeps the in-memory database alive and shared across the test.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

/// App state with defaults: no weather API key, no notifier. Handlers that
/// consult either see the "unavailable" path, so tests stay offline.
pub async fn test_state() -> Arc<AppState> {
    test_state_with_notifier(None).await
}

pub async fn test_state_with_notifier(notifier: Option<Arc<dyn Notifier>>) -> Arc<AppState> {
    let config = Config::default();
    let weather = WeatherService::new(&config.weather).expect("failed to build weather service");
    Arc::new(AppState {
        db: memory_pool().await,
        config,
        weather,
        notifier,
    })
}
