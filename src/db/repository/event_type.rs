use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Event Type Repository
// ============================================================================

pub struct EventTypeRepository;

impl EventTypeRepository {
    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<EventType>> {
        sqlx::query_as::<_, EventType>("SELECT id, name, color FROM event_types ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<EventType>> {
        sqlx::query_as::<_, EventType>("SELECT id, name, color FROM event_types WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Insert the default event types when the table is empty.
    pub async fn seed_defaults(pool: &SqlitePool) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_types")
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)?;

        if count > 0 {
            return Ok(false);
        }

        let mut tx = pool.begin().await.map_err(AppError::Database)?;
        for (name, color) in default_event_types() {
            sqlx::query("INSERT INTO event_types (name, color) VALUES (?, ?)")
                .bind(name)
                .bind(color)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }
        tx.commit().await.map_err(AppError::Database)?;

        Ok(true)
    }
}
