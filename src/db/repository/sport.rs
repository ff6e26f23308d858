use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Sport Repository
// ============================================================================

pub struct SportRepository;

impl SportRepository {
    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Sport>> {
        sqlx::query_as::<_, Sport>("SELECT id, name, color FROM sports ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Sport>> {
        sqlx::query_as::<_, Sport>("SELECT id, name, color FROM sports WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Insert the default sports when the table is empty. Returns whether any
    /// rows were inserted, so callers can log first-time initialization.
    pub async fn seed_defaults(pool: &SqlitePool) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sports")
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)?;

        if count > 0 {
            return Ok(false);
        }

        let mut tx = pool.begin().await.map_err(AppError::Database)?;
        for (name, color) in default_sports() {
            sqlx::query("INSERT INTO sports (name, color) VALUES (?, ?)")
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
