use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

const GAME_COLUMNS: &str = "id, sport_id, title, location, date, timezone, \
     player_threshold, creator_id, creator_name, created_at";

// ============================================================================
// Game Repository
// ============================================================================

pub struct GameRepository;

impl GameRepository {
    pub async fn create(pool: &SqlitePool, new: NewGame) -> AppResult<Game> {
        let sql = format!(
            "INSERT INTO games (sport_id, title, location, date, timezone, \
             player_threshold, creator_id, creator_name) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {GAME_COLUMNS}"
        );
        sqlx::query_as::<_, Game>(&sql)
            .bind(new.sport_id)
            .bind(&new.title)
            .bind(&new.location)
            .bind(new.date)
            .bind(&new.timezone)
            .bind(new.player_threshold)
            .bind(&new.creator_id)
            .bind(&new.creator_name)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Game>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM games ORDER BY date");
        sqlx::query_as::<_, Game>(&sql)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Game>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?");
        sqlx::query_as::<_, Game>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Apply a partial update; unset fields keep their stored values.
    pub async fn update(pool: &SqlitePool, id: i64, update: GameUpdate) -> AppResult<Game> {
        let current = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

        let title = update.title.unwrap_or(current.title);
        let location = update.location.unwrap_or(current.location);
        let date = update.date.unwrap_or(current.date);
        let player_threshold = update.player_threshold.unwrap_or(current.player_threshold);

        let sql = format!(
            "UPDATE games SET title = ?, location = ?, date = ?, player_threshold = ? \
             WHERE id = ? RETURNING {GAME_COLUMNS}"
        );
        sqlx::query_as::<_, Game>(&sql)
            .bind(&title)
            .bind(&location)
            .bind(date)
            .bind(player_threshold)
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Delete a game and its players in one transaction.
    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM players WHERE game_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
