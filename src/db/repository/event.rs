use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

const EVENT_COLUMNS: &str = "id, event_type_id, url_hash, title, location, date, end_time, \
     is_private, is_recurring, recurrence_frequency, notes, participant_threshold, \
     creator_id, creator_name, created_at";

// ============================================================================
// Event Repository
// ============================================================================

pub struct EventRepository;

impl EventRepository {
    pub async fn create(pool: &SqlitePool, new: NewEvent) -> AppResult<Event> {
        let sql = format!(
            "INSERT INTO events (event_type_id, url_hash, title, location, date, end_time, \
             is_private, is_recurring, recurrence_frequency, notes, participant_threshold, \
             creator_id, creator_name) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&sql)
            .bind(new.event_type_id)
            .bind(&new.url_hash)
            .bind(&new.title)
            .bind(&new.location)
            .bind(new.date)
            .bind(new.end_time)
            .bind(new.is_private)
            .bind(new.is_recurring)
            .bind(&new.recurrence_frequency)
            .bind(&new.notes)
            .bind(new.participant_threshold)
            .bind(&new.creator_id)
            .bind(&new.creator_name)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Public listing. Private events are reachable only by their url hash.
    pub async fn list_public(pool: &SqlitePool) -> AppResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE is_private = FALSE ORDER BY date"
        );
        sqlx::query_as::<_, Event>(&sql)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?");
        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_hash(pool: &SqlitePool, url_hash: &str) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE url_hash = ?");
        sqlx::query_as::<_, Event>(&sql)
            .bind(url_hash)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Apply a partial update; unset fields keep their stored values.
    pub async fn update(pool: &SqlitePool, url_hash: &str, update: EventUpdate) -> AppResult<Event> {
        let current = Self::find_by_hash(pool, url_hash)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let event_type_id = update.event_type_id.unwrap_or(current.event_type_id);
        let title = update.title.unwrap_or(current.title);
        let location = update.location.unwrap_or(current.location);
        let date = update.date.unwrap_or(current.date);
        let end_time = update.end_time.or(current.end_time);
        let is_private = update.is_private.unwrap_or(current.is_private);
        let notes = update.notes.or(current.notes);
        let participant_threshold = update
            .participant_threshold
            .unwrap_or(current.participant_threshold);

        let sql = format!(
            "UPDATE events SET event_type_id = ?, title = ?, location = ?, date = ?, \
             end_time = ?, is_private = ?, notes = ?, participant_threshold = ? \
             WHERE url_hash = ? RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&sql)
            .bind(event_type_id)
            .bind(&title)
            .bind(&location)
            .bind(date)
            .bind(end_time)
            .bind(is_private)
            .bind(&notes)
            .bind(participant_threshold)
            .bind(url_hash)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Delete an event and its participants in one transaction.
    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM participants WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
