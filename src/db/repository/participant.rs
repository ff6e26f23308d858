use sqlx::SqlitePool;

use crate::db::models::*;
use crate::db::repository::player::JoinOutcome;
use crate::error::{AppError, AppResult};
use crate::services::attendance;

const PARTICIPANT_COLUMNS: &str =
    "id, event_id, name, email, likelihood, comment, response_token, joined_at";

// ============================================================================
// Participant Repository
// ============================================================================

pub struct ParticipantRepository;

impl ParticipantRepository {
    /// Insert a response for an event. Same transactional crossing rules as
    /// [`crate::db::PlayerRepository::join`].
    pub async fn join(
        pool: &SqlitePool,
        new: NewParticipant,
    ) -> AppResult<JoinOutcome<Participant>> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let threshold: Option<i64> =
            sqlx::query_scalar("SELECT participant_threshold FROM events WHERE id = ?")
                .bind(new.event_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        let threshold =
            threshold.ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if let Some(ref email) = new.email {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM participants WHERE event_id = ? AND email = ?")
                    .bind(new.event_id)
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(AppError::Database)?;
            if exists.is_some() {
                return Err(AppError::BadRequest(
                    "You have already joined this event".to_string(),
                ));
            }
        }

        let sum_before: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(likelihood), 0.0) FROM participants WHERE event_id = ?",
        )
        .bind(new.event_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let sql = format!(
            "INSERT INTO participants (event_id, name, email, likelihood, comment, response_token) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {PARTICIPANT_COLUMNS}"
        );
        let participant = sqlx::query_as::<_, Participant>(&sql)
            .bind(new.event_id)
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.likelihood)
            .bind(&new.comment)
            .bind(&new.response_token)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let sum_after: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(likelihood), 0.0) FROM participants WHERE event_id = ?",
        )
        .bind(new.event_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        let crossed_threshold = attendance::crossed(sum_before, sum_after, threshold as f64);

        Ok(JoinOutcome {
            row: participant,
            crossed_threshold,
        })
    }

    pub async fn list_for_event(pool: &SqlitePool, event_id: i64) -> AppResult<Vec<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = ? ORDER BY joined_at, id"
        );
        sqlx::query_as::<_, Participant>(&sql)
            .bind(event_id)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id_for_event(
        pool: &SqlitePool,
        event_id: i64,
        participant_id: i64,
    ) -> AppResult<Option<Participant>> {
        let sql =
            format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ? AND event_id = ?");
        sqlx::query_as::<_, Participant>(&sql)
            .bind(participant_id)
            .bind(event_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Update a response after verifying the presented token. Missing row and
    /// token mismatch are indistinguishable to the caller.
    pub async fn update_verified(
        pool: &SqlitePool,
        event_id: i64,
        participant_id: i64,
        token: &str,
        update: ParticipantUpdate,
    ) -> AppResult<Participant> {
        let current = Self::find_by_id_for_event(pool, event_id, participant_id)
            .await?
            .filter(|p| p.response_token == token)
            .ok_or_else(|| {
                AppError::NotFound("Participant not found or unauthorized".to_string())
            })?;

        let name = update.name.unwrap_or(current.name);
        let email = update.email.or(current.email);
        let likelihood = update.likelihood.unwrap_or(current.likelihood);
        let comment = update.comment.or(current.comment);

        let sql = format!(
            "UPDATE participants SET name = ?, email = ?, likelihood = ?, comment = ? \
             WHERE id = ? AND response_token = ? RETURNING {PARTICIPANT_COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&sql)
            .bind(&name)
            .bind(&email)
            .bind(likelihood)
            .bind(&comment)
            .bind(participant_id)
            .bind(token)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, event_id: i64, participant_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM participants WHERE id = ? AND event_id = ?")
            .bind(participant_id)
            .bind(event_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
