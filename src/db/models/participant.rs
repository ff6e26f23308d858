use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A response to an event invitation. Same token rules as [`crate::db::Player`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub likelihood: f64,
    pub comment: Option<String>,
    #[serde(skip_serializing, default)]
    pub response_token: String,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub event_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub likelihood: f64,
    pub comment: Option<String>,
    pub response_token: String,
}

/// Partial update applied by the verified respondent.
#[derive(Debug, Clone, Default)]
pub struct ParticipantUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    pub comment: Option<String>,
}
