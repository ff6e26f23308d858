use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A response to a game invitation.
///
/// `response_token` authorizes later edits by the respondent. It is returned
/// exactly once in the join response and is never serialized on read paths.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub game_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub likelihood: f64,
    pub comment: Option<String>,
    #[serde(skip_serializing, default)]
    pub response_token: String,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub game_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub likelihood: f64,
    pub comment: Option<String>,
    pub response_token: String,
}

/// Partial update applied by the verified respondent.
#[derive(Debug, Clone, Default)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    pub comment: Option<String>,
}
