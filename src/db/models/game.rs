use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    pub sport_id: i64,
    pub title: String,
    pub location: String,
    pub date: NaiveDateTime,
    pub timezone: Option<String>,
    pub player_threshold: i64,
    pub creator_id: String,
    pub creator_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewGame {
    pub sport_id: i64,
    pub title: String,
    pub location: String,
    pub date: NaiveDateTime,
    pub timezone: Option<String>,
    pub player_threshold: i64,
    pub creator_id: String,
    pub creator_name: String,
}

/// Partial update applied by the game's creator. Unset fields keep their
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct GameUpdate {
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub player_threshold: Option<i64>,
}
