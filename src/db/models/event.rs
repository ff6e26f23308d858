use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shareable event addressed by its url hash rather than a numeric id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub event_type_id: i64,
    pub url_hash: String,
    pub title: String,
    pub location: String,
    pub date: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub is_private: bool,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub notes: Option<String>,
    pub participant_threshold: i64,
    pub creator_id: String,
    pub creator_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type_id: i64,
    pub url_hash: String,
    pub title: String,
    pub location: String,
    pub date: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub is_private: bool,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub notes: Option<String>,
    pub participant_threshold: i64,
    pub creator_id: String,
    pub creator_name: String,
}

/// Partial update applied by the event's creator.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub event_type_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub is_private: Option<bool>,
    pub notes: Option<String>,
    pub participant_threshold: Option<i64>,
}
