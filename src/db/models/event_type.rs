use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventType {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

/// Seed rows inserted by `/api/init` when the table is empty.
pub fn default_event_types() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Sports", "#22c55e"),
        ("Party", "#ec4899"),
        ("Meetup", "#3b82f6"),
        ("Dinner", "#f97316"),
        ("Other", "#6b7280"),
    ]
}
