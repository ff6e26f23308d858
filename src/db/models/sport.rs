use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sport {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

/// Seed rows inserted by `/api/init` when the table is empty.
pub fn default_sports() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Soccer", "#22c55e"),
        ("Basketball", "#f97316"),
        ("Tennis", "#eab308"),
        ("Volleyball", "#3b82f6"),
        ("Badminton", "#8b5cf6"),
        ("Ultimate Frisbee", "#14b8a6"),
    ]
}
