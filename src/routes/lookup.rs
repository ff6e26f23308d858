use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db::{EventType, EventTypeRepository, Sport, SportRepository};
use crate::error::AppResult;
use crate::AppState;

/// Router for lookup tables (sports, event types) and one-time seeding.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sports", get(list_sports))
        .route("/event-types", get(list_event_types))
        .route("/init", get(init_defaults))
}

#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub success: bool,
}

async fn list_sports(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Sport>>> {
    let sports = SportRepository::list(&state.db).await?;
    Ok(Json(sports))
}

async fn list_event_types(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<EventType>>> {
    let event_types = EventTypeRepository::list(&state.db).await?;
    Ok(Json(event_types))
}

/// Seed default sports and event types when their tables are empty.
/// Idempotent; repeated calls leave existing rows untouched.
async fn init_defaults(State(state): State<Arc<AppState>>) -> AppResult<Json<InitResponse>> {
    if SportRepository::seed_defaults(&state.db).await? {
        tracing::info!("Seeded default sports");
    }
    if EventTypeRepository::seed_defaults(&state.db).await? {
        tracing::info!("Seeded default event types");
    }
    Ok(Json(InitResponse { success: true }))
}
