use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    Event, EventRepository, EventType, EventTypeRepository, EventUpdate, NewEvent, NewParticipant,
    Participant, ParticipantRepository, ParticipantUpdate,
};
use crate::error::{AppError, AppResult};
use crate::routes::games::{validate_likelihood, DeletedResponse, JoinedResponse};
use crate::services::weather::WeatherInfo;
use crate::services::{attendance, notify};
use crate::AppState;

/// Length of the shareable url hash. Alphanumeric, so ten characters give
/// enough entropy that private events are not guessable in practice.
const URL_HASH_LEN: usize = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route(
            "/:hash",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/:hash/join", post(join_event))
        .route(
            "/:hash/participants/:participant_id",
            put(update_participant).delete(delete_participant),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub event_type_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_private: Option<bool>,
    pub is_recurring: Option<bool>,
    pub recurrence_frequency: Option<String>,
    pub notes: Option<String>,
    pub participant_threshold: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub event_type_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_private: Option<bool>,
    pub notes: Option<String>,
    pub participant_threshold: Option<i64>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEventRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    pub uid: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    pub comment: Option<String>,
    pub response_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParticipantQuery {
    pub response_token: Option<String>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventQuery {
    pub creator_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub event_type: Option<EventType>,
    pub participants: Vec<Participant>,
    pub progress: f64,
    pub has_minimum: bool,
    pub weather: Option<WeatherInfo>,
}

// ============================================================================
// Handlers
// ============================================================================

fn generate_url_hash() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(URL_HASH_LEN)
        .map(char::from)
        .collect()
}

async fn event_response(state: &AppState, event: Event) -> AppResult<EventResponse> {
    let event_type = EventTypeRepository::find_by_id(&state.db, event.event_type_id).await?;
    let participants = ParticipantRepository::list_for_event(&state.db, event.id).await?;
    let weather = state.weather.forecast(&event.location, event.date).await;

    let likelihoods: Vec<f64> = participants.iter().map(|p| p.likelihood).collect();
    let threshold = event.participant_threshold as f64;

    Ok(EventResponse {
        progress: attendance::progress(&likelihoods, threshold),
        has_minimum: attendance::has_minimum(&likelihoods, threshold),
        event,
        event_type,
        participants,
        weather,
    })
}

/// Public listing only; private events stay reachable through their hash.
async fn list_events(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<EventResponse>>> {
    let events = EventRepository::list_public(&state.db).await?;
    let responses = try_join_all(events.into_iter().map(|e| event_response(&state, e))).await?;
    Ok(Json(responses))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> AppResult<Json<EventResponse>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(event_response(&state, event).await?))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEventRequest>,
) -> AppResult<Json<Event>> {
    let (Some(event_type_id), Some(title), Some(location), Some(date), Some(threshold), Some(creator_id)) = (
        body.event_type_id,
        body.title,
        body.location,
        body.date,
        body.participant_threshold,
        body.creator_id,
    ) else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    if threshold < 1 {
        return Err(AppError::BadRequest(
            "participantThreshold must be at least 1".to_string(),
        ));
    }

    if EventTypeRepository::find_by_id(&state.db, event_type_id)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest(
            "Selected event type does not exist".to_string(),
        ));
    }

    let event = EventRepository::create(
        &state.db,
        NewEvent {
            event_type_id,
            url_hash: generate_url_hash(),
            title,
            location,
            date: date.naive_utc(),
            end_time: body.end_time.map(|t| t.naive_utc()),
            is_private: body.is_private.unwrap_or(false),
            is_recurring: body.is_recurring.unwrap_or(false),
            recurrence_frequency: body
                .recurrence_frequency
                .filter(|f| !f.is_empty()),
            notes: body.notes.filter(|n| !n.is_empty()),
            participant_threshold: threshold,
            creator_id,
            creator_name: body.creator_name.unwrap_or_default(),
        },
    )
    .await?;

    Ok(Json(event))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Json(body): Json<UpdateEventRequest>,
) -> AppResult<Json<Event>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if body.creator_id.as_deref() != Some(event.creator_id.as_str()) {
        return Err(AppError::Forbidden(
            "Only the creator can edit this event".to_string(),
        ));
    }

    if matches!(body.participant_threshold, Some(t) if t < 1) {
        return Err(AppError::BadRequest(
            "participantThreshold must be at least 1".to_string(),
        ));
    }

    if let Some(event_type_id) = body.event_type_id {
        if EventTypeRepository::find_by_id(&state.db, event_type_id)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest(
                "Selected event type does not exist".to_string(),
            ));
        }
    }

    let updated = EventRepository::update(
        &state.db,
        &hash,
        EventUpdate {
            event_type_id: body.event_type_id,
            title: body.title,
            location: body.location,
            date: body.date.map(|d| d.naive_utc()),
            end_time: body.end_time.map(|t| t.naive_utc()),
            is_private: body.is_private,
            notes: body.notes,
            participant_threshold: body.participant_threshold,
        },
    )
    .await?;

    Ok(Json(updated))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(query): Query<DeleteEventQuery>,
) -> AppResult<Json<DeletedResponse>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if query.creator_id.as_deref() != Some(event.creator_id.as_str()) {
        return Err(AppError::Forbidden(
            "Only the creator can delete this event".to_string(),
        ));
    }

    EventRepository::delete(&state.db, event.id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

async fn join_event(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Json(body): Json<JoinEventRequest>,
) -> AppResult<Json<JoinedResponse<Participant>>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?
        .to_string();

    let likelihood = validate_likelihood(body.likelihood)?;

    let response_token = body
        .uid
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = ParticipantRepository::join(
        &state.db,
        NewParticipant {
            event_id: event.id,
            name,
            email: body.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            likelihood,
            comment: body.comment.filter(|c| !c.is_empty()),
            response_token: response_token.clone(),
        },
    )
    .await?;

    if outcome.crossed_threshold {
        let state = state.clone();
        let event_id = event.id;
        tokio::spawn(async move {
            notify::event_confirmed(&state, event_id).await;
        });
    }

    Ok(Json(JoinedResponse {
        row: outcome.row,
        response_token,
    }))
}

async fn update_participant(
    State(state): State<Arc<AppState>>,
    Path((hash, participant_id)): Path<(String, i64)>,
    Json(body): Json<UpdateParticipantRequest>,
) -> AppResult<Json<Participant>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let token = body.response_token.ok_or(AppError::Unauthorized)?;

    if let Some(likelihood) = body.likelihood {
        validate_likelihood(Some(likelihood))?;
    }

    let updated = ParticipantRepository::update_verified(
        &state.db,
        event.id,
        participant_id,
        &token,
        ParticipantUpdate {
            name: body.name.filter(|n| !n.trim().is_empty()),
            email: body.email.filter(|e| !e.is_empty()),
            likelihood: body.likelihood,
            comment: body.comment,
        },
    )
    .await?;

    Ok(Json(updated))
}

async fn delete_participant(
    State(state): State<Arc<AppState>>,
    Path((hash, participant_id)): Path<(String, i64)>,
    Query(query): Query<DeleteParticipantQuery>,
) -> AppResult<Json<DeletedResponse>> {
    let event = EventRepository::find_by_hash(&state.db, &hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let participant =
        ParticipantRepository::find_by_id_for_event(&state.db, event.id, participant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Participant not found or unauthorized".to_string())
            })?;

    if query.response_token.is_none() && query.creator_id.is_none() {
        return Err(AppError::Unauthorized);
    }

    let token_ok = query.response_token.as_deref() == Some(participant.response_token.as_str());
    let creator_ok = query.creator_id.as_deref() == Some(event.creator_id.as_str());
    if !token_ok && !creator_ok {
        return Err(AppError::NotFound(
            "Participant not found or unauthorized".to_string(),
        ));
    }

    ParticipantRepository::delete(&state.db, event.id, participant_id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::test_state;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest("/api/events", router())
            .with_state(state)
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_event_request(app: &Router, is_private: bool) -> Value {
        let (status, body) = send_json(
            app,
            "POST",
            "/api/events",
            Some(json!({
                "eventTypeId": 1,
                "title": "Board game night",
                "location": "Cafe Mox",
                "date": "2025-06-01T19:00:00Z",
                "participantThreshold": 3,
                "creatorId": "creator-7",
                "isPrivate": is_private,
                "isRecurring": true,
                "recurrenceFrequency": "weekly",
                "notes": "Bring snacks"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[test]
    fn url_hashes_are_alphanumeric_and_sized() {
        let hash = generate_url_hash();
        assert_eq!(hash.len(), URL_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_url_hash(), generate_url_hash());
    }

    #[tokio::test]
    async fn created_events_are_addressed_by_hash() {
        let state = test_state().await;
        crate::db::EventTypeRepository::seed_defaults(&state.db)
            .await
            .unwrap();
        let app = app(state);

        let event = create_event_request(&app, false).await;
        let hash = event["urlHash"].as_str().unwrap();
        assert_eq!(hash.len(), URL_HASH_LEN);

        let (status, body) = send_json(&app, "GET", &format!("/api/events/{hash}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Board game night");
        assert_eq!(body["isRecurring"], json!(true));
        assert_eq!(body["recurrenceFrequency"], "weekly");
    }

    #[tokio::test]
    async fn private_events_are_hidden_from_the_listing() {
        let state = test_state().await;
        crate::db::EventTypeRepository::seed_defaults(&state.db)
            .await
            .unwrap();
        let app = app(state);

        let public = create_event_request(&app, false).await;
        let private = create_event_request(&app, true).await;

        let (status, listing) = send_json(&app, "GET", "/api/events", None).await;
        assert_eq!(status, StatusCode::OK);
        let hashes: Vec<&str> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["urlHash"].as_str().unwrap())
            .collect();
        assert!(hashes.contains(&public["urlHash"].as_str().unwrap()));
        assert!(!hashes.contains(&private["urlHash"].as_str().unwrap()));

        // but still reachable by hash
        let hash = private["urlHash"].as_str().unwrap();
        let (status, _) = send_json(&app, "GET", &format!("/api/events/{hash}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn participant_lifecycle_honors_tokens_and_creator() {
        let state = test_state().await;
        crate::db::EventTypeRepository::seed_defaults(&state.db)
            .await
            .unwrap();
        let app = app(state);

        let event = create_event_request(&app, false).await;
        let hash = event["urlHash"].as_str().unwrap().to_string();

        let (status, joined) = send_json(
            &app,
            "POST",
            &format!("/api/events/{hash}/join"),
            Some(json!({"name": "Alice", "likelihood": 0.5, "comment": "might be late"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(joined["likelihood"], json!(0.5));
        let participant_id = joined["id"].as_i64().unwrap();
        let token = joined["responseToken"].as_str().unwrap().to_string();

        // edit with the token
        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/events/{hash}/participants/{participant_id}"),
            Some(json!({"likelihood": 1.0, "responseToken": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likelihood"], json!(1.0));
        assert_eq!(body["comment"], "might be late");

        // delete without any credential
        let (status, _) = send_json(
            &app,
            "DELETE",
            &format!("/api/events/{hash}/participants/{participant_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // delete as the event creator
        let (status, _) = send_json(
            &app,
            "DELETE",
            &format!("/api/events/{hash}/participants/{participant_id}?creatorId=creator-7"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_cannot_lower_the_threshold_below_one() {
        let state = test_state().await;
        crate::db::EventTypeRepository::seed_defaults(&state.db)
            .await
            .unwrap();
        let app = app(state);

        let event = create_event_request(&app, false).await;
        let hash = event["urlHash"].as_str().unwrap();

        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/events/{hash}"),
            Some(json!({"participantThreshold": 0, "creatorId": "creator-7"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (_, body) = send_json(&app, "GET", &format!("/api/events/{hash}"), None).await;
        assert_eq!(body["participantThreshold"], json!(3));
    }

    #[tokio::test]
    async fn join_via_uid_reuses_the_external_identity() {
        let state = test_state().await;
        crate::db::EventTypeRepository::seed_defaults(&state.db)
            .await
            .unwrap();
        let app = app(state);

        let event = create_event_request(&app, false).await;
        let hash = event["urlHash"].as_str().unwrap();

        let (status, joined) = send_json(
            &app,
            "POST",
            &format!("/api/events/{hash}/join"),
            Some(json!({"name": "Auth'd", "uid": "firebase-uid-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(joined["responseToken"], "firebase-uid-1");
    }
}
