use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    Game, GameRepository, GameUpdate, NewGame, NewPlayer, Player, PlayerRepository, PlayerUpdate,
    Sport, SportRepository,
};
use crate::error::{AppError, AppResult};
use crate::services::weather::WeatherInfo;
use crate::services::{attendance, notify};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_games).post(create_game))
        .route("/:id", get(get_game).put(update_game).delete(delete_game))
        .route("/:id/join", post(join_game))
        .route(
            "/:game_id/players/:player_id",
            put(update_player).delete(delete_player),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub sport_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub player_threshold: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameRequest {
    pub title: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub player_threshold: Option<i64>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    /// Stable external identity; used as the response token when present.
    pub uid: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub likelihood: Option<f64>,
    pub comment: Option<String>,
    pub response_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePlayerQuery {
    pub response_token: Option<String>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGameQuery {
    pub creator_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    #[serde(flatten)]
    pub game: Game,
    pub sport: Option<Sport>,
    pub players: Vec<Player>,
    pub progress: f64,
    pub has_minimum: bool,
    pub weather: Option<WeatherInfo>,
}

/// Join response: the created row plus the one-time response token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedResponse<T: Serialize> {
    #[serde(flatten)]
    pub row: T,
    pub response_token: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Nested game view with derived progress and best-effort weather.
async fn game_response(state: &AppState, game: Game) -> AppResult<GameResponse> {
    let sport = SportRepository::find_by_id(&state.db, game.sport_id).await?;
    let players = PlayerRepository::list_for_game(&state.db, game.id).await?;
    let weather = state.weather.forecast(&game.location, game.date).await;

    let likelihoods: Vec<f64> = players.iter().map(|p| p.likelihood).collect();
    let threshold = game.player_threshold as f64;

    Ok(GameResponse {
        progress: attendance::progress(&likelihoods, threshold),
        has_minimum: attendance::has_minimum(&likelihoods, threshold),
        game,
        sport,
        players,
        weather,
    })
}

async fn list_games(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<GameResponse>>> {
    let games = GameRepository::list(&state.db).await?;
    let responses = try_join_all(games.into_iter().map(|g| game_response(&state, g))).await?;
    Ok(Json(responses))
}

async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<GameResponse>> {
    let game = GameRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
    Ok(Json(game_response(&state, game).await?))
}

async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateGameRequest>,
) -> AppResult<Json<Game>> {
    let (Some(sport_id), Some(title), Some(location), Some(date), Some(threshold), Some(creator_id)) = (
        body.sport_id,
        body.title,
        body.location,
        body.date,
        body.player_threshold,
        body.creator_id,
    ) else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    if threshold < 1 {
        return Err(AppError::BadRequest(
            "playerThreshold must be at least 1".to_string(),
        ));
    }

    if SportRepository::find_by_id(&state.db, sport_id).await?.is_none() {
        return Err(AppError::BadRequest(
            "Selected sport does not exist".to_string(),
        ));
    }

    let game = GameRepository::create(
        &state.db,
        NewGame {
            sport_id,
            title,
            location,
            date: date.naive_utc(),
            timezone: body.timezone,
            player_threshold: threshold,
            creator_id,
            creator_name: body.creator_name.unwrap_or_default(),
        },
    )
    .await?;

    Ok(Json(game))
}

async fn update_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateGameRequest>,
) -> AppResult<Json<Game>> {
    let game = GameRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

    if body.creator_id.as_deref() != Some(game.creator_id.as_str()) {
        return Err(AppError::Forbidden(
            "Only the creator can edit this game".to_string(),
        ));
    }

    if matches!(body.player_threshold, Some(t) if t < 1) {
        return Err(AppError::BadRequest(
            "playerThreshold must be at least 1".to_string(),
        ));
    }

    let updated = GameRepository::update(
        &state.db,
        id,
        GameUpdate {
            title: body.title,
            location: body.location,
            date: body.date.map(|d| d.naive_utc()),
            player_threshold: body.player_threshold,
        },
    )
    .await?;

    Ok(Json(updated))
}

async fn delete_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteGameQuery>,
) -> AppResult<Json<DeletedResponse>> {
    let game = GameRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

    if query.creator_id.as_deref() != Some(game.creator_id.as_str()) {
        return Err(AppError::Forbidden(
            "Only the creator can delete this game".to_string(),
        ));
    }

    GameRepository::delete(&state.db, id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<JoinRequest>,
) -> AppResult<Json<JoinedResponse<Player>>> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?
        .to_string();

    let likelihood = validate_likelihood(body.likelihood)?;

    // External identity when present, otherwise a fresh opaque token.
    let response_token = body
        .uid
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = PlayerRepository::join(
        &state.db,
        NewPlayer {
            game_id: id,
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
        tokio::spawn(async move {
            notify::game_confirmed(&state, id).await;
        });
    }

    Ok(Json(JoinedResponse {
        row: outcome.row,
        response_token,
    }))
}

async fn update_player(
    State(state): State<Arc<AppState>>,
    Path((game_id, player_id)): Path<(i64, i64)>,
    Json(body): Json<UpdatePlayerRequest>,
) -> AppResult<Json<Player>> {
    let token = body.response_token.ok_or(AppError::Unauthorized)?;

    if let Some(likelihood) = body.likelihood {
        validate_likelihood(Some(likelihood))?;
    }

    let updated = PlayerRepository::update_verified(
        &state.db,
        game_id,
        player_id,
        &token,
        PlayerUpdate {
            name: body.name.filter(|n| !n.trim().is_empty()),
            email: body.email.filter(|e| !e.is_empty()),
            likelihood: body.likelihood,
            comment: body.comment,
        },
    )
    .await?;

    Ok(Json(updated))
}

async fn delete_player(
    State(state): State<Arc<AppState>>,
    Path((game_id, player_id)): Path<(i64, i64)>,
    Query(query): Query<DeletePlayerQuery>,
) -> AppResult<Json<DeletedResponse>> {
    let game = GameRepository::find_by_id(&state.db, game_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

    let player = PlayerRepository::find_by_id_for_game(&state.db, game_id, player_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found or unauthorized".to_string()))?;

    if query.response_token.is_none() && query.creator_id.is_none() {
        return Err(AppError::Unauthorized);
    }

    let token_ok = query.response_token.as_deref() == Some(player.response_token.as_str());
    let creator_ok = query.creator_id.as_deref() == Some(game.creator_id.as_str());
    if !token_ok && !creator_ok {
        return Err(AppError::NotFound(
            "Player not found or unauthorized".to_string(),
        ));
    }

    PlayerRepository::delete(&state.db, game_id, player_id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

/// Missing likelihood means a firm "yes".
pub(crate) fn validate_likelihood(likelihood: Option<f64>) -> AppResult<f64> {
    let value = likelihood.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(AppError::BadRequest(
            "likelihood must be between 0 and 1".to_string(),
        ));
    }
    Ok(value)
}
