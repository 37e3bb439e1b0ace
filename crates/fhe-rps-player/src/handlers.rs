//! HTTP API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fhe_rps_core::protocol::{GameId, GameSession, PendingTransaction};
use fhe_rps_core::{CoordinatorState, GameError, Move, SessionSnapshot};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

/// Coordinator error rendered as a JSON body
pub struct AppError(GameError);

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        AppError(e)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            GameError::InvalidMove(_) | GameError::NoMoveSelected => StatusCode::BAD_REQUEST,
            GameError::GameNotOpen(_) | GameError::AlreadySubmitting => StatusCode::CONFLICT,
            GameError::SubmissionRejected(_) => StatusCode::BAD_GATEWAY,
            GameError::EncryptionUnavailable(_) | GameError::ReadUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.0,
            "message": self.0.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

// ============ Request/Response types ============

#[derive(Deserialize)]
pub struct SelectMoveRequest {
    /// 0 = Rock, 1 = Paper, 2 = Scissors
    pub choice: u8,
}

#[derive(Serialize)]
pub struct SelectMoveResponse {
    pub selected: Move,
    pub name: String,
}

#[derive(Deserialize)]
pub struct JoinGameRequest {
    pub game_id: GameId,
}

#[derive(Serialize)]
pub struct SubmissionResponse {
    pub submission: PendingTransaction,
}

#[derive(Serialize)]
pub struct StateResponse {
    pub coordinator: CoordinatorState,
    pub sessions: SessionSnapshot,
}

// ============ Handlers ============

pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let coordinator = &state.coordinator;
    Json(StateResponse {
        coordinator: coordinator.state(),
        sessions: (*coordinator.snapshot()).clone(),
    })
}

pub async fn select_move(
    State(state): State<AppState>,
    Json(req): Json<SelectMoveRequest>,
) -> Result<Json<SelectMoveResponse>, AppError> {
    let selected = state.coordinator.select_move(req.choice)?;
    Ok(Json(SelectMoveResponse {
        selected,
        name: selected.to_string(),
    }))
}

pub async fn reset_move(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.coordinator.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_game(
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = state.coordinator.create_game().await?;
    info!("Create submitted: {}", submission.tx_hash);
    Ok(Json(SubmissionResponse { submission }))
}

pub async fn join_game(
    State(state): State<AppState>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = state.coordinator.join_game(req.game_id).await?;
    info!("Join of {} submitted: {}", req.game_id, submission.tx_hash);
    Ok(Json(SubmissionResponse { submission }))
}

pub async fn refresh_games(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state.coordinator.refresh_sessions().await?;
    Ok(Json((*snapshot).clone()))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSession>, AppError> {
    Ok(Json(state.coordinator.game_details(game_id).await?))
}

pub async fn health() -> &'static str {
    "ok"
}
