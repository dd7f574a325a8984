//! Game lifecycle, scoring and undo/redo endpoints.
//!
//! Use-case endpoints always answer with an `ActionResult` body; the status
//! code follows its error kind.

use std::sync::Arc;

use application::{
    ActionResult, EndInningCommand, GameStateDto, PlayerInput, RecordAtBatCommand,
    RedoLastActionCommand, StartNewGameCommand, SubstitutePlayerCommand, UndoLastActionCommand,
};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::GameId;
use domain::{AtBatResult, PlayerId, TeamSide};
use event_store::{EventStore, SnapshotStore, StoredEvent};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{ApiError, action_status};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AtBatRequest {
    pub batter_id: String,
    pub result: AtBatResult,
}

#[derive(Debug, Deserialize)]
pub struct SubstitutionRequest {
    pub side: TeamSide,
    pub batting_slot: u8,
    pub incoming: PlayerInput,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub game_id: String,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_stack_depth: usize,
    pub redo_stack_depth: usize,
}

type ActionResponse = (StatusCode, Json<ActionResult>);

fn respond(result: ActionResult, success: StatusCode) -> ActionResponse {
    (action_status(&result, success), Json(result))
}

fn parse_game_id(id: &str) -> Result<GameId, ApiError> {
    Ok(GameId::new(id)?)
}

// -- Handlers --

/// POST /games: create and start a game with both lineups.
#[tracing::instrument(skip(state, command))]
pub async fn start<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Json(command): Json<StartNewGameCommand>,
) -> ActionResponse
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let result = state.services.start_new_game().execute(command).await;
    respond(result, StatusCode::CREATED)
}

/// GET /games/{id}: current scoreboard of a game.
#[tracing::instrument(skip(state))]
pub async fn get<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<GameStateDto>, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let game_id = parse_game_id(&id)?;
    Ok(Json(state.services.game_state(&game_id).await?))
}

/// GET /games/{id}/events: the raw log of every stream of a game.
#[tracing::instrument(skip(state))]
pub async fn events<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredEvent>>, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let game_id = parse_game_id(&id)?;
    Ok(Json(state.services.game_events(&game_id).await?))
}

/// GET /games/{id}/history: whether undo and redo are available.
#[tracing::instrument(skip(state))]
pub async fn history<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let game_id = parse_game_id(&id)?;
    let (undo, redo) = state.services.history().depths(&game_id).await;
    Ok(Json(HistoryResponse {
        game_id: game_id.to_string(),
        can_undo: undo > 0,
        can_redo: redo > 0,
        undo_stack_depth: undo,
        redo_stack_depth: redo,
    }))
}

/// POST /games/{id}/at-bats
#[tracing::instrument(skip(state, req))]
pub async fn record_at_bat<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
    Json(req): Json<AtBatRequest>,
) -> Result<ActionResponse, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let command = RecordAtBatCommand {
        game_id: parse_game_id(&id)?,
        batter_id: PlayerId::new(req.batter_id)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        result: req.result,
    };
    let result = state.services.record_at_bat().execute(command).await;
    Ok(respond(result, StatusCode::OK))
}

/// POST /games/{id}/substitutions
#[tracing::instrument(skip(state, req))]
pub async fn substitute<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
    Json(req): Json<SubstitutionRequest>,
) -> Result<ActionResponse, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let command = SubstitutePlayerCommand {
        game_id: parse_game_id(&id)?,
        side: req.side,
        batting_slot: req.batting_slot,
        incoming: req.incoming,
    };
    let result = state.services.substitute_player().execute(command).await;
    Ok(respond(result, StatusCode::OK))
}

/// POST /games/{id}/end-inning
#[tracing::instrument(skip(state))]
pub async fn end_inning<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let command = EndInningCommand {
        game_id: parse_game_id(&id)?,
    };
    let result = state.services.end_inning().execute(command).await;
    Ok(respond(result, StatusCode::OK))
}

/// POST /games/{id}/undo
#[tracing::instrument(skip(state))]
pub async fn undo<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let command = UndoLastActionCommand {
        game_id: parse_game_id(&id)?,
    };
    let result = state.services.undo_last_action().execute(command).await;
    Ok(respond(result, StatusCode::OK))
}

/// POST /games/{id}/redo
#[tracing::instrument(skip(state))]
pub async fn redo<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    S: EventStore + Clone + 'static,
    P: SnapshotStore + Clone + 'static,
{
    let command = RedoLastActionCommand {
        game_id: parse_game_id(&id)?,
    };
    let result = state.services.redo_last_action().execute(command).await;
    Ok(respond(result, StatusCode::OK))
}
