//! Routes for the Battle bounded context.
//!
//! Mounted under `/api/v1/battles/{battle_id}`. Snapshot writes triggered by
//! commands run in the background; responses do not wait for them.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tabletop_battle::application::command_handlers::{self, BattleCommandResult};
use tabletop_battle::application::query_handlers::{self, CharacterView, TimelineView};
use tabletop_battle::domain::commands;
use tabletop_battle::domain::participants::RosterEntry;
use tabletop_core::event::DomainEvent;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for PUT /roster.
#[derive(Debug, Deserialize)]
pub struct SetRosterRequest {
    /// Characters offered by the roster, in display order.
    pub characters: Vec<RosterEntry>,
}

/// Request body for POST /participants.
#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    /// The roster character to bring into battle.
    pub character_id: Uuid,
}

/// Request body for PUT /participants/{character_id}/team.
#[derive(Debug, Deserialize)]
pub struct SetTeamRequest {
    /// The new team.
    pub team: String,
}

/// Request body for POST /drop.
#[derive(Debug, Deserialize)]
pub struct DropTileRequest {
    /// The dragged character.
    pub character_id: Uuid,
    /// Index in the current timeline the turn should land before.
    pub target_index: usize,
}

/// Response body returned after a command is handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// IDs of the domain events recorded.
    pub event_ids: Vec<Uuid>,
    /// Types of the domain events recorded, in the same order.
    pub event_types: Vec<&'static str>,
}

impl From<BattleCommandResult> for CommandResponse {
    fn from(result: BattleCommandResult) -> Self {
        Self {
            event_ids: result.events.iter().map(|e| e.metadata().event_id).collect(),
            event_types: result.events.iter().map(DomainEvent::event_type).collect(),
        }
    }
}

/// GET /timeline
#[instrument(skip(state))]
async fn get_timeline(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<TimelineView>, ApiError> {
    let view = query_handlers::get_timeline(battle_id, &state.battles)?;
    Ok(Json(view))
}

/// GET /characters
#[instrument(skip(state))]
async fn get_characters(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<Vec<CharacterView>>, ApiError> {
    let characters = query_handlers::get_characters(battle_id, &state.battles)?;
    Ok(Json(characters))
}

/// PUT /roster
#[instrument(skip(state, request), fields(character_count = request.characters.len()))]
async fn set_roster(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<SetRosterRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::SetAvailableCharacters {
        correlation_id: Uuid::new_v4(),
        battle_id,
        characters: request.characters,
    };

    let result = command_handlers::handle_set_available_characters(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /load
#[instrument(skip(state))]
async fn load_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::LoadBattle {
        correlation_id: Uuid::new_v4(),
        battle_id,
    };

    let result = command_handlers::handle_load_battle(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &*state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /participants
#[instrument(skip(state, request), fields(character_id = %request.character_id))]
async fn add_participant(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<AddParticipantRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::AddCharacter {
        correlation_id: Uuid::new_v4(),
        battle_id,
        character_id: request.character_id,
    };

    let result = command_handlers::handle_add_character(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// DELETE /participants/{character_id}
#[instrument(skip(state))]
async fn remove_participant(
    State(state): State<AppState>,
    Path((battle_id, character_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::RemoveCharacter {
        correlation_id: Uuid::new_v4(),
        battle_id,
        character_id,
    };

    let result = command_handlers::handle_remove_character(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// PUT /participants/{character_id}/team
#[instrument(skip(state, request), fields(team = %request.team))]
async fn set_team(
    State(state): State<AppState>,
    Path((battle_id, character_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SetTeamRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::SetTeam {
        correlation_id: Uuid::new_v4(),
        battle_id,
        character_id,
        team: request.team,
    };

    let result = command_handlers::handle_set_team(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /next-turn
#[instrument(skip(state))]
async fn next_turn(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::NextTurn {
        correlation_id: Uuid::new_v4(),
        battle_id,
    };

    let result = command_handlers::handle_next_turn(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /drop
#[instrument(
    skip(state, request),
    fields(character_id = %request.character_id, target_index = request.target_index)
)]
async fn drop_tile(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<DropTileRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::DropTile {
        correlation_id: Uuid::new_v4(),
        battle_id,
        character_id: request.character_id,
        target_index: request.target_index,
    };

    let result = command_handlers::handle_drop_tile(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::ResetBattle {
        correlation_id: Uuid::new_v4(),
        battle_id,
    };

    let result = command_handlers::handle_reset_battle(
        &command,
        &state.battles,
        state.clock.as_ref(),
        &state.snapshot_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// Returns the router for one battle. Expects to be nested under a path that
/// captures `battle_id`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/timeline", get(get_timeline))
        .route("/characters", get(get_characters))
        .route("/roster", put(set_roster))
        .route("/load", post(load_battle))
        .route("/participants", post(add_participant))
        .route("/participants/{character_id}", delete(remove_participant))
        .route("/participants/{character_id}/team", put(set_team))
        .route("/next-turn", post(next_turn))
        .route("/drop", post(drop_tile))
        .route("/reset", post(reset_battle))
}
