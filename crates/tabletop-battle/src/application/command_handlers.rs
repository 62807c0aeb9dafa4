//! Command handlers for the Battle context.
//!
//! Each handler applies one command to the in-memory battle under the table
//! lock, drains the recorded events and, if the battle changed, hands a
//! snapshot to a background task that writes it to the store. The in-memory
//! battle stays authoritative: a failed write is logged and never rolled back.
//!
//! The first command to touch a battle in this process reads the stored
//! snapshot version so the battle's own snapshots are numbered above it.

use std::sync::Arc;

use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::clock::Clock;
use tabletop_core::command::Command;
use tabletop_core::error::DomainError;
use tabletop_core::event::DomainEvent;
use tabletop_core::repository::{SnapshotRepository, StoredSnapshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::active_battles::ActiveBattles;
use crate::domain::aggregates::{Battle, LoadState, RestoredBattle};
use crate::domain::commands::{
    AddCharacter, DropTile, LoadBattle, NextTurn, RemoveCharacter, ResetBattle,
    SetAvailableCharacters, SetTeam,
};
use crate::domain::events::{BattleEvent, BattleEventKind};
use crate::domain::record::BattleRecord;

/// Result of a handled command.
#[derive(Debug)]
pub struct BattleCommandResult {
    /// The battle affected by the command.
    pub battle_id: Uuid,
    /// Events recorded by the command, in order. Empty for a no-op.
    pub events: Vec<BattleEvent>,
    /// Background snapshot write, if the battle changed.
    pub persistence: Option<JoinHandle<()>>,
}

impl BattleCommandResult {
    /// Whether the command recorded an event of the given type.
    #[must_use]
    pub fn recorded(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e.event_type() == event_type)
    }
}

fn to_stored_snapshot(battle: &Battle, clock: &dyn Clock) -> StoredSnapshot {
    StoredSnapshot {
        aggregate_id: battle.id,
        payload: battle.to_record().to_payload(),
        version: battle.version(),
        saved_at: clock.now(),
    }
}

fn drain_events(battle: &mut Battle) -> Vec<BattleEvent> {
    let events = battle.uncommitted_events().to_vec();
    battle.clear_uncommitted_events();
    events
}

fn spawn_snapshot_write(
    repo: Arc<dyn SnapshotRepository>,
    snapshot: StoredSnapshot,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = repo.save_snapshot(&snapshot).await {
            warn!(
                battle_id = %snapshot.aggregate_id,
                version = snapshot.version,
                error = %e,
                "failed to persist battle snapshot"
            );
        }
    })
}

/// Reads the stored version of a battle this process has not touched yet.
///
/// A failed read is logged and treated as nothing stored; the command still
/// runs against memory.
async fn stored_version_if_untouched(
    battle_id: Uuid,
    battles: &ActiveBattles,
    repo: &dyn SnapshotRepository,
) -> Result<Option<i64>, DomainError> {
    if battles.contains(battle_id)? {
        return Ok(None);
    }
    match repo.stored_version(battle_id).await {
        Ok(version) => Ok(version),
        Err(e) => {
            warn!(
                %battle_id,
                error = %e,
                "stored snapshot version unavailable"
            );
            Ok(None)
        }
    }
}

async fn execute<C: Command>(
    command: &C,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
    apply: impl FnOnce(&mut Battle) -> Result<(), DomainError>,
) -> Result<BattleCommandResult, DomainError> {
    let battle_id = command.aggregate_id();
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        %battle_id,
        "handling battle command"
    );

    let stored_version = stored_version_if_untouched(battle_id, battles, repo.as_ref()).await?;

    let (events, snapshot) = battles.with_battle(battle_id, |battle| {
        if let Some(version) = stored_version {
            battle.observe_stored_version(version);
        }
        apply(battle)?;
        let events = drain_events(battle);
        let snapshot = events
            .iter()
            .any(DomainEvent::changes_state)
            .then(|| to_stored_snapshot(battle, clock));
        Ok((events, snapshot))
    })?;

    for event in &events {
        if let BattleEventKind::TileDropRejected(rejected) = &event.kind {
            warn!(
                %battle_id,
                character_id = %rejected.character_id,
                target_index = rejected.target_index,
                reason = ?rejected.reason,
                "tile drop rejected"
            );
        }
    }

    Ok(BattleCommandResult {
        battle_id,
        events,
        persistence: snapshot.map(|s| spawn_snapshot_write(Arc::clone(repo), s)),
    })
}

/// Handles `SetAvailableCharacters`: replaces the roster and refreshes the
/// participants it lists.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank character name.
pub async fn handle_set_available_characters(
    command: &SetAvailableCharacters,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.set_available_characters(command.characters.clone(), command.correlation_id, clock)
    })
    .await
}

/// Handles `AddCharacter`: brings a roster character into the battle and
/// rebuilds the timeline.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the battle table is unavailable.
pub async fn handle_add_character(
    command: &AddCharacter,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.add_character(command.character_id, command.correlation_id, clock);
        Ok(())
    })
    .await
}

/// Handles `RemoveCharacter`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the battle table is unavailable.
pub async fn handle_remove_character(
    command: &RemoveCharacter,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.remove_character(command.character_id, command.correlation_id, clock);
        Ok(())
    })
    .await
}

/// Handles `SetTeam`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank team.
pub async fn handle_set_team(
    command: &SetTeam,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.set_team(
            command.character_id,
            &command.team,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles `NextTurn`: resolves the leading turn group.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the battle table is unavailable.
pub async fn handle_next_turn(
    command: &NextTurn,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.next_turn(command.correlation_id, clock);
        Ok(())
    })
    .await
}

/// Handles `DropTile`. A refused drop is not an error; it is reported through
/// a `battle.tile_drop_rejected` event and nothing is written.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the battle table is unavailable.
pub async fn handle_drop_tile(
    command: &DropTile,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.drop_tile(
            command.character_id,
            command.target_index,
            command.correlation_id,
            clock,
        );
        Ok(())
    })
    .await
}

/// Handles `ResetBattle`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the battle table is unavailable.
pub async fn handle_reset_battle(
    command: &ResetBattle,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &Arc<dyn SnapshotRepository>,
) -> Result<BattleCommandResult, DomainError> {
    execute(command, battles, clock, repo, |battle| {
        battle.reset_battle(command.correlation_id, clock);
        Ok(())
    })
    .await
}

/// Handles `LoadBattle`: restores the battle from the store once per
/// lifecycle.
///
/// An already loaded battle returns at once without reading the store. The
/// store is read without holding the battle table lock; if another load wins
/// the race meanwhile, this one records nothing.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the store read fails or the
/// stored record cannot be decoded.
pub async fn handle_load_battle(
    command: &LoadBattle,
    battles: &ActiveBattles,
    clock: &dyn Clock,
    repo: &dyn SnapshotRepository,
) -> Result<BattleCommandResult, DomainError> {
    let battle_id = command.battle_id;
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        %battle_id,
        "handling battle command"
    );

    let state = battles.with_battle(battle_id, |battle| Ok(battle.load_state()))?;
    if state == LoadState::Loaded {
        debug!(%battle_id, "battle already loaded");
        return Ok(BattleCommandResult {
            battle_id,
            events: Vec::new(),
            persistence: None,
        });
    }

    let stored = match repo.load_snapshot(battle_id).await? {
        Some(snapshot) => Some(RestoredBattle {
            record: BattleRecord::from_payload(&snapshot.payload)?,
            version: snapshot.version,
        }),
        None => None,
    };

    let events = battles.with_battle(battle_id, |battle| {
        battle.load(stored, command.correlation_id, clock);
        Ok(drain_events(battle))
    })?;

    Ok(BattleCommandResult {
        battle_id,
        events,
        persistence: None,
    })
}
