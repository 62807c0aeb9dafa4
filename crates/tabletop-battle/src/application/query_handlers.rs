//! Query handlers for the Battle context.
//!
//! Queries read the in-memory battle and return read-only view DTOs. They
//! never create a battle.

use serde::Serialize;
use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::error::DomainError;
use uuid::Uuid;

use crate::application::active_battles::ActiveBattles;
use crate::domain::aggregates::{Battle, LoadState};
use crate::domain::grouping::TurnGroup;
use crate::domain::participants::DEFAULT_TEAM;

/// Read-only view of a battle's timeline.
#[derive(Debug, Serialize)]
pub struct TimelineView {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// Current version (events recorded).
    pub version: i64,
    /// Import lifecycle state.
    pub load_state: LoadState,
    /// Size of the scripted prefix.
    pub scripted_count: usize,
    /// Number of participants in battle.
    pub participant_count: usize,
    /// The timeline partitioned into turn groups.
    pub groups: Vec<TurnGroup>,
}

/// A selectable character and whether it is in battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterView {
    /// The character identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional portrait reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    /// Effective speed.
    pub speed: i64,
    /// The participant's team, or the default team when not in battle.
    pub team: String,
    /// Whether the character is a participant.
    pub is_in_battle: bool,
}

fn timeline_view(battle: &Battle) -> TimelineView {
    TimelineView {
        battle_id: battle.id,
        version: battle.version(),
        load_state: battle.load_state(),
        scripted_count: battle.scripted_count(),
        participant_count: battle.participants().len(),
        groups: battle.turn_groups(),
    }
}

fn character_views(battle: &Battle) -> Vec<CharacterView> {
    let participants = battle.participants();

    let from_roster = battle.roster().iter().map(|entry| {
        let participant = participants.get(entry.id);
        CharacterView {
            id: entry.id,
            name: entry.name.clone(),
            portrait: entry.portrait.clone(),
            speed: entry.speed_or_default(),
            team: participant.map_or_else(|| DEFAULT_TEAM.to_owned(), |p| p.team.clone()),
            is_in_battle: participant.is_some(),
        }
    });

    let off_roster = participants
        .iter()
        .filter(|p| !battle.roster().iter().any(|entry| entry.id == p.character_id))
        .map(|p| CharacterView {
            id: p.character_id,
            name: p.name.clone(),
            portrait: p.portrait.clone(),
            speed: p.speed,
            team: p.team.clone(),
            is_in_battle: true,
        });

    from_roster.chain(off_roster).collect()
}

/// Retrieves the grouped timeline of a battle.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the battle was never touched.
pub fn get_timeline(
    battle_id: Uuid,
    battles: &ActiveBattles,
) -> Result<TimelineView, DomainError> {
    battles.read_battle(battle_id, timeline_view)
}

/// Lists the roster characters of a battle, followed by participants the
/// roster no longer offers.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the battle was never touched.
pub fn get_characters(
    battle_id: Uuid,
    battles: &ActiveBattles,
) -> Result<Vec<CharacterView>, DomainError> {
    battles.read_battle(battle_id, character_views)
}
