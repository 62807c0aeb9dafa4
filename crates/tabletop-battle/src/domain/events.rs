//! Domain events for the Battle context.

use serde::{Deserialize, Serialize};
use tabletop_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

/// A single turn, referenced by character and turn number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRef {
    /// The character taking the turn.
    pub character_id: Uuid,
    /// Which of the character's turns it is.
    pub turn_number: u32,
}

/// Emitted when the external roster is refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRefreshed {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// Number of characters now offered by the roster.
    pub character_count: usize,
    /// Number of participants whose display data or speed was refreshed.
    pub participants_refreshed: usize,
}

/// Emitted when a character joins the battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantAdded {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character that joined.
    pub character_id: Uuid,
    /// The team it joined with.
    pub team: String,
}

/// Emitted when a character leaves the battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRemoved {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character that left.
    pub character_id: Uuid,
    /// Tiles stripped from the timeline.
    pub tiles_removed: usize,
    /// How many of those were scripted.
    pub scripted_tiles_removed: usize,
}

/// Emitted when a participant switches team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamChanged {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character whose team changed.
    pub character_id: Uuid,
    /// The new team.
    pub team: String,
}

/// Emitted when the leading turn group has acted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnAdvanced {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// Team of the group that acted.
    pub team: String,
    /// The turns that were consumed, in timeline order.
    pub turns: Vec<TurnRef>,
}

/// Emitted when the game master places a character's next turn by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDropped {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The placed turn.
    pub turn: TurnRef,
    /// Index the tile landed at.
    pub position: usize,
    /// Size of the scripted prefix afterwards.
    pub scripted_count: usize,
}

/// Why a drop was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropRejection {
    /// The target lies at or before a turn of the same character that is
    /// already locked in place.
    BeforeLockedTurn,
    /// The target lies past the end of the timeline.
    OutOfRange,
    /// The timeline is full of locked turns and the character has none to
    /// give up.
    TimelineLocked,
}

/// Emitted when a drop is refused, so viewers snap the tile back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDropRejected {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character that was dragged.
    pub character_id: Uuid,
    /// The requested target index.
    pub target_index: usize,
    /// Why the drop was refused.
    pub reason: DropRejection,
}

/// Emitted when the battle is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReset {
    /// The battle identifier.
    pub battle_id: Uuid,
}

/// Emitted when the battle has been restored from the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleLoaded {
    /// The battle identifier.
    pub battle_id: Uuid,
    /// Whether a stored record existed.
    pub restored: bool,
    /// Participants restored.
    pub participant_count: usize,
    /// Scripted tiles restored.
    pub scripted_count: usize,
}

/// Event type identifier for [`RosterRefreshed`].
pub const ROSTER_REFRESHED_EVENT_TYPE: &str = "battle.roster_refreshed";

/// Event type identifier for [`ParticipantAdded`].
pub const PARTICIPANT_ADDED_EVENT_TYPE: &str = "battle.participant_added";

/// Event type identifier for [`ParticipantRemoved`].
pub const PARTICIPANT_REMOVED_EVENT_TYPE: &str = "battle.participant_removed";

/// Event type identifier for [`TeamChanged`].
pub const TEAM_CHANGED_EVENT_TYPE: &str = "battle.team_changed";

/// Event type identifier for [`TurnAdvanced`].
pub const TURN_ADVANCED_EVENT_TYPE: &str = "battle.turn_advanced";

/// Event type identifier for [`TileDropped`].
pub const TILE_DROPPED_EVENT_TYPE: &str = "battle.tile_dropped";

/// Event type identifier for [`TileDropRejected`].
pub const TILE_DROP_REJECTED_EVENT_TYPE: &str = "battle.tile_drop_rejected";

/// Event type identifier for [`BattleReset`].
pub const BATTLE_RESET_EVENT_TYPE: &str = "battle.battle_reset";

/// Event type identifier for [`BattleLoaded`].
pub const BATTLE_LOADED_EVENT_TYPE: &str = "battle.battle_loaded";

/// Event payload variants for the Battle context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BattleEventKind {
    /// The roster has been refreshed.
    RosterRefreshed(RosterRefreshed),
    /// A participant has joined.
    ParticipantAdded(ParticipantAdded),
    /// A participant has left.
    ParticipantRemoved(ParticipantRemoved),
    /// A participant has switched team.
    TeamChanged(TeamChanged),
    /// The leading turn group has acted.
    TurnAdvanced(TurnAdvanced),
    /// A turn has been placed by hand.
    TileDropped(TileDropped),
    /// A drop has been refused.
    TileDropRejected(TileDropRejected),
    /// The battle has been cleared.
    BattleReset(BattleReset),
    /// The battle has been restored from storage.
    BattleLoaded(BattleLoaded),
}

impl BattleEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RosterRefreshed(_) => ROSTER_REFRESHED_EVENT_TYPE,
            Self::ParticipantAdded(_) => PARTICIPANT_ADDED_EVENT_TYPE,
            Self::ParticipantRemoved(_) => PARTICIPANT_REMOVED_EVENT_TYPE,
            Self::TeamChanged(_) => TEAM_CHANGED_EVENT_TYPE,
            Self::TurnAdvanced(_) => TURN_ADVANCED_EVENT_TYPE,
            Self::TileDropped(_) => TILE_DROPPED_EVENT_TYPE,
            Self::TileDropRejected(_) => TILE_DROP_REJECTED_EVENT_TYPE,
            Self::BattleReset(_) => BATTLE_RESET_EVENT_TYPE,
            Self::BattleLoaded(_) => BATTLE_LOADED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Battle context.
#[derive(Debug, Clone)]
pub struct BattleEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: BattleEventKind,
}

impl DomainEvent for BattleEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("BattleEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn changes_state(&self) -> bool {
        !matches!(self.kind, BattleEventKind::TileDropRejected(_))
    }
}
