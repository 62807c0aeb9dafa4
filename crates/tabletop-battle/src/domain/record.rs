//! Persisted form of a battle.
//!
//! Records are written with an explicit `scriptedCount`. Older records packed
//! the scripted count into the first participant's `speed` as
//! `scriptedCount + 10000`; [`BattleRecord::from_payload`] still reads those.

use serde::{Deserialize, Serialize};
use tabletop_core::error::DomainError;
use uuid::Uuid;

use super::participants::{DEFAULT_TEAM, Participant};
use super::timing::DEFAULT_SPEED;

/// Offset the legacy format added to the scripted count.
pub const LEGACY_SCRIPTED_OFFSET: i64 = 10_000;

/// Highest turn number a stored record may carry.
pub const MAX_STORED_TURN_NUMBER: u32 = 1_000_000;

fn default_team() -> String {
    DEFAULT_TEAM.to_owned()
}

fn first_turn() -> u32 {
    1
}

/// A participant as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    /// The character identifier.
    pub character_id: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Optional portrait reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    /// Speed stat, or the legacy scripted-count sentinel on the first record.
    pub speed: i64,
    /// Team.
    #[serde(default = "default_team")]
    pub team: String,
    /// Next turn that has neither been taken nor placed by hand.
    #[serde(default = "first_turn")]
    pub next_turn_number: u32,
}

impl From<&Participant> for ParticipantRecord {
    fn from(participant: &Participant) -> Self {
        Self {
            character_id: participant.character_id,
            name: participant.name.clone(),
            portrait: participant.portrait.clone(),
            speed: participant.speed,
            team: participant.team.clone(),
            next_turn_number: participant.next_turn_number,
        }
    }
}

impl From<ParticipantRecord> for Participant {
    fn from(record: ParticipantRecord) -> Self {
        Self {
            character_id: record.character_id,
            name: record.name,
            portrait: record.portrait,
            speed: record.speed,
            team: record.team,
            next_turn_number: record.next_turn_number.max(1),
        }
    }
}

/// A scripted tile as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedTileRecord {
    /// The character taking the turn.
    pub character_id: Uuid,
    /// Which of the character's turns it is.
    pub turn_number: u32,
}

/// One stored battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    /// Size of the scripted prefix. Absent only in legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripted_count: Option<usize>,
    /// Participants ordered by first appearance in the timeline, then the
    /// ones with no tile.
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
    /// The scripted prefix, in timeline order.
    #[serde(default)]
    pub scripted_tiles: Vec<ScriptedTileRecord>,
}

impl BattleRecord {
    /// Decodes a stored payload, converting the legacy packing if present.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload is not a record
    /// or carries a turn number above [`MAX_STORED_TURN_NUMBER`].
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, DomainError> {
        let record: Self = serde_json::from_value(payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("battle record deserialization failed: {e}"))
        })?;
        record.check_turn_numbers()?;
        Ok(record.normalized())
    }

    fn check_turn_numbers(&self) -> Result<(), DomainError> {
        let highest = self
            .participants
            .iter()
            .map(|p| p.next_turn_number)
            .chain(self.scripted_tiles.iter().map(|t| t.turn_number))
            .max();
        match highest {
            Some(turn) if turn > MAX_STORED_TURN_NUMBER => Err(DomainError::Infrastructure(
                format!("battle record turn number {turn} exceeds {MAX_STORED_TURN_NUMBER}"),
            )),
            _ => Ok(()),
        }
    }

    /// Encodes the record for storage.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(self).expect("BattleRecord serialization is infallible")
    }

    /// Returns the record in explicit form.
    ///
    /// A record without `scriptedCount` whose first participant has a speed
    /// of at least [`LEGACY_SCRIPTED_OFFSET`] carries the scripted count in
    /// that speed; the participant's real speed is unknown and falls back to
    /// [`DEFAULT_SPEED`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.scripted_count.is_none() {
            let legacy = self
                .participants
                .first_mut()
                .filter(|p| p.speed >= LEGACY_SCRIPTED_OFFSET)
                .map(|p| {
                    let packed = p.speed - LEGACY_SCRIPTED_OFFSET;
                    p.speed = DEFAULT_SPEED;
                    packed
                });
            self.scripted_count =
                Some(legacy.map_or(0, |packed| usize::try_from(packed).unwrap_or(0)));
        }
        self
    }

    /// The resolved scripted count.
    #[must_use]
    pub fn scripted_count(&self) -> usize {
        self.scripted_count.unwrap_or(0)
    }
}
