//! Participant registry: who is in the battle and how fast they are.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timing::DEFAULT_SPEED;

/// Team assigned to a character when it joins the battle.
pub const DEFAULT_TEAM: &str = "default";

/// A character offered by the external roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The character identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional portrait reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    /// Speed stat; `None` means the roster did not compute one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
}

impl RosterEntry {
    /// Returns the speed, falling back to [`DEFAULT_SPEED`].
    #[must_use]
    pub fn speed_or_default(&self) -> i64 {
        self.speed.unwrap_or(DEFAULT_SPEED)
    }
}

/// A character currently in combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// The character identifier.
    pub character_id: Uuid,
    /// Display name, refreshed from the roster.
    pub name: String,
    /// Optional portrait reference, refreshed from the roster.
    pub portrait: Option<String>,
    /// Speed stat, refreshed from the roster.
    pub speed: i64,
    /// Team the character fights for.
    pub team: String,
    /// The next turn number that has neither been taken nor manually placed.
    pub next_turn_number: u32,
}

impl Participant {
    /// Creates a participant that joins with its first turn ahead of it.
    #[must_use]
    pub fn from_roster(entry: &RosterEntry) -> Self {
        Self {
            character_id: entry.id,
            name: entry.name.clone(),
            portrait: entry.portrait.clone(),
            speed: entry.speed_or_default(),
            team: DEFAULT_TEAM.to_owned(),
            next_turn_number: 1,
        }
    }

    /// Copies display fields and speed from a roster entry.
    pub fn refresh_from(&mut self, entry: &RosterEntry) {
        self.name.clone_from(&entry.name);
        self.portrait.clone_from(&entry.portrait);
        self.speed = entry.speed_or_default();
    }
}

/// Participants in insertion order. Insertion order is the tiebreak when two
/// participants are due at the same time.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody is in battle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether the character is in battle.
    #[must_use]
    pub fn contains(&self, character_id: Uuid) -> bool {
        self.get(character_id).is_some()
    }

    /// Looks up a participant.
    #[must_use]
    pub fn get(&self, character_id: Uuid) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.character_id == character_id)
    }

    /// Looks up a participant for mutation.
    pub fn get_mut(&mut self, character_id: Uuid) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.character_id == character_id)
    }

    /// Appends a participant. Returns `false` and leaves the registry alone
    /// if the character is already present.
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.contains(participant.character_id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Removes a participant, preserving the order of the others.
    pub fn remove(&mut self, character_id: Uuid) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.character_id == character_id)?;
        Some(self.participants.remove(index))
    }

    /// Iterates participants in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Iterates participants mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.iter_mut()
    }

    /// Sets every participant's next turn back to 1.
    pub fn reset_turn_counters(&mut self) {
        for participant in &mut self.participants {
            participant.next_turn_number = 1;
        }
    }

    /// Removes everyone.
    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
