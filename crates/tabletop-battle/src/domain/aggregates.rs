//! Aggregate roots for the Battle context.

use std::collections::HashSet;

use tabletop_core::aggregate::AggregateRoot;
use tabletop_core::clock::Clock;
use tabletop_core::error::DomainError;
use tabletop_core::event::EventMetadata;
use tracing::debug;
use uuid::Uuid;

use super::events::{
    BattleEvent, BattleEventKind, BattleLoaded, BattleReset, DropRejection, ParticipantAdded,
    ParticipantRemoved, RosterRefreshed, TeamChanged, TileDropRejected, TileDropped,
    TurnAdvanced, TurnRef,
};
use super::grouping::{TurnGroup, group_tiles};
use super::participants::{Participant, ParticipantRegistry, RosterEntry};
use super::record::{BattleRecord, ParticipantRecord, ScriptedTileRecord};
use super::timeline::{Timeline, TurnTile};

/// Whether the battle has taken its one import from the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Nothing imported yet; the next load reads the store.
    Uninitialized,
    /// Imported; further loads are ignored until the battle is reset.
    Loaded,
}

/// A stored record together with the version it was saved at.
#[derive(Debug, Clone)]
pub struct RestoredBattle {
    /// The decoded record.
    pub record: BattleRecord,
    /// Battle version when the record was written.
    pub version: i64,
}

/// The aggregate root for one battle.
#[derive(Debug)]
pub struct Battle {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (events recorded).
    pub(crate) version: i64,
    /// Import lifecycle.
    pub(crate) load_state: LoadState,
    /// Characters offered by the external roster, in roster order.
    pub(crate) roster: Vec<RosterEntry>,
    /// Characters in combat.
    pub(crate) participants: ParticipantRegistry,
    /// Upcoming turns.
    pub(crate) timeline: Timeline,
    /// Uncommitted events pending hand-off.
    uncommitted_events: Vec<BattleEvent>,
}

impl Battle {
    /// Creates an empty battle that has not imported anything yet.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            load_state: LoadState::Uninitialized,
            roster: Vec::new(),
            participants: ParticipantRegistry::new(),
            timeline: Timeline::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Current import lifecycle state.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Characters offered by the roster.
    #[must_use]
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Characters in combat.
    #[must_use]
    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    /// Upcoming turns in order.
    #[must_use]
    pub fn tiles(&self) -> &[TurnTile] {
        self.timeline.tiles()
    }

    /// Number of leading tiles locked in place.
    #[must_use]
    pub fn scripted_count(&self) -> usize {
        self.timeline.scripted_count()
    }

    /// The timeline partitioned into turn groups.
    #[must_use]
    pub fn turn_groups(&self) -> Vec<TurnGroup> {
        group_tiles(self.timeline.tiles(), self.timeline.scripted_count())
    }

    /// Replaces the roster and refreshes display data and speed of the
    /// participants it lists. Turn order is left alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if an entry has a blank name.
    pub fn set_available_characters(
        &mut self,
        characters: Vec<RosterEntry>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if let Some(blank) = characters.iter().find(|c| c.name.trim().is_empty()) {
            return Err(DomainError::Validation(format!(
                "roster entry {} has a blank name",
                blank.id
            )));
        }

        let mut seen = HashSet::new();
        self.roster = characters
            .into_iter()
            .filter(|c| seen.insert(c.id))
            .collect();

        let mut participants_refreshed = 0;
        for entry in &self.roster {
            if let Some(participant) = self.participants.get_mut(entry.id) {
                participant.refresh_from(entry);
                participants_refreshed += 1;
            }
        }

        self.record(
            BattleEventKind::RosterRefreshed(RosterRefreshed {
                battle_id: self.id,
                character_count: self.roster.len(),
                participants_refreshed,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Brings a roster character into the battle and rebuilds the timeline
    /// from scratch. Does nothing if the character is already in battle or
    /// not on the roster.
    pub fn add_character(&mut self, character_id: Uuid, correlation_id: Uuid, clock: &dyn Clock) {
        if self.participants.contains(character_id) {
            debug!(battle_id = %self.id, %character_id, "character already in battle");
            return;
        }
        let Some(entry) = self.roster.iter().find(|c| c.id == character_id) else {
            debug!(battle_id = %self.id, %character_id, "character not on roster");
            return;
        };

        let participant = Participant::from_roster(entry);
        let team = participant.team.clone();
        self.participants.insert(participant);
        self.timeline.rebuild(&mut self.participants);

        self.record(
            BattleEventKind::ParticipantAdded(ParticipantAdded {
                battle_id: self.id,
                character_id,
                team,
            }),
            correlation_id,
            clock,
        );
    }

    /// Takes a character out of the battle, strips its tiles and refills.
    /// Does nothing for a character not in battle.
    pub fn remove_character(
        &mut self,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        if self.participants.remove(character_id).is_none() {
            return;
        }
        let removed = self.timeline.remove_character(character_id);
        self.timeline.fill(&self.participants);

        self.record(
            BattleEventKind::ParticipantRemoved(ParticipantRemoved {
                battle_id: self.id,
                character_id,
                tiles_removed: removed.total,
                scripted_tiles_removed: removed.scripted,
            }),
            correlation_id,
            clock,
        );
    }

    /// Moves a participant and its existing tiles to another team. Does
    /// nothing for a character not in battle.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `team` is blank.
    pub fn set_team(
        &mut self,
        character_id: Uuid,
        team: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let team = team.trim();
        if team.is_empty() {
            return Err(DomainError::Validation("team must not be blank".to_owned()));
        }
        let Some(participant) = self.participants.get_mut(character_id) else {
            return Ok(());
        };
        team.clone_into(&mut participant.team);
        self.timeline.set_team(character_id, team);

        self.record(
            BattleEventKind::TeamChanged(TeamChanged {
                battle_id: self.id,
                character_id,
                team: team.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Resolves the whole leading turn group, then refills. Does nothing when
    /// the timeline is empty.
    pub fn next_turn(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let Some(group) = self.turn_groups().into_iter().next() else {
            return;
        };

        let taken = self.timeline.take_front(group.len());
        for tile in &taken {
            if let Some(participant) = self.participants.get_mut(tile.character_id) {
                participant.next_turn_number = participant
                    .next_turn_number
                    .max(tile.turn_number.saturating_add(1));
            }
        }
        self.timeline.fill(&self.participants);

        self.record(
            BattleEventKind::TurnAdvanced(TurnAdvanced {
                battle_id: self.id,
                team: group.team,
                turns: taken
                    .iter()
                    .map(|t| TurnRef {
                        character_id: t.character_id,
                        turn_number: t.turn_number,
                    })
                    .collect(),
            }),
            correlation_id,
            clock,
        );
    }

    /// Places a character's next turn before `target_index` of the current
    /// timeline and locks everything up to it.
    ///
    /// A target at or before one of the character's own locked turns, or
    /// past the end of the timeline, is refused without changing anything, as
    /// is a drop into a full timeline with no calculated tile left to evict;
    /// the refusal is still recorded so viewers can snap the tile back. Does
    /// nothing for a character not in battle.
    pub fn drop_tile(
        &mut self,
        character_id: Uuid,
        target_index: usize,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let Some(participant) = self.participants.get(character_id) else {
            return;
        };

        let rejection = if target_index > self.timeline.len() {
            Some(DropRejection::OutOfRange)
        } else if matches!(
            self.timeline.last_scripted_index_of(character_id),
            Some(locked) if target_index <= locked
        ) {
            Some(DropRejection::BeforeLockedTurn)
        } else if !self.timeline.has_room_for(character_id) {
            Some(DropRejection::TimelineLocked)
        } else {
            None
        };
        if let Some(reason) = rejection {
            debug!(battle_id = %self.id, %character_id, target_index, ?reason, "drop refused");
            self.record(
                BattleEventKind::TileDropRejected(TileDropRejected {
                    battle_id: self.id,
                    character_id,
                    target_index,
                    reason,
                }),
                correlation_id,
                clock,
            );
            return;
        }

        let turn_number = participant.next_turn_number;
        let tile = TurnTile::new(participant, turn_number);
        let position = self.timeline.place_scripted(tile, target_index);
        if let Some(participant) = self.participants.get_mut(character_id) {
            participant.next_turn_number = participant.next_turn_number.saturating_add(1);
        }
        self.timeline.fill(&self.participants);

        self.record(
            BattleEventKind::TileDropped(TileDropped {
                battle_id: self.id,
                turn: TurnRef {
                    character_id,
                    turn_number,
                },
                position,
                scripted_count: self.timeline.scripted_count(),
            }),
            correlation_id,
            clock,
        );
    }

    /// Clears participants and timeline and re-arms the one-shot import.
    /// The roster is kept.
    pub fn reset_battle(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.participants.clear();
        self.timeline.clear();
        self.load_state = LoadState::Uninitialized;

        self.record(
            BattleEventKind::BattleReset(BattleReset { battle_id: self.id }),
            correlation_id,
            clock,
        );
    }

    /// Imports the stored battle, once per lifecycle. Returns `false` without
    /// touching anything if the battle was already loaded.
    ///
    /// With no stored battle the current state is kept and the battle simply
    /// becomes loaded.
    pub fn load(
        &mut self,
        stored: Option<RestoredBattle>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        match self.load_state {
            LoadState::Loaded => return false,
            LoadState::Uninitialized => self.load_state = LoadState::Loaded,
        }

        let restored = stored.is_some();
        if let Some(RestoredBattle { record, version }) = stored {
            self.restore(record);
            self.observe_stored_version(version);
        }

        self.record(
            BattleEventKind::BattleLoaded(BattleLoaded {
                battle_id: self.id,
                restored,
                participant_count: self.participants.len(),
                scripted_count: self.timeline.scripted_count(),
            }),
            correlation_id,
            clock,
        );
        true
    }

    /// Raises the version to at least the version already in the store, so
    /// the next snapshot supersedes the stored one.
    pub fn observe_stored_version(&mut self, stored_version: i64) {
        self.version = self.version.max(stored_version);
    }

    /// Produces the stored form of the battle.
    #[must_use]
    pub fn to_record(&self) -> BattleRecord {
        let mut order: Vec<Uuid> = Vec::with_capacity(self.participants.len());
        for id in self
            .timeline
            .tiles()
            .iter()
            .map(|t| t.character_id)
            .chain(self.participants.iter().map(|p| p.character_id))
        {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        BattleRecord {
            scripted_count: Some(self.timeline.scripted_count()),
            participants: order
                .into_iter()
                .filter_map(|id| self.participants.get(id))
                .map(ParticipantRecord::from)
                .collect(),
            scripted_tiles: self.timeline.tiles()[..self.timeline.scripted_count()]
                .iter()
                .map(|t| ScriptedTileRecord {
                    character_id: t.character_id,
                    turn_number: t.turn_number,
                })
                .collect(),
        }
    }

    fn restore(&mut self, record: BattleRecord) {
        let record = record.normalized();
        let scripted_count = record.scripted_count();

        self.participants.clear();
        for stored in record.participants {
            self.participants.insert(Participant::from(stored));
        }
        for entry in &self.roster {
            if let Some(participant) = self.participants.get_mut(entry.id) {
                participant.refresh_from(entry);
            }
        }

        let prefix: Vec<TurnTile> = if record.scripted_tiles.is_empty() {
            // Legacy records only know the count: one tile per participant
            // in stored order.
            self.participants
                .iter()
                .take(scripted_count)
                .map(|p| TurnTile::new(p, p.next_turn_number))
                .collect()
        } else {
            record
                .scripted_tiles
                .iter()
                .take(scripted_count)
                .filter_map(|t| {
                    self.participants
                        .get(t.character_id)
                        .map(|p| TurnTile::new(p, t.turn_number))
                })
                .collect()
        };

        self.timeline.restore_scripted(prefix);
        self.timeline.fill(&self.participants);
    }

    fn record(&mut self, kind: BattleEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.version += 1;
        let event = BattleEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for Battle {
    type Event = BattleEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
