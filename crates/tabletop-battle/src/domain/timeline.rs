//! The rolling turn timeline.
//!
//! The timeline holds [`TIMELINE_LENGTH`] upcoming turns. The leading
//! `scripted_count` tiles were placed by hand and keep whatever order the game
//! master gave them; every tile after that is calculated and stays sorted by
//! timing.

use serde::Serialize;
use uuid::Uuid;

use super::participants::{Participant, ParticipantRegistry};
use super::timing::{TIMELINE_LENGTH, timing};

/// Stable identifier of the `turn_number`-th turn of a character.
///
/// Regenerating the same turn yields the same id, so consumers can tell a
/// moved tile from a new one.
#[must_use]
pub fn tile_id(character_id: Uuid, turn_number: u32) -> Uuid {
    Uuid::new_v5(&character_id, &turn_number.to_be_bytes())
}

/// One projected future turn.
///
/// Tiles carry a snapshot of the participant's display data so they stay
/// renderable after the participant leaves the battle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnTile {
    /// Derived from `character_id` and `turn_number`.
    pub id: Uuid,
    /// The character taking the turn.
    pub character_id: Uuid,
    /// Display name at the time the tile was generated.
    pub name: String,
    /// Portrait at the time the tile was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    /// Team of the character.
    pub team: String,
    /// Speed used to compute `timing`.
    pub speed: i64,
    /// Which of the character's turns this is, starting at 1.
    pub turn_number: u32,
    /// When the turn is due; lower is sooner.
    pub timing: f64,
}

impl TurnTile {
    /// Generates the tile for a participant's `turn_number`-th turn.
    #[must_use]
    pub fn new(participant: &Participant, turn_number: u32) -> Self {
        Self {
            id: tile_id(participant.character_id, turn_number),
            character_id: participant.character_id,
            name: participant.name.clone(),
            portrait: participant.portrait.clone(),
            team: participant.team.clone(),
            speed: participant.speed,
            turn_number,
            timing: timing(turn_number, participant.speed),
        }
    }
}

/// How many tiles a removal took out of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemovedTiles {
    /// All tiles removed.
    pub total: usize,
    /// Tiles removed from the scripted prefix.
    pub scripted: usize,
}

/// Ordered upcoming turns plus the size of the manually placed prefix.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    tiles: Vec<TurnTile>,
    scripted_count: usize,
}

impl Timeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The tiles in turn order.
    #[must_use]
    pub fn tiles(&self) -> &[TurnTile] {
        &self.tiles
    }

    /// Number of leading tiles that are locked in place.
    #[must_use]
    pub fn scripted_count(&self) -> usize {
        self.scripted_count
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the timeline has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drops every tile and unlocks the prefix.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.scripted_count = 0;
    }

    /// Extends the calculated suffix up to [`TIMELINE_LENGTH`] tiles.
    ///
    /// Repeatedly appends the turn that is due soonest among all
    /// participants. Ties go to the participant that joined first. The
    /// scripted prefix is never touched; the suffix is re-sorted by timing
    /// with a stable sort, so equal timings keep generation order.
    pub fn fill(&mut self, participants: &ParticipantRegistry) {
        let mut cursors: Vec<(&Participant, u32)> = participants
            .iter()
            .filter_map(|p| self.next_turn_to_generate(p).map(|turn| (p, turn)))
            .collect();

        while self.tiles.len() < TIMELINE_LENGTH {
            let Some(index) = cursors
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    timing(a.1, a.0.speed).total_cmp(&timing(b.1, b.0.speed))
                })
                .map(|(index, _)| index)
            else {
                break;
            };
            let (participant, turn_number) = cursors[index];
            self.tiles.push(TurnTile::new(participant, turn_number));
            // A participant whose turn counter is exhausted stops generating.
            match turn_number.checked_add(1) {
                Some(next) => cursors[index].1 = next,
                None => {
                    cursors.remove(index);
                }
            }
        }

        self.scripted_count = self.scripted_count.min(self.tiles.len());
        self.tiles[self.scripted_count..].sort_by(|a, b| a.timing.total_cmp(&b.timing));
    }

    /// Regenerates the whole timeline from turn 1 for everyone.
    pub fn rebuild(&mut self, participants: &mut ParticipantRegistry) {
        participants.reset_turn_counters();
        self.clear();
        self.fill(participants);
    }

    /// Removes up to `count` leading tiles and returns them.
    pub fn take_front(&mut self, count: usize) -> Vec<TurnTile> {
        let count = count.min(self.tiles.len());
        let taken: Vec<TurnTile> = self.tiles.drain(..count).collect();
        self.scripted_count = self.scripted_count.saturating_sub(taken.len());
        taken
    }

    /// Strips every tile of a character, shrinking the scripted prefix by the
    /// number of stripped tiles that were inside it.
    pub fn remove_character(&mut self, character_id: Uuid) -> RemovedTiles {
        let scripted = self.tiles[..self.scripted_count]
            .iter()
            .filter(|t| t.character_id == character_id)
            .count();
        let before = self.tiles.len();
        self.tiles.retain(|t| t.character_id != character_id);
        self.scripted_count -= scripted;
        RemovedTiles {
            total: before - self.tiles.len(),
            scripted,
        }
    }

    /// Index of the last scripted tile belonging to a character.
    #[must_use]
    pub fn last_scripted_index_of(&self, character_id: Uuid) -> Option<usize> {
        self.tiles[..self.scripted_count]
            .iter()
            .rposition(|t| t.character_id == character_id)
    }

    /// Whether a drop of the character can be placed without evicting a
    /// locked turn.
    ///
    /// A full timeline makes room by giving up the character's own tiles or,
    /// failing that, its last calculated tile.
    #[must_use]
    pub fn has_room_for(&self, character_id: Uuid) -> bool {
        self.tiles.len() < TIMELINE_LENGTH
            || self.scripted_count < self.tiles.len()
            || self.tiles.iter().any(|t| t.character_id == character_id)
    }

    /// Moves a character's next turn to `target_index` and locks everything up
    /// to and including it.
    ///
    /// All existing tiles of the character are removed first; `target_index`
    /// refers to the timeline before that removal. Returns the index the tile
    /// landed at. Check [`Timeline::has_room_for`] first.
    pub fn place_scripted(&mut self, tile: TurnTile, target_index: usize) -> usize {
        let character_id = tile.character_id;
        let target_index = target_index.min(self.tiles.len());
        let mut insert_at = self.tiles[..target_index]
            .iter()
            .filter(|t| t.character_id != character_id)
            .count();

        self.tiles.retain(|t| t.character_id != character_id);

        // A character with no tile in a full timeline evicts the last
        // calculated tile.
        if self.tiles.len() >= TIMELINE_LENGTH && self.scripted_count < self.tiles.len() {
            self.tiles.truncate(TIMELINE_LENGTH - 1);
            insert_at = insert_at.min(self.tiles.len());
        }

        self.tiles.insert(insert_at, tile);
        self.scripted_count = insert_at + 1;
        insert_at
    }

    /// Rewrites the team on every tile of a character. Returns how many tiles
    /// were touched.
    pub fn set_team(&mut self, character_id: Uuid, team: &str) -> usize {
        let mut touched = 0;
        for tile in self
            .tiles
            .iter_mut()
            .filter(|t| t.character_id == character_id)
        {
            team.clone_into(&mut tile.team);
            touched += 1;
        }
        touched
    }

    /// Replaces the timeline with a restored scripted prefix. Call
    /// [`Timeline::fill`] afterwards to complete it.
    pub fn restore_scripted(&mut self, mut prefix: Vec<TurnTile>) {
        prefix.truncate(TIMELINE_LENGTH);
        self.scripted_count = prefix.len();
        self.tiles = prefix;
    }

    /// First turn number not yet represented in the timeline for `participant`.
    ///
    /// `None` once the character holds a tile for the last representable turn.
    fn next_turn_to_generate(&self, participant: &Participant) -> Option<u32> {
        self.tiles
            .iter()
            .filter(|t| t.character_id == participant.character_id)
            .try_fold(participant.next_turn_number, |next, t| {
                t.turn_number.checked_add(1).map(|after| next.max(after))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(name: &str, speed: i64) -> Participant {
        Participant {
            character_id: Uuid::new_v4(),
            name: name.to_owned(),
            portrait: None,
            speed,
            team: "heroes".to_owned(),
            next_turn_number: 1,
        }
    }

    fn registry(participants: &[&Participant]) -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::new();
        for p in participants {
            registry.insert((*p).clone());
        }
        registry
    }

    fn turns(timeline: &Timeline) -> Vec<(Uuid, u32)> {
        timeline
            .tiles()
            .iter()
            .map(|t| (t.character_id, t.turn_number))
            .collect()
    }

    #[test]
    fn test_tile_id_is_stable_per_character_and_turn() {
        let character_id = Uuid::new_v4();

        assert_eq!(tile_id(character_id, 3), tile_id(character_id, 3));
        assert_ne!(tile_id(character_id, 3), tile_id(character_id, 4));
        assert_ne!(tile_id(character_id, 3), tile_id(Uuid::new_v4(), 3));
    }

    #[test]
    fn test_fill_interleaves_by_timing_with_insertion_order_tiebreak() {
        // Arrange
        let a = participant("A", 10);
        let b = participant("B", 20);
        let mut participants = registry(&[&a, &b]);
        let mut timeline = Timeline::new();

        // Act
        timeline.rebuild(&mut participants);

        // Assert
        assert_eq!(timeline.len(), TIMELINE_LENGTH);
        assert_eq!(timeline.scripted_count(), 0);
        let expected = vec![
            (b.character_id, 1), // 50
            (a.character_id, 1), // 100, A joined first
            (b.character_id, 2), // 100
            (b.character_id, 3), // 150
            (a.character_id, 2), // 200
            (b.character_id, 4), // 200
        ];
        assert_eq!(turns(&timeline)[..6], expected[..]);
        let timings: Vec<f64> = timeline.tiles().iter().map(|t| t.timing).collect();
        assert!(timings.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_fill_with_no_participants_leaves_timeline_empty() {
        let mut timeline = Timeline::new();

        timeline.fill(&ParticipantRegistry::new());

        assert!(timeline.is_empty());
    }

    #[test]
    fn test_fill_continues_after_turns_already_present() {
        // Arrange
        let a = participant("A", 10);
        let mut participants = registry(&[&a]);
        let mut timeline = Timeline::new();
        timeline.rebuild(&mut participants);

        // Act
        timeline.take_front(3);
        timeline.fill(&participants);

        // Assert
        let numbers: Vec<u32> = timeline.tiles().iter().map(|t| t.turn_number).collect();
        assert_eq!(numbers, (4..=15).collect::<Vec<u32>>());
    }

    #[test]
    fn test_fill_never_reorders_scripted_prefix() {
        // Arrange
        let slow = participant("Slow", 1);
        let fast = participant("Fast", 100);
        let participants = registry(&[&slow, &fast]);
        let mut timeline = Timeline::new();
        timeline.restore_scripted(vec![TurnTile::new(&slow, 1), TurnTile::new(&fast, 1)]);

        // Act
        timeline.fill(&participants);

        // Assert
        assert_eq!(timeline.scripted_count(), 2);
        assert_eq!(timeline.tiles()[0].character_id, slow.character_id);
        assert_eq!(timeline.tiles()[1].character_id, fast.character_id);
        assert_eq!(timeline.tiles()[2].character_id, fast.character_id);
        assert_eq!(timeline.tiles()[2].turn_number, 2);
        assert_eq!(timeline.len(), TIMELINE_LENGTH);
    }

    #[test]
    fn test_place_scripted_moves_character_and_locks_prefix() {
        // Arrange
        let a = participant("A", 10);
        let b = participant("B", 20);
        let mut participants = registry(&[&a, &b]);
        let mut timeline = Timeline::new();
        timeline.rebuild(&mut participants);

        // Act
        let landed = timeline.place_scripted(TurnTile::new(&a, 1), 0);

        // Assert
        assert_eq!(landed, 0);
        assert_eq!(timeline.scripted_count(), 1);
        assert_eq!(timeline.tiles()[0].character_id, a.character_id);
        assert!(
            timeline.tiles()[1..]
                .iter()
                .all(|t| t.character_id == b.character_id)
        );
    }

    #[test]
    fn test_place_scripted_counts_only_other_tiles_before_target() {
        // Arrange: B1 A1 B2 B3 A2 B4 ...
        let a = participant("A", 10);
        let b = participant("B", 20);
        let mut participants = registry(&[&a, &b]);
        let mut timeline = Timeline::new();
        timeline.rebuild(&mut participants);

        // Act: before index 5 sit B1 A1 B2 B3 A2, of which three are B's.
        let landed = timeline.place_scripted(TurnTile::new(&a, 1), 5);

        // Assert
        assert_eq!(landed, 3);
        assert_eq!(timeline.scripted_count(), 4);
        assert_eq!(timeline.tiles()[3].character_id, a.character_id);
    }

    #[test]
    fn test_place_scripted_into_full_timeline_keeps_length() {
        // Arrange: a character with no tile in a full timeline
        let a = participant("A", 10);
        let ghost = participant("Ghost", 1);
        let mut participants = registry(&[&a]);
        let mut timeline = Timeline::new();
        timeline.rebuild(&mut participants);

        // Act
        let landed = timeline.place_scripted(TurnTile::new(&ghost, 1), TIMELINE_LENGTH);

        // Assert
        assert_eq!(timeline.len(), TIMELINE_LENGTH);
        assert_eq!(landed, TIMELINE_LENGTH - 1);
        assert_eq!(timeline.scripted_count(), TIMELINE_LENGTH);
    }

    #[test]
    fn test_remove_character_shrinks_scripted_prefix_by_scripted_tiles_only() {
        // Arrange
        let a = participant("A", 10);
        let b = participant("B", 10);
        let mut timeline = Timeline::new();
        timeline.restore_scripted(vec![
            TurnTile::new(&a, 1),
            TurnTile::new(&b, 1),
            TurnTile::new(&a, 2),
        ]);
        timeline.fill(&registry(&[&a, &b]));
        let a_total = timeline
            .tiles()
            .iter()
            .filter(|t| t.character_id == a.character_id)
            .count();

        // Act
        let removed = timeline.remove_character(a.character_id);

        // Assert
        assert_eq!(removed.scripted, 2);
        assert_eq!(removed.total, a_total);
        assert_eq!(timeline.scripted_count(), 1);
        assert_eq!(timeline.tiles()[0].character_id, b.character_id);
    }

    #[test]
    fn test_take_front_floors_scripted_count_at_zero() {
        let a = participant("A", 10);
        let mut timeline = Timeline::new();
        timeline.restore_scripted(vec![TurnTile::new(&a, 1)]);
        timeline.fill(&registry(&[&a]));

        let taken = timeline.take_front(3);

        assert_eq!(taken.len(), 3);
        assert_eq!(timeline.scripted_count(), 0);
    }

    #[test]
    fn test_set_team_updates_only_that_characters_tiles() {
        let a = participant("A", 10);
        let b = participant("B", 20);
        let mut participants = registry(&[&a, &b]);
        let mut timeline = Timeline::new();
        timeline.rebuild(&mut participants);

        let touched = timeline.set_team(a.character_id, "villains");

        for tile in timeline.tiles() {
            let expected = if tile.character_id == a.character_id {
                "villains"
            } else {
                "heroes"
            };
            assert_eq!(tile.team, expected);
        }
        assert_eq!(touched, 4);
    }

    #[test]
    fn test_fill_stops_generating_for_exhausted_turn_counter() {
        let mut worn = participant("Worn", 1_000);
        worn.next_turn_number = u32::MAX - 1;
        let mut timeline = Timeline::new();

        timeline.fill(&registry(&[&worn]));

        let expected = vec![
            (worn.character_id, u32::MAX - 1),
            (worn.character_id, u32::MAX),
        ];
        assert_eq!(turns(&timeline), expected);
        timeline.fill(&registry(&[&worn]));
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_has_room_for_fully_scripted_timeline_needs_own_tile() {
        let a = participant("A", 10);
        let b = participant("B", 20);
        let outsider = participant("C", 1);
        let prefix: Vec<TurnTile> = (1..=6)
            .flat_map(|turn| [TurnTile::new(&a, turn), TurnTile::new(&b, turn)])
            .collect();
        let mut timeline = Timeline::new();
        timeline.restore_scripted(prefix);

        assert_eq!(timeline.scripted_count(), TIMELINE_LENGTH);
        assert!(timeline.has_room_for(a.character_id));
        assert!(!timeline.has_room_for(outsider.character_id));
    }
}
