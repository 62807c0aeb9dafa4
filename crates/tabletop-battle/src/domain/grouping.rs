//! Grouping of adjacent allied turns into simultaneous combat turns.

use serde::Serialize;
use uuid::Uuid;

use super::timeline::TurnTile;

/// A tile as seen through a group, tagged with whether it sits in the
/// scripted prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedTile {
    /// The tile itself.
    #[serde(flatten)]
    pub tile: TurnTile,
    /// Whether the tile's index was inside the scripted prefix.
    pub is_scripted: bool,
}

/// A maximal run of adjacent same-team tiles with no repeated character,
/// resolved together as one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnGroup {
    /// Team shared by every tile in the group.
    pub team: String,
    /// Whether the group's first tile is scripted.
    pub is_scripted: bool,
    /// The grouped tiles in timeline order.
    pub tiles: Vec<GroupedTile>,
}

impl TurnGroup {
    /// Number of tiles in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the group has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Whether a character already acts in this group.
    #[must_use]
    pub fn contains(&self, character_id: Uuid) -> bool {
        self.tiles.iter().any(|t| t.tile.character_id == character_id)
    }

    fn accepts(&self, tile: &TurnTile) -> bool {
        self.team == tile.team && !self.contains(tile.character_id)
    }
}

/// Partitions tiles into turn groups.
///
/// A new group starts whenever the team changes or the character already
/// acts in the current group.
#[must_use]
pub fn group_tiles(tiles: &[TurnTile], scripted_count: usize) -> Vec<TurnGroup> {
    let mut groups: Vec<TurnGroup> = Vec::new();

    for (index, tile) in tiles.iter().enumerate() {
        let grouped = GroupedTile {
            tile: tile.clone(),
            is_scripted: index < scripted_count,
        };

        if groups.last().is_some_and(|group| group.accepts(tile)) {
            if let Some(group) = groups.last_mut() {
                group.tiles.push(grouped);
            }
        } else {
            groups.push(TurnGroup {
                team: tile.team.clone(),
                is_scripted: grouped.is_scripted,
                tiles: vec![grouped],
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::participants::Participant;

    fn participant(team: &str) -> Participant {
        Participant {
            character_id: Uuid::new_v4(),
            name: "someone".to_owned(),
            portrait: None,
            speed: 10,
            team: team.to_owned(),
            next_turn_number: 1,
        }
    }

    fn shape(groups: &[TurnGroup]) -> Vec<usize> {
        groups.iter().map(TurnGroup::len).collect()
    }

    #[test]
    fn test_group_tiles_of_empty_timeline_is_empty() {
        assert!(group_tiles(&[], 0).is_empty());
    }

    #[test]
    fn test_group_tiles_merges_adjacent_allies() {
        let a = participant("heroes");
        let b = participant("heroes");
        let orc = participant("monsters");
        let tiles = vec![
            TurnTile::new(&a, 1),
            TurnTile::new(&b, 1),
            TurnTile::new(&orc, 1),
            TurnTile::new(&a, 2),
        ];

        let groups = group_tiles(&tiles, 0);

        assert_eq!(shape(&groups), vec![2, 1, 1]);
        assert_eq!(groups[0].team, "heroes");
        assert_eq!(groups[1].team, "monsters");
        assert_eq!(groups[2].team, "heroes");
    }

    #[test]
    fn test_group_tiles_splits_when_character_repeats() {
        let a = participant("heroes");
        let b = participant("heroes");
        let tiles = vec![
            TurnTile::new(&a, 1),
            TurnTile::new(&b, 1),
            TurnTile::new(&a, 2),
            TurnTile::new(&b, 2),
            TurnTile::new(&b, 3),
        ];

        let groups = group_tiles(&tiles, 0);

        assert_eq!(shape(&groups), vec![2, 2, 1]);
        for group in &groups {
            let distinct: HashSet<Uuid> =
                group.tiles.iter().map(|t| t.tile.character_id).collect();
            assert_eq!(distinct.len(), group.len());
        }
    }

    #[test]
    fn test_group_scripted_flag_follows_first_tile() {
        let a = participant("heroes");
        let b = participant("heroes");
        let c = participant("heroes");
        let tiles = vec![
            TurnTile::new(&a, 1),
            TurnTile::new(&b, 1),
            TurnTile::new(&c, 1),
            TurnTile::new(&a, 2),
        ];

        let groups = group_tiles(&tiles, 2);

        assert_eq!(shape(&groups), vec![3, 1]);
        assert!(groups[0].is_scripted);
        let flags: Vec<bool> = groups[0].tiles.iter().map(|t| t.is_scripted).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert!(!groups[1].is_scripted);
    }
}
