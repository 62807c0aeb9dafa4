//! Commands for the Battle context.

use tabletop_core::command::Command;
use uuid::Uuid;

use super::participants::RosterEntry;

/// Command to replace the roster of characters available to the battle.
#[derive(Debug, Clone)]
pub struct SetAvailableCharacters {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The characters offered by the roster.
    pub characters: Vec<RosterEntry>,
}

impl Command for SetAvailableCharacters {
    fn command_type(&self) -> &'static str {
        "battle.set_available_characters"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to bring a roster character into the battle.
#[derive(Debug, Clone)]
pub struct AddCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character to add.
    pub character_id: Uuid,
}

impl Command for AddCharacter {
    fn command_type(&self) -> &'static str {
        "battle.add_character"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to take a character out of the battle.
#[derive(Debug, Clone)]
pub struct RemoveCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The character to remove.
    pub character_id: Uuid,
}

impl Command for RemoveCharacter {
    fn command_type(&self) -> &'static str {
        "battle.remove_character"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to move a participant to another team.
#[derive(Debug, Clone)]
pub struct SetTeam {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The participant.
    pub character_id: Uuid,
    /// The new team.
    pub team: String,
}

impl Command for SetTeam {
    fn command_type(&self) -> &'static str {
        "battle.set_team"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to resolve the leading turn group.
#[derive(Debug, Clone)]
pub struct NextTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
}

impl Command for NextTurn {
    fn command_type(&self) -> &'static str {
        "battle.next_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to place a character's next turn at a chosen timeline slot.
#[derive(Debug, Clone)]
pub struct DropTile {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
    /// The dragged character.
    pub character_id: Uuid,
    /// Index in the current timeline the turn should land before.
    pub target_index: usize,
}

impl Command for DropTile {
    fn command_type(&self) -> &'static str {
        "battle.drop_tile"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to clear the battle.
#[derive(Debug, Clone)]
pub struct ResetBattle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
}

impl Command for ResetBattle {
    fn command_type(&self) -> &'static str {
        "battle.reset_battle"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}

/// Command to restore the battle from the external store, once per battle
/// lifecycle.
#[derive(Debug, Clone)]
pub struct LoadBattle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle identifier.
    pub battle_id: Uuid,
}

impl Command for LoadBattle {
    fn command_type(&self) -> &'static str {
        "battle.load_battle"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.battle_id
    }
}
