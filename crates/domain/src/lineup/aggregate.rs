//! Team lineup aggregate implementation.

use common::{AggregateType, GameId, TeamLineupId};

use crate::aggregate::{Aggregate, Restoration, Root, StateRestoredData};
use crate::value_objects::{
    BattingSlot, FieldPosition, JerseyNumber, MAX_NAME_LEN, PlayerId, TeamSide,
};

use super::{
    PlayerStatus, RosterEntry, SlotOccupant, SubstitutionRecord, TeamLineupError, TeamLineupEvent,
    TeamLineupState,
    events::{FieldPositionChangedData, PlayerAddedData, PlayerSubstitutedData},
};

/// Batting order and roster of one team in one game.
#[derive(Debug, Clone)]
pub struct TeamLineup {
    root: Root<TeamLineupId, TeamLineupEvent, TeamLineupState>,
}

/// A player entering the game.
#[derive(Debug, Clone)]
pub struct IncomingPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub jersey_number: JerseyNumber,
    pub position: FieldPosition,
}

impl Aggregate for TeamLineup {
    type Id = TeamLineupId;
    type Event = TeamLineupEvent;
    type State = TeamLineupState;

    fn aggregate_type() -> AggregateType {
        AggregateType::TeamLineup
    }

    fn state_from_creation(event: &TeamLineupEvent) -> Option<TeamLineupState> {
        match event {
            TeamLineupEvent::TeamLineupCreated(data) => Some(TeamLineupState::new(
                data.game_id.clone(),
                data.team_name.clone(),
                data.side,
            )),
            _ => None,
        }
    }

    fn apply_event(state: &mut TeamLineupState, event: &TeamLineupEvent) {
        match event {
            TeamLineupEvent::TeamLineupCreated(data) => {
                *state =
                    TeamLineupState::new(data.game_id.clone(), data.team_name.clone(), data.side);
            }
            TeamLineupEvent::PlayerAddedToLineup(data) => apply_player_added(state, data),
            TeamLineupEvent::PlayerSubstitutedIntoGame(data) => apply_substitution(state, data),
            TeamLineupEvent::FieldPositionChanged(data) => {
                if let Some(slot) = state.slot_of(&data.player_id)
                    && let Some(occupant) = state.slots.get_mut(&slot)
                {
                    occupant.position = data.to;
                }
            }
            TeamLineupEvent::ActionUndone(data) | TeamLineupEvent::ActionRedone(data) => {
                *state = data.state.clone();
            }
        }
    }

    fn restoration_event(
        kind: Restoration,
        data: StateRestoredData<TeamLineupState>,
    ) -> TeamLineupEvent {
        match kind {
            Restoration::Undo => TeamLineupEvent::ActionUndone(data),
            Restoration::Redo => TeamLineupEvent::ActionRedone(data),
        }
    }

    fn from_root(root: Root<TeamLineupId, TeamLineupEvent, TeamLineupState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &Root<TeamLineupId, TeamLineupEvent, TeamLineupState> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Root<TeamLineupId, TeamLineupEvent, TeamLineupState> {
        &mut self.root
    }

    fn game_id(&self) -> GameId {
        self.root.state().game_id.clone()
    }
}

fn apply_player_added(state: &mut TeamLineupState, data: &PlayerAddedData) {
    state.slots.insert(
        data.batting_slot,
        SlotOccupant {
            player_id: data.player_id.clone(),
            name: data.name.clone(),
            jersey_number: data.jersey_number,
            position: data.position,
        },
    );
    state.roster.insert(
        data.player_id.clone(),
        RosterEntry {
            name: data.name.clone(),
            jersey_number: data.jersey_number,
            starting_slot: Some(data.batting_slot),
            status: PlayerStatus::Active,
            has_reentered: false,
        },
    );
}

fn apply_substitution(state: &mut TeamLineupState, data: &PlayerSubstitutedData) {
    if let Some(outgoing) = state.roster.get_mut(&data.outgoing) {
        outgoing.status = PlayerStatus::SubstitutedOut {
            inning: data.inning,
        };
    }

    let incoming = state
        .roster
        .entry(data.incoming.clone())
        .or_insert_with(|| RosterEntry {
            name: data.incoming_name.clone(),
            jersey_number: data.jersey_number,
            starting_slot: None,
            status: PlayerStatus::Active,
            has_reentered: false,
        });
    incoming.status = PlayerStatus::Active;
    incoming.has_reentered |= data.is_reentry;

    state.slots.insert(
        data.batting_slot,
        SlotOccupant {
            player_id: data.incoming.clone(),
            name: data.incoming_name.clone(),
            jersey_number: data.jersey_number,
            position: data.position,
        },
    );
    state.substitutions.push(SubstitutionRecord {
        batting_slot: data.batting_slot,
        outgoing: data.outgoing.clone(),
        incoming: data.incoming.clone(),
        inning: data.inning,
        is_reentry: data.is_reentry,
    });
}

fn validate_name(name: &str, what: &str) -> Result<String, TeamLineupError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(TeamLineupError::InvalidName(format!(
            "{what} must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// Query methods
impl TeamLineup {
    pub fn side(&self) -> TeamSide {
        self.root.state().side
    }

    pub fn team_name(&self) -> &str {
        &self.root.state().team_name
    }

    pub fn player_at(&self, slot: BattingSlot) -> Option<&SlotOccupant> {
        self.root.state().slots.get(&slot)
    }

    /// Number of filled batting slots.
    pub fn batting_order_len(&self) -> u8 {
        self.root.state().slots.len() as u8
    }

    /// True when the filled slots are exactly 1..=len.
    pub fn has_contiguous_batting_order(&self) -> bool {
        self.root
            .state()
            .slots
            .keys()
            .enumerate()
            .all(|(i, slot)| slot.value() as usize == i + 1)
    }

    /// True if `player` is currently in the game.
    pub fn contains_player(&self, player: &PlayerId) -> bool {
        self.root
            .state()
            .roster
            .get(player)
            .is_some_and(RosterEntry::is_active)
    }

    pub fn substitutions(&self) -> &[SubstitutionRecord] {
        &self.root.state().substitutions
    }
}

// Command methods
impl TeamLineup {
    pub fn create_new(
        id: TeamLineupId,
        game_id: GameId,
        team_name: &str,
        side: TeamSide,
    ) -> Result<Self, TeamLineupError> {
        let team_name = validate_name(team_name, "Team name")?;
        let state = TeamLineupState::new(game_id.clone(), team_name.clone(), side);
        let creation = TeamLineupEvent::lineup_created(game_id, team_name, side);
        Ok(Self {
            root: Root::created(id, state, creation),
        })
    }

    /// Places a starter in an empty slot.
    pub fn add_player(
        &mut self,
        player: IncomingPlayer,
        batting_slot: BattingSlot,
    ) -> Result<(), TeamLineupError> {
        let name = validate_name(&player.name, "Player name")?;
        let state = self.root.state();

        if state.slots.contains_key(&batting_slot) {
            return Err(TeamLineupError::SlotOccupied { slot: batting_slot });
        }
        if state.roster.contains_key(&player.player_id) {
            return Err(TeamLineupError::PlayerAlreadyInLineup {
                player_id: player.player_id,
            });
        }
        if let Some(holder) = state.active_with_jersey(player.jersey_number) {
            return Err(TeamLineupError::DuplicateJersey {
                jersey_number: player.jersey_number,
                holder: holder.clone(),
            });
        }

        let event = TeamLineupEvent::PlayerAddedToLineup(PlayerAddedData {
            game_id: self.game_id(),
            player_id: player.player_id,
            name,
            jersey_number: player.jersey_number,
            batting_slot,
            position: player.position,
        });
        self.record(event);
        Ok(())
    }

    /// Replaces the occupant of `batting_slot` with `incoming`.
    ///
    /// A player who left the game may only come back if they started, have
    /// not re-entered before, and return to the slot they started in.
    pub fn substitute_player(
        &mut self,
        batting_slot: BattingSlot,
        incoming: IncomingPlayer,
        inning: u32,
    ) -> Result<(), TeamLineupError> {
        if inning == 0 {
            return Err(TeamLineupError::InvalidInning { inning });
        }
        let name = validate_name(&incoming.name, "Player name")?;
        let state = self.root.state();

        let outgoing = state
            .slots
            .get(&batting_slot)
            .ok_or(TeamLineupError::SlotEmpty { slot: batting_slot })?
            .player_id
            .clone();

        let is_reentry = match state.roster.get(&incoming.player_id) {
            None => false,
            Some(entry) if entry.is_active() => {
                return Err(TeamLineupError::PlayerAlreadyInLineup {
                    player_id: incoming.player_id,
                });
            }
            Some(entry) => {
                let eligible = !entry.has_reentered && entry.starting_slot == Some(batting_slot);
                if !eligible {
                    return Err(TeamLineupError::ReentryNotAllowed {
                        player_id: incoming.player_id,
                    });
                }
                true
            }
        };

        if let Some(holder) = state.active_with_jersey(incoming.jersey_number)
            && holder != &outgoing
        {
            return Err(TeamLineupError::DuplicateJersey {
                jersey_number: incoming.jersey_number,
                holder: holder.clone(),
            });
        }

        let event = TeamLineupEvent::player_substituted(PlayerSubstitutedData {
            game_id: self.game_id(),
            batting_slot,
            outgoing,
            incoming: incoming.player_id,
            incoming_name: name,
            jersey_number: incoming.jersey_number,
            position: incoming.position,
            inning,
            is_reentry,
        })?;
        self.record(event);
        Ok(())
    }

    /// Moves an active player to another defensive position.
    pub fn change_position(
        &mut self,
        player: &PlayerId,
        to: FieldPosition,
    ) -> Result<(), TeamLineupError> {
        let state = self.root.state();
        let occupant = state
            .slot_of(player)
            .and_then(|slot| state.slots.get(&slot))
            .ok_or_else(|| TeamLineupError::PlayerNotActive {
                player_id: player.clone(),
            })?;
        if occupant.position == to {
            return Ok(());
        }

        let event = TeamLineupEvent::FieldPositionChanged(FieldPositionChangedData {
            game_id: self.game_id(),
            player_id: player.clone(),
            from: occupant.position,
            to,
        });
        self.record(event);
        Ok(())
    }

    fn record(&mut self, event: TeamLineupEvent) {
        self.root.record(event, Self::apply_event);
    }
}
