//! Adventurers: roles, capabilities, hands and the per-turn action budget.
//!
//! This module contains:
//! - The six roles and the one special capability each grants
//! - Card identifiers for the treasure deck
//! - Player state (position, hand, action points, once-per-turn flags)

use crate::board::TreasureKind;
use crate::grid::Cell;
use serde::{Deserialize, Serialize};

/// Player identifier (index into the turn order)
pub type PlayerId = u8;

/// Action points granted at the start of every turn
pub const ACTIONS_PER_TURN: u8 = 3;

/// Cards a player may hold at the end of a draw
pub const HAND_LIMIT: usize = 5;

/// Matching cards needed to claim a treasure
pub const CARDS_TO_COLLECT: usize = 4;

/// Special capability granted by a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Once per turn, move to any dry tile
    Flight,
    /// Once per turn, move another player up to two tiles
    Command,
    /// Move diagonally as well as orthogonally
    Diagonal,
    /// Swim through flooded and sunk cells to the first dry tile
    Underwater,
    /// Shore up two tiles for one action
    DoubleShoreUp,
    /// Give treasure cards without sharing a tile
    RemoteGive,
}

/// Adventurer roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Navigator,
    Messenger,
    Engineer,
    Pilot,
    Explorer,
    Diver,
}

impl Role {
    /// The full role pool
    pub const ALL: [Role; 6] = [
        Role::Navigator,
        Role::Messenger,
        Role::Engineer,
        Role::Pilot,
        Role::Explorer,
        Role::Diver,
    ];

    /// The capability this role grants
    pub fn capability(&self) -> Capability {
        match self {
            Role::Navigator => Capability::Command,
            Role::Messenger => Capability::RemoteGive,
            Role::Engineer => Capability::DoubleShoreUp,
            Role::Pilot => Capability::Flight,
            Role::Explorer => Capability::Diagonal,
            Role::Diver => Capability::Underwater,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Navigator => "Navigator",
            Role::Messenger => "Messenger",
            Role::Engineer => "Engineer",
            Role::Pilot => "Pilot",
            Role::Explorer => "Explorer",
            Role::Diver => "Diver",
        }
    }
}

/// A card from the treasure deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Card {
    /// One of the four treasure suits
    Treasure(TreasureKind),
    /// Fly any group of co-located players anywhere
    HelicopterLift,
    /// Shore up any tile on the board
    Sandbag,
    /// Raises the water. Resolved on draw, never held.
    WatersRise,
}

impl Card {
    /// Treasure cards in the deck per treasure kind
    pub const PER_TREASURE: usize = 5;
    /// Helicopter Lift cards in the deck
    pub const HELICOPTER_LIFTS: usize = 3;
    /// Sandbag cards in the deck
    pub const SANDBAGS: usize = 2;
    /// Waters Rise cards, shuffled in after the opening deal
    pub const WATERS_RISE: usize = 3;
    /// Every card the treasure deck ever holds
    pub const DECK_SIZE: usize = 4 * Self::PER_TREASURE
        + Self::HELICOPTER_LIFTS
        + Self::SANDBAGS
        + Self::WATERS_RISE;

    /// The deck dealt from at setup (no Waters Rise yet)
    pub fn opening_deck() -> Vec<Card> {
        let mut deck = Vec::with_capacity(Self::DECK_SIZE);
        for kind in TreasureKind::ALL {
            deck.extend(std::iter::repeat(Card::Treasure(kind)).take(Self::PER_TREASURE));
        }
        deck.extend(std::iter::repeat(Card::HelicopterLift).take(Self::HELICOPTER_LIFTS));
        deck.extend(std::iter::repeat(Card::Sandbag).take(Self::SANDBAGS));
        deck
    }

    /// The Waters Rise cards added after the opening deal
    pub fn waters_rise_cards() -> impl Iterator<Item = Card> {
        std::iter::repeat(Card::WatersRise).take(Self::WATERS_RISE)
    }

    /// The treasure suit, for treasure cards
    pub fn treasure(&self) -> Option<TreasureKind> {
        match self {
            Card::Treasure(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Only treasure cards may be handed to another player
    pub fn is_transferable(&self) -> bool {
        matches!(self, Card::Treasure(_))
    }
}

/// A single adventurer's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Seat in the turn order
    pub id: PlayerId,
    pub role: Role,
    /// Current cell
    pub position: Cell,
    /// Cards in hand, in the order received
    pub hand: Vec<Card>,
    /// Actions left this turn
    pub action_points: u8,
    /// Flight already used this turn
    pub flight_used: bool,
    /// Command already used this turn
    pub command_used: bool,
    /// An engineer's free second shore-up is available
    pub bonus_shore_up: bool,
}

impl Player {
    /// Create a new player at a starting cell with an empty hand
    pub fn new(id: PlayerId, role: Role, position: Cell) -> Self {
        Self {
            id,
            role,
            position,
            hand: Vec::new(),
            action_points: ACTIONS_PER_TURN,
            flight_used: false,
            command_used: false,
            bonus_shore_up: false,
        }
    }

    pub fn capability(&self) -> Capability {
        self.role.capability()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.role.capability() == capability
    }

    /// Can this player still fly this turn?
    pub fn can_fly(&self) -> bool {
        self.has_capability(Capability::Flight) && !self.flight_used
    }

    /// Can this player still command another player this turn?
    pub fn can_command(&self) -> bool {
        self.has_capability(Capability::Command) && !self.command_used
    }

    pub fn has_action_points(&self) -> bool {
        self.action_points > 0
    }

    /// Spend one action point. Returns false if none are left.
    pub fn spend_action(&mut self) -> bool {
        if self.action_points == 0 {
            return false;
        }
        self.action_points -= 1;
        true
    }

    /// Reset the turn budget and once-per-turn flags
    pub fn start_turn(&mut self) {
        self.action_points = ACTIONS_PER_TURN;
        self.flight_used = false;
        self.command_used = false;
        self.bonus_shore_up = false;
    }

    pub fn hand_size(&self) -> usize {
        self.hand.len()
    }

    pub fn over_hand_limit(&self) -> bool {
        self.hand.len() > HAND_LIMIT
    }

    pub fn has_card(&self, card: Card) -> bool {
        self.hand.contains(&card)
    }

    /// Count cards of one treasure suit
    pub fn count_treasure(&self, kind: TreasureKind) -> usize {
        self.hand
            .iter()
            .filter(|c| **c == Card::Treasure(kind))
            .count()
    }

    /// Treasure cards this player could hand over
    pub fn transferable_cards(&self) -> Vec<Card> {
        self.hand
            .iter()
            .copied()
            .filter(Card::is_transferable)
            .collect()
    }

    pub fn add_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Remove one copy of a card. Returns false if not in hand.
    pub fn remove_card(&mut self, card: Card) -> bool {
        if let Some(pos) = self.hand.iter().position(|c| *c == card) {
            self.hand.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove `count` cards of a treasure suit, earliest received first.
    ///
    /// Removes nothing and returns `None` if the hand holds too few.
    pub fn take_treasure_cards(&mut self, kind: TreasureKind, count: usize) -> Option<Vec<Card>> {
        if self.count_treasure(kind) < count {
            return None;
        }
        let mut taken = Vec::with_capacity(count);
        self.hand.retain(|c| {
            if taken.len() < count && *c == Card::Treasure(kind) {
                taken.push(*c);
                false
            } else {
                true
            }
        });
        Some(taken)
    }
}
