//! Game actions that players can take.
//!
//! This module defines every mutation a client can request and the events
//! the engine reports back after applying one.

use crate::board::{TileName, TreasureKind};
use crate::game::LossReason;
use crate::grid::Cell;
use crate::player::{Card, PlayerId};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Action Phase ====================
    /// Move to a cell (1 AP)
    Move(Cell),
    /// Shore up a flooded tile on or next to the player (1 AP)
    ShoreUp(Cell),
    /// Hand a treasure card to another player (1 AP)
    GiveCard { to: PlayerId, card: Card },
    /// Claim the treasure on the player's tile (1 AP)
    CollectTreasure,
    /// Move another player up to two tiles (1 AP, once per turn)
    Command { target: PlayerId, to: Cell },
    /// Discard a sandbag to shore up any flooded tile (0 AP)
    UseSandbag(Cell),
    /// Discard a helicopter lift to fly a group of co-located players (1 AP)
    UseHelicopter { group: Vec<PlayerId>, to: Cell },

    // ==================== Hand Limit ====================
    /// Discard a card while over the hand limit
    Discard(Card),

    // ==================== Turn Management ====================
    /// End the action phase and run the draw, flood and resolve steps
    EndTurn,
}

/// Which deck an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PileKind {
    Treasure,
    Flood,
}

/// How a move was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    Walk,
    Flight,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player moved
    PlayerMoved {
        player: PlayerId,
        from: Cell,
        to: Cell,
        kind: MoveKind,
    },

    /// A flooded tile was shored up
    TileShoredUp {
        player: PlayerId,
        cell: Cell,
        tile: TileName,
    },

    /// An engineer may shore up one more tile for free
    BonusShoreUpAvailable { player: PlayerId },

    /// A card changed hands
    CardGiven {
        from: PlayerId,
        to: PlayerId,
        card: Card,
    },

    /// A treasure was claimed
    TreasureCollected {
        player: PlayerId,
        treasure: TreasureKind,
    },

    /// A navigator moved another player
    PlayerCommanded {
        navigator: PlayerId,
        player: PlayerId,
        from: Cell,
        to: Cell,
    },

    /// A sandbag was played
    SandbagUsed {
        player: PlayerId,
        cell: Cell,
        tile: TileName,
    },

    /// A helicopter lift was played
    HelicopterLifted {
        player: PlayerId,
        group: Vec<PlayerId>,
        from: Cell,
        to: Cell,
    },

    /// A treasure card was drawn into a hand
    TreasureCardDrawn { player: PlayerId, card: Card },

    /// Waters Rise was drawn: the level went up and the flood discards were
    /// shuffled back into the flood deck
    WatersRose { level: u8, reshuffled: usize },

    /// A deck and its discards were both empty
    DeckExhausted { pile: PileKind },

    /// A tile flooded
    TileFlooded { tile: TileName, cell: Cell },

    /// A tile sank
    TileSunk { tile: TileName, cell: Cell },

    /// A flood card named a tile that had already sunk
    SunkTileDrawn { tile: TileName },

    /// Players must discard down to the hand limit
    HandLimitExceeded { players: Vec<PlayerId> },

    /// A card was discarded to get under the hand limit
    CardDiscarded { player: PlayerId, card: Card },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// Everyone escaped with all four treasures
    GameWon,

    /// The island claimed the team
    GameLost { reason: LossReason },
}
