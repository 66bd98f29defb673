//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all game logic: the
//! action phase, the end-of-turn sequence (treasure draw, hand limit, flood
//! draw, resolution, turn advance) and win/loss evaluation.

use crate::actions::{GameAction, GameEvent, MoveKind, PileKind};
use crate::board::{Board, BoardSnapshot, FloodOutcome, TileName, TreasureKind};
use crate::config::GameConfig;
use crate::grid::Cell;
use crate::pile::Pile;
use crate::player::{Capability, Card, Player, PlayerId, Role, CARDS_TO_COLLECT};
use crate::rng::GameRng;
use crate::water::{WaterLevelInfo, WaterLevelMeter};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Treasure cards drawn at the end of every turn
const TREASURE_DRAWS_PER_TURN: usize = 2;

/// Cards dealt to each player at setup
const OPENING_HAND: usize = 2;

/// Maximum steps a navigator can move another player
const COMMAND_RANGE: u32 = 2;

/// Why the game was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// The water level reached the top of the meter
    WaterLevelMaxed,
    /// The safe haven sank
    SafeHavenSunk,
    /// Both tiles of an unclaimed treasure sank
    TreasureLost(TreasureKind),
}

/// How the game stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    Won,
    Lost(LossReason),
}

/// Where play continues once everyone is back under the hand limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeAfterDiscard {
    /// Back to the current player's actions (a card was given mid-turn)
    Actions,
    /// On with the end-of-turn sequence at the flood draw
    FloodDraw,
}

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// The current player may spend action points or end the turn
    AwaitingAction,

    /// Players must discard down to the hand limit
    HandLimit {
        /// Players still over the limit
        players_remaining: Vec<PlayerId>,
        /// Where play continues afterwards
        resume: ResumeAfterDiscard,
    },

    /// Everyone escaped with all four treasures
    Won,

    /// The island won
    Lost { reason: LossReason },
}

/// Steps of the end-of-turn sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnStep {
    DrawTreasure,
    HandLimitCheck,
    DrawFlood,
    Resolve,
    AdvanceTurn,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Target is not a legal move")]
    IllegalMove,

    #[error("No action points left")]
    InsufficientActionPoints,

    #[error("Not enough cards")]
    InsufficientCards,

    #[error("No valid target available")]
    NoValidTarget,

    #[error("Invalid target")]
    InvalidTarget,

    #[error("Card is not in hand")]
    InvalidCardReference,

    #[error("Card cannot be given to another player")]
    CardNotTransferable,

    #[error("Ability not available")]
    AbilityUnavailable,

    #[error("Treasure already collected")]
    AlreadyCollected,

    #[error("Players are not on the same tile")]
    NotCoLocated,

    #[error("No such player")]
    UnknownPlayer,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Game is over")]
    GameOver,

    #[error("Game could not be set up: {0}")]
    InitializationFailure(String),
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// The island
    pub board: Board,
    /// All players, in turn order
    pub players: Vec<Player>,
    /// Whose turn it is
    pub current_player: PlayerId,
    /// Current game phase
    pub phase: GamePhase,
    /// Turn number (starts at 1)
    pub turn_number: u32,
    /// Treasure deck and its discards
    pub treasure_pile: Pile<Card>,
    /// Flood deck and its discards
    pub flood_pile: Pile<TileName>,
    /// The water level
    pub water_level: WaterLevelMeter,
    /// Treasures claimed so far
    pub collected: BTreeSet<TreasureKind>,
    /// Source of every shuffle, saved with its position in the stream
    rng: GameRng,
}

impl GameState {
    /// Create a new game on a freshly shuffled island
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let mut rng = Self::rng_for(&config);
        let board = Board::standard_with_rng(&mut rng);
        Self::setup(config, board, rng)
    }

    /// Create a new game from a difficulty (0-3) and player count (2-4)
    pub fn new_game(difficulty: u8, player_count: u8) -> Result<Self, GameError> {
        Self::new(GameConfig::new(difficulty, player_count))
    }

    /// Create a new game on a given island layout
    pub fn with_board(config: GameConfig, board: Board) -> Result<Self, GameError> {
        config.validate()?;
        board.validate()?;
        let rng = Self::rng_for(&config);
        Self::setup(config, board, rng)
    }

    fn rng_for(config: &GameConfig) -> GameRng {
        config.seed.map_or_else(GameRng::from_entropy, GameRng::new)
    }

    fn setup(config: GameConfig, board: Board, mut rng: GameRng) -> Result<Self, GameError> {
        let player_count = usize::from(config.player_count);

        let mut roles = Role::ALL;
        validate_role_pool(&roles, player_count)?;
        roles.shuffle(&mut rng);

        let mut starts = board.starting_cells();
        if starts.len() < player_count {
            return Err(GameError::InitializationFailure(format!(
                "{} starting locations for {} players",
                starts.len(),
                player_count
            )));
        }
        starts.shuffle(&mut rng);

        let mut treasure_pile = Pile::new(Card::opening_deck(), &mut rng);
        let mut players = Vec::with_capacity(player_count);
        for (i, (role, start)) in roles.into_iter().zip(starts).take(player_count).enumerate() {
            let mut player = Player::new(i as PlayerId, role, start);
            debug!(player = i, role = role.name(), cell = %start, "player seated");
            for _ in 0..OPENING_HAND {
                let card = treasure_pile.draw(&mut rng).ok_or_else(|| {
                    GameError::InitializationFailure("treasure deck too small to deal".to_string())
                })?;
                player.add_card(card);
            }
            players.push(player);
        }
        treasure_pile.add_and_shuffle(Card::waters_rise_cards(), &mut rng);

        let flood_pile = Pile::new(TileName::ALL.to_vec(), &mut rng);

        info!(
            seed = rng.seed(),
            players = player_count,
            difficulty = config.difficulty,
            "new game created"
        );

        Ok(Self {
            board,
            players,
            current_player: 0,
            phase: GamePhase::AwaitingAction,
            turn_number: 1,
            treasure_pile,
            flood_pile,
            water_level: WaterLevelMeter::new(config.difficulty),
            collected: BTreeSet::new(),
            rng,
        })
    }

    // ==================== Queries ====================

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id))
    }

    fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.get_player(id).ok_or(GameError::UnknownPlayer)
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(usize::from(id))
            .ok_or(GameError::UnknownPlayer)
    }

    /// The player whose turn it is
    pub fn current(&self) -> Option<&Player> {
        self.get_player(self.current_player)
    }

    /// Seed the game's shuffles derive from
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Flat view of the island for rendering
    pub fn board_snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// Level, flood cards per turn, and danger flag
    pub fn water_level_info(&self) -> WaterLevelInfo {
        self.water_level.info()
    }

    /// Treasures claimed so far
    pub fn collected_kinds(&self) -> &BTreeSet<TreasureKind> {
        &self.collected
    }

    /// How the game stands
    pub fn outcome(&self) -> Outcome {
        match self.phase {
            GamePhase::Won => Outcome::Won,
            GamePhase::Lost { reason } => Outcome::Lost(reason),
            _ => Outcome::InProgress,
        }
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Won | GamePhase::Lost { .. })
    }

    /// Treasure cards across the deck, its discards and every hand
    pub fn treasure_cards_accounted(&self) -> usize {
        self.treasure_pile.len() + self.players.iter().map(Player::hand_size).sum::<usize>()
    }

    /// Flood cards across the flood deck and its discards
    pub fn flood_cards_accounted(&self) -> usize {
        self.flood_pile.len()
    }

    /// Cells a player could reach without flying
    fn walk_moves(&self, player: &Player) -> BTreeSet<Cell> {
        let from = player.position;
        let mut moves = self.board.orthogonal_moves(from);
        match player.capability() {
            Capability::Diagonal => moves.extend(self.board.diagonal_moves(from)),
            Capability::Underwater => moves.extend(self.board.underwater_moves(from)),
            _ => {}
        }
        moves
    }

    /// Every cell a player may move to with one action
    pub fn legal_moves(&self, player: PlayerId) -> BTreeSet<Cell> {
        let Some(p) = self.get_player(player) else {
            return BTreeSet::new();
        };
        let mut moves = self.walk_moves(p);
        if p.can_fly() {
            moves.extend(self.board.dry_cells());
            moves.remove(&p.position);
        }
        moves
    }

    /// Flooded tiles a player can shore up: their own and orthogonal neighbours
    pub fn shore_up_targets(&self, player: PlayerId) -> BTreeSet<Cell> {
        self.get_player(player)
            .map(|p| self.board.flooded_around(p.position))
            .unwrap_or_default()
    }

    /// Where a navigator could send another player
    pub fn command_targets(&self, other: PlayerId) -> BTreeSet<Cell> {
        self.get_player(other)
            .map(|p| self.board.dry_cells_within(p.position, COMMAND_RANGE))
            .unwrap_or_default()
    }

    /// Tiles a sandbag could save
    pub fn sandbag_targets(&self) -> BTreeSet<Cell> {
        self.board.flooded_cells()
    }

    /// Where a helicopter lift from `from` could land
    pub fn helicopter_targets(&self, from: Cell) -> BTreeSet<Cell> {
        let mut cells = self.board.dry_cells();
        cells.remove(&from);
        cells
    }

    /// Players standing on the same cell as `player`, including them
    pub fn players_with(&self, player: PlayerId) -> Vec<PlayerId> {
        let Some(p) = self.get_player(player) else {
            return Vec::new();
        };
        self.players
            .iter()
            .filter(|other| other.position == p.position)
            .map(|other| other.id)
            .collect()
    }

    /// The treasure a player could claim where they stand, ignoring turn and AP
    fn collectable_treasure(&self, player: &Player) -> Result<TreasureKind, GameError> {
        let kind = self
            .board
            .tile_at(player.position)
            .filter(|t| t.is_dry())
            .and_then(|t| t.treasure())
            .ok_or(GameError::NoValidTarget)?;
        if self.collected.contains(&kind) {
            return Err(GameError::AlreadyCollected);
        }
        if player.count_treasure(kind) < CARDS_TO_COLLECT {
            return Err(GameError::InsufficientCards);
        }
        Ok(kind)
    }

    /// Whether a player could claim the treasure on their tile
    pub fn can_collect(&self, player: PlayerId) -> bool {
        self.get_player(player)
            .is_some_and(|p| self.collectable_treasure(p).is_ok())
    }

    /// Whether a player may hand a card to another
    fn can_give_to(&self, giver: &Player, receiver: &Player) -> bool {
        giver.id != receiver.id
            && (giver.has_capability(Capability::RemoteGive) || giver.position == receiver.position)
    }

    /// The first applicable loss condition, if any
    pub fn loss_reason(&self) -> Option<LossReason> {
        if self.water_level.is_max() {
            return Some(LossReason::WaterLevelMaxed);
        }
        if self.board.safe_haven().map_or(true, |t| t.is_sunk()) {
            return Some(LossReason::SafeHavenSunk);
        }
        TreasureKind::ALL
            .into_iter()
            .filter(|kind| !self.collected.contains(kind))
            .find(|&kind| self.board.treasure_tiles(kind).iter().all(|t| t.is_sunk()))
            .map(LossReason::TreasureLost)
    }

    /// Whether every win condition holds at once
    pub fn win_conditions_met(&self) -> bool {
        if self.collected.len() < TreasureKind::ALL.len() {
            return false;
        }
        let Some(haven) = self.board.safe_haven().filter(|t| t.is_dry()) else {
            return false;
        };
        self.players.iter().all(|p| p.position == haven.cell)
            && self.players.iter().any(|p| p.has_card(Card::HelicopterLift))
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        let Some(p) = self.get_player(player) else {
            return actions;
        };

        match &self.phase {
            GamePhase::Won | GamePhase::Lost { .. } => {}

            GamePhase::HandLimit {
                players_remaining, ..
            } => {
                if players_remaining.contains(&player) {
                    let unique: BTreeSet<Card> = p.hand.iter().copied().collect();
                    actions.extend(unique.into_iter().map(GameAction::Discard));
                }
            }

            GamePhase::AwaitingAction => {
                // Sandbags can be played on anyone's turn
                if p.has_card(Card::Sandbag) {
                    for cell in self.sandbag_targets() {
                        actions.push(GameAction::UseSandbag(cell));
                    }
                }

                if player != self.current_player {
                    return actions;
                }

                actions.push(GameAction::EndTurn);

                if p.bonus_shore_up || p.has_action_points() {
                    for cell in self.shore_up_targets(player) {
                        actions.push(GameAction::ShoreUp(cell));
                    }
                }

                if !p.has_action_points() {
                    return actions;
                }

                for cell in self.legal_moves(player) {
                    actions.push(GameAction::Move(cell));
                }

                let giveable: BTreeSet<Card> = p.transferable_cards().into_iter().collect();
                for other in &self.players {
                    if self.can_give_to(p, other) {
                        for card in &giveable {
                            actions.push(GameAction::GiveCard {
                                to: other.id,
                                card: *card,
                            });
                        }
                    }
                }

                if self.can_collect(player) {
                    actions.push(GameAction::CollectTreasure);
                }

                if p.can_command() {
                    for other in self.players.iter().filter(|o| o.id != player) {
                        for cell in self.command_targets(other.id) {
                            actions.push(GameAction::Command {
                                target: other.id,
                                to: cell,
                            });
                        }
                    }
                }

                if p.has_card(Card::HelicopterLift) {
                    let everyone_here = self.players_with(player);
                    for cell in self.helicopter_targets(p.position) {
                        actions.push(GameAction::UseHelicopter {
                            group: vec![player],
                            to: cell,
                        });
                        if everyone_here.len() > 1 {
                            actions.push(GameAction::UseHelicopter {
                                group: everyone_here.clone(),
                                to: cell,
                            });
                        }
                    }
                }
            }
        }

        actions
    }

    // ==================== Mutators ====================

    /// Apply an action to the game state.
    ///
    /// On `Err` nothing has changed.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        self.player(player)?;

        let keeps_bonus = matches!(action, GameAction::ShoreUp(_));

        let events = match action {
            GameAction::Move(to) => self.apply_move(player, to)?,
            GameAction::ShoreUp(cell) => self.apply_shore_up(player, cell)?,
            GameAction::GiveCard { to, card } => self.apply_give_card(player, to, card)?,
            GameAction::CollectTreasure => self.apply_collect(player)?,
            GameAction::Command { target, to } => self.apply_command(player, target, to)?,
            GameAction::UseSandbag(cell) => self.apply_sandbag(player, cell)?,
            GameAction::UseHelicopter { group, to } => self.apply_helicopter(player, &group, to)?,
            GameAction::Discard(card) => self.apply_discard(player, card)?,
            GameAction::EndTurn => self.apply_end_turn(player)?,
        };

        // Any other action forfeits an engineer's pending free shore-up
        if !keeps_bonus && player == self.current_player {
            if let Ok(p) = self.player_mut(player) {
                p.bonus_shore_up = false;
            }
        }

        Ok(events)
    }

    /// Move a player to a cell
    pub fn move_player(&mut self, player: PlayerId, to: Cell) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::Move(to))
    }

    /// Shore up a flooded tile on or next to the player
    pub fn shore_up(&mut self, player: PlayerId, cell: Cell) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::ShoreUp(cell))
    }

    /// Give a treasure card to another player
    pub fn give_card(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        card: Card,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(from, GameAction::GiveCard { to, card })
    }

    /// Claim the treasure on the player's tile
    pub fn collect_treasure(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::CollectTreasure)
    }

    /// Have a navigator move another player
    pub fn command(
        &mut self,
        navigator: PlayerId,
        target: PlayerId,
        to: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(navigator, GameAction::Command { target, to })
    }

    /// Play a sandbag on any flooded tile
    pub fn use_sandbag(
        &mut self,
        player: PlayerId,
        cell: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::UseSandbag(cell))
    }

    /// Play a helicopter lift for a group of co-located players
    pub fn use_helicopter(
        &mut self,
        player: PlayerId,
        group: Vec<PlayerId>,
        to: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::UseHelicopter { group, to })
    }

    /// Discard a card while over the hand limit
    pub fn discard_card(
        &mut self,
        player: PlayerId,
        card: Card,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(player, GameAction::Discard(card))
    }

    /// End the current player's turn
    pub fn end_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action(self.current_player, GameAction::EndTurn)
    }

    // ==================== Action Handlers ====================

    fn require_action_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if self.phase != GamePhase::AwaitingAction {
            return Err(GameError::InvalidPhase);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn require_action_point(&self, player: PlayerId) -> Result<&Player, GameError> {
        let p = self.player(player)?;
        if !p.has_action_points() {
            return Err(GameError::InsufficientActionPoints);
        }
        Ok(p)
    }

    fn apply_move(&mut self, player: PlayerId, to: Cell) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(player)?;
        let p = self.require_action_point(player)?;
        let from = p.position;

        let kind = if self.walk_moves(p).contains(&to) {
            MoveKind::Walk
        } else if p.can_fly() && to != from && self.board.is_dry(to) {
            MoveKind::Flight
        } else {
            return Err(GameError::IllegalMove);
        };

        let p = self.player_mut(player)?;
        p.position = to;
        p.spend_action();
        if kind == MoveKind::Flight {
            p.flight_used = true;
        }
        debug!(player, %from, %to, ?kind, "player moved");

        Ok(vec![GameEvent::PlayerMoved {
            player,
            from,
            to,
            kind,
        }])
    }

    fn apply_shore_up(
        &mut self,
        player: PlayerId,
        cell: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(player)?;
        let p = self.player(player)?;
        let bonus = p.bonus_shore_up;
        if !bonus && !p.has_action_points() {
            return Err(GameError::InsufficientActionPoints);
        }

        let targets = self.board.flooded_around(p.position);
        if targets.is_empty() {
            return Err(GameError::NoValidTarget);
        }
        if !targets.contains(&cell) {
            return Err(GameError::InvalidTarget);
        }
        let double = p.has_capability(Capability::DoubleShoreUp);
        let tile = self
            .board
            .tile_at(cell)
            .map(|t| t.name)
            .ok_or(GameError::NoValidTarget)?;

        self.board.shore_up(cell);
        let p = self.player_mut(player)?;
        if bonus {
            p.bonus_shore_up = false;
        } else {
            p.spend_action();
            p.bonus_shore_up = double;
        }
        let bonus_open = p.bonus_shore_up;
        debug!(player, tile = tile.canonical(), "tile shored up");

        let mut events = vec![GameEvent::TileShoredUp { player, cell, tile }];
        if bonus_open {
            events.push(GameEvent::BonusShoreUpAvailable { player });
        }
        Ok(events)
    }

    fn apply_give_card(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        card: Card,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(from)?;
        let giver = self.require_action_point(from)?;
        let receiver = self.player(to)?;

        if from == to {
            return Err(GameError::InvalidTarget);
        }
        if !card.is_transferable() {
            return Err(GameError::CardNotTransferable);
        }
        if giver.transferable_cards().is_empty() {
            return Err(GameError::InsufficientCards);
        }
        if !giver.has_card(card) {
            return Err(GameError::InvalidCardReference);
        }
        if !self.can_give_to(giver, receiver) {
            return Err(GameError::NotCoLocated);
        }

        let giver = self.player_mut(from)?;
        giver.remove_card(card);
        giver.spend_action();
        let receiver = self.player_mut(to)?;
        receiver.add_card(card);
        let over_limit = receiver.over_hand_limit();

        let mut events = vec![GameEvent::CardGiven { from, to, card }];
        if over_limit {
            debug!(player = to, "hand limit exceeded after receiving a card");
            self.phase = GamePhase::HandLimit {
                players_remaining: vec![to],
                resume: ResumeAfterDiscard::Actions,
            };
            events.push(GameEvent::HandLimitExceeded { players: vec![to] });
        }
        Ok(events)
    }

    fn apply_collect(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(player)?;
        let kind = self.collectable_treasure(self.player(player)?)?;
        self.require_action_point(player)?;

        let p = self.player_mut(player)?;
        let cards = p
            .take_treasure_cards(kind, CARDS_TO_COLLECT)
            .ok_or(GameError::InsufficientCards)?;
        p.spend_action();
        for card in cards {
            self.treasure_pile.discard(card);
        }
        self.collected.insert(kind);
        info!(player, treasure = kind.display_name(), "treasure collected");

        Ok(vec![GameEvent::TreasureCollected {
            player,
            treasure: kind,
        }])
    }

    fn apply_command(
        &mut self,
        navigator: PlayerId,
        target: PlayerId,
        to: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(navigator)?;
        let nav = self.require_action_point(navigator)?;
        if !nav.can_command() {
            return Err(GameError::AbilityUnavailable);
        }
        if target == navigator {
            return Err(GameError::InvalidTarget);
        }
        let from = self.player(target)?.position;

        let targets = self.command_targets(target);
        if targets.is_empty() {
            return Err(GameError::NoValidTarget);
        }
        if !targets.contains(&to) {
            return Err(GameError::IllegalMove);
        }

        let nav = self.player_mut(navigator)?;
        nav.spend_action();
        nav.command_used = true;
        self.player_mut(target)?.position = to;
        debug!(navigator, player = target, %to, "player commanded");

        Ok(vec![GameEvent::PlayerCommanded {
            navigator,
            player: target,
            from,
            to,
        }])
    }

    fn apply_sandbag(&mut self, player: PlayerId, cell: Cell) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != GamePhase::AwaitingAction {
            return Err(GameError::InvalidPhase);
        }
        if !self.player(player)?.has_card(Card::Sandbag) {
            return Err(GameError::InvalidCardReference);
        }
        let targets = self.sandbag_targets();
        if targets.is_empty() {
            return Err(GameError::NoValidTarget);
        }
        if !targets.contains(&cell) {
            return Err(GameError::InvalidTarget);
        }
        let tile = self
            .board
            .tile_at(cell)
            .map(|t| t.name)
            .ok_or(GameError::NoValidTarget)?;

        self.player_mut(player)?.remove_card(Card::Sandbag);
        self.treasure_pile.discard(Card::Sandbag);
        self.board.shore_up(cell);
        debug!(player, tile = tile.canonical(), "sandbag used");

        Ok(vec![GameEvent::SandbagUsed { player, cell, tile }])
    }

    fn apply_helicopter(
        &mut self,
        player: PlayerId,
        group: &[PlayerId],
        to: Cell,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(player)?;
        let pilot = self.require_action_point(player)?;
        if !pilot.has_card(Card::HelicopterLift) {
            return Err(GameError::InvalidCardReference);
        }
        let from = pilot.position;

        let group: BTreeSet<PlayerId> = group.iter().copied().collect();
        if !group.contains(&player) {
            return Err(GameError::InvalidTarget);
        }
        for &member in &group {
            if self.player(member)?.position != from {
                return Err(GameError::NotCoLocated);
            }
        }
        if to == from || !self.board.is_dry(to) {
            return Err(GameError::IllegalMove);
        }

        let pilot = self.player_mut(player)?;
        pilot.remove_card(Card::HelicopterLift);
        pilot.spend_action();
        self.treasure_pile.discard(Card::HelicopterLift);
        for &member in &group {
            self.player_mut(member)?.position = to;
        }
        debug!(player, %from, %to, passengers = group.len(), "helicopter lift");

        Ok(vec![GameEvent::HelicopterLifted {
            player,
            group: group.into_iter().collect(),
            from,
            to,
        }])
    }

    fn apply_discard(&mut self, player: PlayerId, card: Card) -> Result<Vec<GameEvent>, GameError> {
        let resume = match &self.phase {
            GamePhase::HandLimit {
                players_remaining,
                resume,
            } => {
                if !players_remaining.contains(&player) {
                    return Err(GameError::NotYourTurn);
                }
                *resume
            }
            _ => return Err(GameError::InvalidPhase),
        };
        if !self.player(player)?.has_card(card) {
            return Err(GameError::InvalidCardReference);
        }

        let p = self.player_mut(player)?;
        p.remove_card(card);
        let within_limit = !p.over_hand_limit();
        self.treasure_pile.discard(card);

        let mut events = vec![GameEvent::CardDiscarded { player, card }];

        let mut all_resolved = false;
        if let GamePhase::HandLimit {
            players_remaining, ..
        } = &mut self.phase
        {
            if within_limit {
                players_remaining.retain(|&p| p != player);
            }
            all_resolved = players_remaining.is_empty();
        }

        if all_resolved {
            self.phase = GamePhase::AwaitingAction;
            if resume == ResumeAfterDiscard::FloodDraw {
                events.extend(self.run_turn_steps(TurnStep::DrawFlood));
            }
        }
        Ok(events)
    }

    fn apply_end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_action_turn(player)?;
        self.player_mut(player)?.bonus_shore_up = false;
        debug!(player, turn = self.turn_number, "turn ending");
        Ok(self.run_turn_steps(TurnStep::DrawTreasure))
    }

    // ==================== End of Turn ====================

    /// Run the end-of-turn sequence from `start` until it waits on the
    /// players or the game ends.
    fn run_turn_steps(&mut self, start: TurnStep) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut step = Some(start);

        while let Some(current) = step {
            step = match current {
                TurnStep::DrawTreasure => {
                    if self.draw_treasure_cards(&mut events) {
                        Some(TurnStep::HandLimitCheck)
                    } else {
                        None
                    }
                }
                TurnStep::HandLimitCheck => {
                    let over: Vec<PlayerId> = self
                        .players
                        .iter()
                        .filter(|p| p.over_hand_limit())
                        .map(|p| p.id)
                        .collect();
                    if over.is_empty() {
                        Some(TurnStep::DrawFlood)
                    } else {
                        debug!(players = ?over, "hand limit exceeded");
                        events.push(GameEvent::HandLimitExceeded {
                            players: over.clone(),
                        });
                        self.phase = GamePhase::HandLimit {
                            players_remaining: over,
                            resume: ResumeAfterDiscard::FloodDraw,
                        };
                        None
                    }
                }
                TurnStep::DrawFlood => {
                    self.draw_flood_cards(&mut events);
                    Some(TurnStep::Resolve)
                }
                TurnStep::Resolve => {
                    if self.resolve(&mut events) {
                        None
                    } else {
                        Some(TurnStep::AdvanceTurn)
                    }
                }
                TurnStep::AdvanceTurn => {
                    self.advance_turn(&mut events);
                    None
                }
            };
        }

        events
    }

    /// Draw the current player's treasure cards.
    ///
    /// Returns false if Waters Rise pushed the meter to the top and the game
    /// is lost.
    fn draw_treasure_cards(&mut self, events: &mut Vec<GameEvent>) -> bool {
        let player = self.current_player;
        for _ in 0..TREASURE_DRAWS_PER_TURN {
            match self.treasure_pile.draw(&mut self.rng) {
                None => {
                    debug!("treasure deck exhausted");
                    events.push(GameEvent::DeckExhausted {
                        pile: PileKind::Treasure,
                    });
                    break;
                }
                Some(Card::WatersRise) => {
                    self.waters_rise(events);
                    self.treasure_pile.discard(Card::WatersRise);
                    if self.water_level.is_max() {
                        self.finish_lost(LossReason::WaterLevelMaxed, events);
                        return false;
                    }
                    // Waters Rise ends this draw
                    break;
                }
                Some(card) => {
                    if let Some(p) = self.players.get_mut(usize::from(player)) {
                        p.add_card(card);
                    }
                    events.push(GameEvent::TreasureCardDrawn { player, card });
                }
            }
        }
        true
    }

    /// Raise the water and shuffle the flood discards back into the flood deck
    fn waters_rise(&mut self, events: &mut Vec<GameEvent>) {
        self.water_level.raise();
        let reshuffled = self.flood_pile.discard_len();
        self.flood_pile.reshuffle_discard(&mut self.rng);
        info!(
            level = self.water_level.display_level(),
            reshuffled, "waters rise"
        );
        events.push(GameEvent::WatersRose {
            level: self.water_level.level(),
            reshuffled,
        });
    }

    /// Draw and resolve this turn's flood cards
    fn draw_flood_cards(&mut self, events: &mut Vec<GameEvent>) {
        let count = self.water_level.cards_this_turn();
        debug!(count, "drawing flood cards");
        for _ in 0..count {
            let Some(name) = self.flood_pile.draw(&mut self.rng) else {
                debug!("flood deck exhausted");
                events.push(GameEvent::DeckExhausted {
                    pile: PileKind::Flood,
                });
                break;
            };
            events.push(match self.board.flood(name) {
                FloodOutcome::Flooded(cell) => GameEvent::TileFlooded { tile: name, cell },
                FloodOutcome::Sunk(cell) => GameEvent::TileSunk { tile: name, cell },
                FloodOutcome::AlreadySunk => GameEvent::SunkTileDrawn { tile: name },
            });
            self.flood_pile.discard(name);
        }
    }

    /// Check for a loss, then a win. Returns true if the game ended.
    fn resolve(&mut self, events: &mut Vec<GameEvent>) -> bool {
        if let Some(reason) = self.loss_reason() {
            self.finish_lost(reason, events);
            return true;
        }
        if self.win_conditions_met() {
            info!(turn = self.turn_number, "game won");
            self.phase = GamePhase::Won;
            events.push(GameEvent::GameWon);
            return true;
        }
        false
    }

    fn finish_lost(&mut self, reason: LossReason, events: &mut Vec<GameEvent>) {
        info!(?reason, turn = self.turn_number, "game lost");
        self.phase = GamePhase::Lost { reason };
        events.push(GameEvent::GameLost { reason });
    }

    /// Hand the turn to the next player with a fresh action budget
    fn advance_turn(&mut self, events: &mut Vec<GameEvent>) {
        let player = self.current_player;
        let next_player = ((usize::from(player) + 1) % self.player_count()) as PlayerId;
        if let Some(next) = self.players.get_mut(usize::from(next_player)) {
            next.start_turn();
        }
        self.current_player = next_player;
        self.turn_number += 1;
        self.phase = GamePhase::AwaitingAction;
        debug!(player, next_player, "turn advanced");

        events.push(GameEvent::TurnEnded {
            player,
            next_player,
        });
    }
}

/// Check the role pool can seat every player with distinct capabilities
fn validate_role_pool(roles: &[Role], needed: usize) -> Result<(), GameError> {
    let capabilities: HashSet<Capability> = roles.iter().map(Role::capability).collect();
    if capabilities.len() != roles.len() {
        return Err(GameError::InitializationFailure(
            "roles must grant distinct capabilities".to_string(),
        ));
    }
    if roles.len() < needed {
        return Err(GameError::InitializationFailure(format!(
            "{} roles for {} players",
            roles.len(),
            needed
        )));
    }
    Ok(())
}
