//! Integration tests for the island engine.
//!
//! Scenario tests run on a board with every location in canonical order so
//! cells are predictable, with both decks stacked by hand. Property tests
//! play random games from random seeds.

use island_core::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

// Cells on the canonical board
const MISTY_MARSH: Cell = Cell::new(0, 2);
const OBSERVATORY: Cell = Cell::new(0, 3);
const TIDAL_PALACE: Cell = Cell::new(1, 2);
const TWILIGHT_HOLLOW: Cell = Cell::new(2, 1);
const DUNES: Cell = Cell::new(2, 2);
const TEMPLE_OF_THE_MOON: Cell = Cell::new(2, 3);
const WATCHTOWER: Cell = Cell::new(3, 2);
const COPPER_GATE: Cell = Cell::new(3, 3);
const TEMPLE_OF_THE_SUN: Cell = Cell::new(4, 1);
const CORAL_PALACE: Cell = Cell::new(4, 2);
const GOLD_GATE: Cell = Cell::new(4, 3);
const FOOLS_LANDING: Cell = Cell::new(4, 4);
const HOWLING_GARDEN: Cell = Cell::new(5, 2);
const BRONZE_GATE: Cell = Cell::new(5, 3);

const FIRE: Card = Card::Treasure(TreasureKind::CrystalOfFire);
const EARTH: Card = Card::Treasure(TreasureKind::EarthStone);

/// A game on the canonical board with empty hands
fn fixed_game(players: u8) -> GameState {
    let board = Board::from_names(&TileName::ALL).unwrap();
    let mut game = GameState::with_board(GameConfig::new(0, players).with_seed(7), board).unwrap();
    for p in game.players.iter_mut() {
        p.hand.clear();
    }
    game
}

fn place(game: &mut GameState, id: PlayerId, role: Role, cell: Cell) {
    let p = &mut game.players[usize::from(id)];
    p.role = role;
    p.position = cell;
}

/// Stack both decks. The last card of each list is drawn first.
fn stack_decks(game: &mut GameState, treasure: Vec<Card>, flood: Vec<TileName>) {
    game.treasure_pile = Pile::from_parts(treasure, Vec::new());
    game.flood_pile = Pile::from_parts(flood, Vec::new());
}

/// Decks that make an end of turn uneventful
fn quiet_decks(game: &mut GameState) {
    stack_decks(
        game,
        vec![Card::Sandbag, Card::Sandbag],
        vec![TileName::MistyMarsh, TileName::Observatory],
    );
}

fn ap(game: &GameState, id: PlayerId) -> u8 {
    game.get_player(id).unwrap().action_points
}

#[test]
fn test_canonical_board_cells() {
    let game = fixed_game(2);
    let name_at = |cell| game.board.tile_at(cell).unwrap().name;
    assert_eq!(name_at(MISTY_MARSH), TileName::MistyMarsh);
    assert_eq!(name_at(DUNES), TileName::DunesOfDeception);
    assert_eq!(name_at(WATCHTOWER), TileName::Watchtower);
    assert_eq!(name_at(TEMPLE_OF_THE_SUN), TileName::TempleOfTheSun);
    assert_eq!(name_at(FOOLS_LANDING), TileName::FoolsLanding);
    assert_eq!(name_at(BRONZE_GATE), TileName::BronzeGate);
}

// ==================== Flooding ====================

#[test]
fn test_same_flood_card_twice_sinks_tile() {
    let mut game = fixed_game(2);
    stack_decks(
        &mut game,
        vec![Card::Sandbag, Card::Sandbag],
        vec![TileName::Observatory, TileName::Observatory],
    );

    let events = game.end_turn().unwrap();

    assert!(events.contains(&GameEvent::TileFlooded {
        tile: TileName::Observatory,
        cell: OBSERVATORY,
    }));
    assert!(events.contains(&GameEvent::TileSunk {
        tile: TileName::Observatory,
        cell: OBSERVATORY,
    }));
    assert!(game.board.tile_at(OBSERVATORY).is_none());
    assert!(game.board.tile_named(TileName::Observatory).unwrap().is_sunk());
    assert_eq!(game.outcome(), Outcome::InProgress);
    assert_eq!(game.current_player, 1);
}

#[test]
fn test_sunk_tile_card_is_a_no_op() {
    let mut game = fixed_game(2);
    game.board.set_state(TileName::Observatory, TileState::Sunk);
    stack_decks(
        &mut game,
        vec![Card::Sandbag, Card::Sandbag],
        vec![TileName::MistyMarsh, TileName::Observatory],
    );

    let events = game.end_turn().unwrap();

    assert!(events.contains(&GameEvent::SunkTileDrawn {
        tile: TileName::Observatory
    }));
    assert!(game.board.is_flooded(MISTY_MARSH));
    assert_eq!(game.flood_pile.discard_len(), 2);
}

#[test]
fn test_waters_rise_stops_treasure_draw_and_reshuffles_flood_discard() {
    let mut game = fixed_game(2);
    game.treasure_pile = Pile::from_parts(vec![Card::Sandbag, Card::WatersRise], Vec::new());
    game.flood_pile = Pile::from_parts(
        vec![TileName::MistyMarsh, TileName::Observatory, TileName::Watchtower],
        vec![TileName::PhantomRock, TileName::LostLagoon],
    );
    let hand_before = game.players[0].hand.clone();

    let events = game.end_turn().unwrap();

    assert_eq!(game.water_level.level(), 1);
    assert!(events.contains(&GameEvent::WatersRose {
        level: 1,
        reshuffled: 2,
    }));
    // Second treasure draw skipped
    assert_eq!(game.players[0].hand, hand_before);
    assert_eq!(game.treasure_pile.draw_stack().to_vec(), vec![Card::Sandbag]);
    assert_eq!(game.treasure_pile.discard_stack().to_vec(), vec![Card::WatersRise]);
    // All five flood cards were back in the draw stack before the two flood draws
    assert_eq!(game.flood_pile.draw_len(), 3);
    assert_eq!(game.flood_pile.discard_len(), 2);
}

#[test]
fn test_empty_flood_deck_is_skipped() {
    let mut game = fixed_game(2);
    game.treasure_pile = Pile::from_parts(vec![Card::Sandbag, Card::Sandbag], Vec::new());
    game.flood_pile = Pile::default();
    let board_before = game.board.clone();

    let events = game.end_turn().unwrap();

    assert!(events.contains(&GameEvent::DeckExhausted {
        pile: PileKind::Flood
    }));
    assert_eq!(game.board, board_before);
    assert_eq!(game.outcome(), Outcome::InProgress);
    assert_eq!(game.current_player, 1);
}

#[test]
fn test_empty_treasure_deck_is_skipped() {
    let mut game = fixed_game(2);
    game.treasure_pile = Pile::default();
    game.flood_pile = Pile::from_parts(
        vec![TileName::MistyMarsh, TileName::Observatory],
        Vec::new(),
    );

    let events = game.end_turn().unwrap();

    assert!(events.contains(&GameEvent::DeckExhausted {
        pile: PileKind::Treasure
    }));
    assert!(game.players[0].hand.is_empty());
    assert_eq!(game.current_player, 1);
}

#[test]
fn test_turn_order_is_circular_and_resets_action_points() {
    let mut game = fixed_game(3);
    for expected in [1, 2, 0] {
        quiet_decks(&mut game);
        for p in game.players.iter_mut() {
            p.hand.clear();
        }
        game.end_turn().unwrap();
        assert_eq!(game.current_player, expected);
        assert_eq!(ap(&game, expected), 3);
    }
    assert_eq!(game.turn_number, 4);
}

// ==================== Treasure Collection ====================

#[test]
fn test_collect_treasure_then_again_is_rejected() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, TEMPLE_OF_THE_SUN);
    game.players[0].hand = vec![EARTH; 4];

    let events = game.collect_treasure(0).unwrap();

    assert_eq!(
        events,
        vec![GameEvent::TreasureCollected {
            player: 0,
            treasure: TreasureKind::EarthStone,
        }]
    );
    assert!(game.players[0].hand.is_empty());
    assert!(game.collected_kinds().contains(&TreasureKind::EarthStone));
    assert_eq!(ap(&game, 0), 2);
    assert_eq!(game.treasure_pile.discard_len(), 4);

    game.players[0].hand = vec![EARTH; 4];
    assert_eq!(game.collect_treasure(0), Err(GameError::AlreadyCollected));
    assert_eq!(game.players[0].hand, vec![EARTH; 4]);
    assert_eq!(ap(&game, 0), 2);
    assert!(!game.can_collect(0));
}

#[test]
fn test_collect_requires_dry_treasure_tile_and_four_cards() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);
    game.players[0].hand = vec![EARTH; 4];
    assert_eq!(game.collect_treasure(0), Err(GameError::NoValidTarget));

    place(&mut game, 0, Role::Explorer, TEMPLE_OF_THE_SUN);
    game.players[0].hand = vec![EARTH; 3];
    assert_eq!(game.collect_treasure(0), Err(GameError::InsufficientCards));

    game.players[0].hand = vec![EARTH; 4];
    game.board.set_state(TileName::TempleOfTheSun, TileState::Flooded);
    assert!(!game.can_collect(0));
    assert_eq!(game.collect_treasure(0), Err(GameError::NoValidTarget));

    game.board.set_state(TileName::TempleOfTheSun, TileState::Dry);
    assert!(game.can_collect(0));
}

#[test]
fn test_collect_takes_exactly_four_cards() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, TEMPLE_OF_THE_SUN);
    game.players[0].hand = vec![EARTH, Card::Sandbag, EARTH, EARTH, EARTH, EARTH];

    game.collect_treasure(0).unwrap();

    assert_eq!(game.players[0].hand, vec![Card::Sandbag, EARTH]);
}

// ==================== Shore Up ====================

#[test]
fn test_engineer_stops_after_one_shore_up() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Engineer, DUNES);
    game.board.set_state(TileName::TwilightHollow, TileState::Flooded);
    game.board.set_state(TileName::Watchtower, TileState::Flooded);

    let events = game.shore_up(0, TWILIGHT_HOLLOW).unwrap();
    assert_eq!(
        events,
        vec![
            GameEvent::TileShoredUp {
                player: 0,
                cell: TWILIGHT_HOLLOW,
                tile: TileName::TwilightHollow,
            },
            GameEvent::BonusShoreUpAvailable { player: 0 },
        ]
    );
    assert_eq!(ap(&game, 0), 2);

    // Any other action forfeits the free shore-up
    game.move_player(0, TIDAL_PALACE).unwrap();
    assert!(!game.players[0].bonus_shore_up);
    game.move_player(0, DUNES).unwrap();
    assert_eq!(ap(&game, 0), 0);

    assert_eq!(
        game.shore_up(0, WATCHTOWER),
        Err(GameError::InsufficientActionPoints)
    );
    assert!(game.board.is_flooded(WATCHTOWER));
}

#[test]
fn test_engineer_second_shore_up_is_free() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Engineer, DUNES);
    game.board.set_state(TileName::TwilightHollow, TileState::Flooded);
    game.board.set_state(TileName::Watchtower, TileState::Flooded);

    game.shore_up(0, TWILIGHT_HOLLOW).unwrap();
    let events = game.shore_up(0, WATCHTOWER).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(ap(&game, 0), 2);
    assert!(game.board.is_dry(TWILIGHT_HOLLOW));
    assert!(game.board.is_dry(WATCHTOWER));
    assert!(!game.players[0].bonus_shore_up);
}

#[test]
fn test_shore_up_targets_and_errors() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);
    assert_eq!(game.shore_up(0, DUNES), Err(GameError::NoValidTarget));

    game.board.set_state(TileName::DunesOfDeception, TileState::Flooded);
    game.board.set_state(TileName::Watchtower, TileState::Flooded);
    game.board.set_state(TileName::Observatory, TileState::Flooded);
    assert_eq!(
        game.shore_up_targets(0),
        BTreeSet::from([DUNES, WATCHTOWER])
    );
    assert_eq!(game.shore_up(0, OBSERVATORY), Err(GameError::InvalidTarget));

    let events = game.shore_up(0, DUNES).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(ap(&game, 0), 2);
    assert!(game.board.is_dry(DUNES));
}

// ==================== Movement ====================

#[test]
fn test_walk_and_action_budget() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Engineer, DUNES);

    let events = game.move_player(0, TIDAL_PALACE).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::PlayerMoved {
            player: 0,
            from: DUNES,
            to: TIDAL_PALACE,
            kind: MoveKind::Walk,
        }]
    );
    game.move_player(0, DUNES).unwrap();
    game.move_player(0, WATCHTOWER).unwrap();

    assert_eq!(
        game.move_player(0, DUNES),
        Err(GameError::InsufficientActionPoints)
    );
    // Running out of actions does not end the turn
    assert_eq!(game.current_player, 0);
    assert_eq!(game.phase, GamePhase::AwaitingAction);
}

#[test]
fn test_cannot_move_onto_flooded_or_diagonal_tiles() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Engineer, DUNES);
    game.board.set_state(TileName::Watchtower, TileState::Flooded);

    assert_eq!(game.move_player(0, WATCHTOWER), Err(GameError::IllegalMove));
    assert_eq!(game.move_player(0, COPPER_GATE), Err(GameError::IllegalMove));
    assert_eq!(game.move_player(0, Cell::new(0, 0)), Err(GameError::IllegalMove));
    assert_eq!(ap(&game, 0), 3);
}

#[test]
fn test_explorer_moves_diagonally() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);

    assert!(game.legal_moves(0).contains(&COPPER_GATE));
    game.move_player(0, COPPER_GATE).unwrap();
    assert_eq!(game.players[0].position, COPPER_GATE);
}

#[test]
fn test_pilot_flies_once_per_turn() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Pilot, DUNES);

    // A walk does not use up the flight
    game.move_player(0, TIDAL_PALACE).unwrap();
    assert!(!game.players[0].flight_used);

    let events = game.move_player(0, BRONZE_GATE).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::PlayerMoved {
            player: 0,
            from: TIDAL_PALACE,
            to: BRONZE_GATE,
            kind: MoveKind::Flight,
        }]
    );
    assert!(game.players[0].flight_used);
    assert_eq!(game.move_player(0, FOOLS_LANDING), Err(GameError::IllegalMove));

    quiet_decks(&mut game);
    game.end_turn().unwrap();
    quiet_decks(&mut game);
    game.end_turn().unwrap();
    assert!(game.players[0].can_fly());
}

#[test]
fn test_pilot_cannot_fly_to_flooded_tile() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Pilot, DUNES);
    game.board.set_state(TileName::BronzeGate, TileState::Flooded);

    assert!(!game.legal_moves(0).contains(&BRONZE_GATE));
    assert!(!game.legal_moves(0).contains(&DUNES));
    assert_eq!(game.move_player(0, BRONZE_GATE), Err(GameError::IllegalMove));
}

#[test]
fn test_diver_swims_through_flooded_and_sunk_cells() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Diver, DUNES);
    place(&mut game, 1, Role::Engineer, DUNES);
    game.board.set_state(TileName::Watchtower, TileState::Flooded);
    game.board.set_state(TileName::CoralPalace, TileState::Sunk);

    assert!(game.legal_moves(0).contains(&HOWLING_GARDEN));
    assert!(!game.legal_moves(0).contains(&WATCHTOWER));
    assert!(!game.legal_moves(1).contains(&HOWLING_GARDEN));

    game.move_player(0, HOWLING_GARDEN).unwrap();
    assert_eq!(game.players[0].position, HOWLING_GARDEN);
    assert_eq!(ap(&game, 0), 2);
}

#[test]
fn test_player_on_sunk_tile_stays_and_can_walk_off() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Engineer, DUNES);
    game.board.set_state(TileName::DunesOfDeception, TileState::Sunk);

    assert_eq!(game.players[0].position, DUNES);
    game.move_player(0, TIDAL_PALACE).unwrap();
}

#[test]
fn test_only_current_player_acts() {
    let mut game = fixed_game(2);
    place(&mut game, 1, Role::Engineer, DUNES);
    assert_eq!(game.move_player(1, TIDAL_PALACE), Err(GameError::NotYourTurn));
    assert_eq!(
        game.apply_action(9, GameAction::EndTurn),
        Err(GameError::UnknownPlayer)
    );
}

// ==================== Navigator ====================

#[test]
fn test_navigator_commands_another_player() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Navigator, DUNES);
    place(&mut game, 1, Role::Engineer, BRONZE_GATE);

    assert_eq!(
        game.command_targets(1),
        BTreeSet::from([GOLD_GATE, HOWLING_GARDEN, COPPER_GATE, CORAL_PALACE, FOOLS_LANDING])
    );

    let events = game.command(0, 1, FOOLS_LANDING).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::PlayerCommanded {
            navigator: 0,
            player: 1,
            from: BRONZE_GATE,
            to: FOOLS_LANDING,
        }]
    );
    assert_eq!(game.players[1].position, FOOLS_LANDING);
    assert_eq!(game.players[0].position, DUNES);
    assert_eq!(ap(&game, 0), 2);

    assert_eq!(
        game.command(0, 1, GOLD_GATE),
        Err(GameError::AbilityUnavailable)
    );
}

#[test]
fn test_command_rules() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Navigator, DUNES);
    place(&mut game, 1, Role::Engineer, BRONZE_GATE);

    assert_eq!(game.command(0, 0, TIDAL_PALACE), Err(GameError::InvalidTarget));
    assert_eq!(game.command(0, 1, MISTY_MARSH), Err(GameError::IllegalMove));

    place(&mut game, 0, Role::Explorer, DUNES);
    assert_eq!(
        game.command(0, 1, GOLD_GATE),
        Err(GameError::AbilityUnavailable)
    );
}

// ==================== Cards ====================

#[test]
fn test_give_card_between_co_located_players() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);
    place(&mut game, 1, Role::Engineer, DUNES);
    game.players[0].hand = vec![FIRE, Card::Sandbag];

    let events = game.give_card(0, 1, FIRE).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::CardGiven {
            from: 0,
            to: 1,
            card: FIRE,
        }]
    );
    assert_eq!(game.players[1].hand, vec![FIRE]);
    assert_eq!(ap(&game, 0), 2);

    assert_eq!(
        game.give_card(0, 1, Card::Sandbag),
        Err(GameError::CardNotTransferable)
    );
    assert_eq!(game.give_card(0, 0, FIRE), Err(GameError::InvalidTarget));
    assert_eq!(game.give_card(0, 1, FIRE), Err(GameError::InsufficientCards));
}

#[test]
fn test_give_card_requires_co_location_unless_messenger() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);
    place(&mut game, 1, Role::Engineer, BRONZE_GATE);
    game.players[0].hand = vec![FIRE, EARTH];

    assert_eq!(game.give_card(0, 1, FIRE), Err(GameError::NotCoLocated));
    assert_eq!(
        game.give_card(0, 1, Card::Treasure(TreasureKind::OceansChalice)),
        Err(GameError::InvalidCardReference)
    );

    place(&mut game, 0, Role::Messenger, DUNES);
    game.give_card(0, 1, FIRE).unwrap();
    assert_eq!(game.players[1].hand, vec![FIRE]);
}

#[test]
fn test_receiving_over_hand_limit_requires_discard() {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, DUNES);
    place(&mut game, 1, Role::Engineer, DUNES);
    game.players[0].hand = vec![FIRE];
    game.players[1].hand = vec![Card::Sandbag; 5];

    let events = game.give_card(0, 1, FIRE).unwrap();
    assert!(events.contains(&GameEvent::HandLimitExceeded { players: vec![1] }));
    assert_eq!(
        game.phase,
        GamePhase::HandLimit {
            players_remaining: vec![1],
            resume: ResumeAfterDiscard::Actions,
        }
    );
    assert_eq!(
        game.valid_actions(1),
        vec![GameAction::Discard(FIRE), GameAction::Discard(Card::Sandbag)]
    );

    assert_eq!(game.move_player(0, TIDAL_PALACE), Err(GameError::InvalidPhase));
    assert_eq!(game.discard_card(0, FIRE), Err(GameError::NotYourTurn));
    assert_eq!(
        game.discard_card(1, Card::HelicopterLift),
        Err(GameError::InvalidCardReference)
    );

    game.discard_card(1, Card::Sandbag).unwrap();
    assert_eq!(game.phase, GamePhase::AwaitingAction);
    assert_eq!(game.current_player, 0);
    assert_eq!(game.players[1].hand_size(), 5);
    assert_eq!(ap(&game, 0), 2);
}

#[test]
fn test_hand_limit_after_treasure_draw_pauses_turn() {
    let mut game = fixed_game(2);
    game.players[0].hand = vec![Card::Sandbag, Card::Sandbag, FIRE, FIRE, Card::HelicopterLift];
    stack_decks(
        &mut game,
        vec![EARTH, EARTH],
        vec![TileName::MistyMarsh, TileName::Observatory],
    );

    let events = game.end_turn().unwrap();
    assert!(events.contains(&GameEvent::HandLimitExceeded { players: vec![0] }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TileFlooded { .. })));
    assert_eq!(
        game.phase,
        GamePhase::HandLimit {
            players_remaining: vec![0],
            resume: ResumeAfterDiscard::FloodDraw,
        }
    );
    assert_eq!(game.end_turn(), Err(GameError::InvalidPhase));

    let events = game.discard_card(0, Card::Sandbag).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(game.phase, GamePhase::HandLimit { .. }));

    let events = game.discard_card(0, Card::Sandbag).unwrap();
    assert!(events.contains(&GameEvent::TileFlooded {
        tile: TileName::Observatory,
        cell: OBSERVATORY,
    }));
    assert!(events.contains(&GameEvent::TurnEnded {
        player: 0,
        next_player: 1,
    }));
    assert_eq!(game.phase, GamePhase::AwaitingAction);
    assert_eq!(game.current_player, 1);
    assert_eq!(game.players[0].hand_size(), 5);
}

#[test]
fn test_sandbag_on_another_players_turn() {
    let mut game = fixed_game(2);
    game.players[1].hand = vec![Card::Sandbag];
    assert_eq!(game.use_sandbag(1, OBSERVATORY), Err(GameError::NoValidTarget));

    game.board.set_state(TileName::Observatory, TileState::Flooded);
    assert_eq!(game.use_sandbag(0, OBSERVATORY), Err(GameError::InvalidCardReference));
    assert_eq!(game.use_sandbag(1, DUNES), Err(GameError::InvalidTarget));

    let events = game.use_sandbag(1, OBSERVATORY).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::SandbagUsed {
            player: 1,
            cell: OBSERVATORY,
            tile: TileName::Observatory,
        }]
    );
    assert!(game.board.is_dry(OBSERVATORY));
    assert!(game.players[1].hand.is_empty());
    assert_eq!(game.treasure_pile.discard_stack().to_vec(), vec![Card::Sandbag]);
    assert_eq!(ap(&game, 0), 3);
}

#[test]
fn test_helicopter_lifts_co_located_group() {
    let mut game = fixed_game(3);
    place(&mut game, 0, Role::Explorer, DUNES);
    place(&mut game, 1, Role::Engineer, DUNES);
    place(&mut game, 2, Role::Diver, BRONZE_GATE);
    game.players[0].hand = vec![Card::HelicopterLift];

    assert_eq!(
        game.use_helicopter(0, vec![0, 2], FOOLS_LANDING),
        Err(GameError::NotCoLocated)
    );
    assert_eq!(
        game.use_helicopter(0, vec![1], FOOLS_LANDING),
        Err(GameError::InvalidTarget)
    );
    assert_eq!(
        game.use_helicopter(0, vec![0, 1], DUNES),
        Err(GameError::IllegalMove)
    );
    game.board.set_state(TileName::GoldGate, TileState::Flooded);
    assert_eq!(
        game.use_helicopter(0, vec![0, 1], GOLD_GATE),
        Err(GameError::IllegalMove)
    );

    let events = game.use_helicopter(0, vec![0, 1], FOOLS_LANDING).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::HelicopterLifted {
            player: 0,
            group: vec![0, 1],
            from: DUNES,
            to: FOOLS_LANDING,
        }]
    );
    assert_eq!(game.players[0].position, FOOLS_LANDING);
    assert_eq!(game.players[1].position, FOOLS_LANDING);
    assert_eq!(game.players[2].position, BRONZE_GATE);
    assert!(game.players[0].hand.is_empty());
    assert_eq!(ap(&game, 0), 2);

    assert_eq!(
        game.use_helicopter(0, vec![0], DUNES),
        Err(GameError::InvalidCardReference)
    );
}

// ==================== Win / Loss ====================

/// Every win condition met except for running the resolve step
fn winning_game() -> GameState {
    let mut game = fixed_game(2);
    place(&mut game, 0, Role::Explorer, FOOLS_LANDING);
    place(&mut game, 1, Role::Engineer, FOOLS_LANDING);
    game.collected = TreasureKind::ALL.into_iter().collect();
    game.players[0].hand = vec![Card::HelicopterLift];
    quiet_decks(&mut game);
    game
}

#[test]
fn test_win_when_all_conditions_hold() {
    let mut game = winning_game();
    assert!(game.win_conditions_met());

    let events = game.end_turn().unwrap();
    assert!(events.contains(&GameEvent::GameWon));
    assert_eq!(game.outcome(), Outcome::Won);
    assert!(game.is_finished());
    assert!(game.valid_actions(1).is_empty());
    assert_eq!(game.end_turn(), Err(GameError::GameOver));
}

#[test]
fn test_win_requires_every_condition() {
    let breakers: [fn(&mut GameState); 4] = [
        |g| {
            g.collected.remove(&TreasureKind::OceansChalice);
        },
        |g| g.players[1].position = DUNES,
        |g| g.players[0].hand.clear(),
        |g| g.board.set_state(TileName::FoolsLanding, TileState::Flooded),
    ];

    for breaker in breakers {
        let mut game = winning_game();
        breaker(&mut game);
        assert!(!game.win_conditions_met());
        game.end_turn().unwrap();
        assert_eq!(game.outcome(), Outcome::InProgress);
    }
}

#[test]
fn test_loss_when_water_reaches_top() {
    let mut game = fixed_game(2);
    game.water_level = WaterLevelMeter::new(8);
    stack_decks(
        &mut game,
        vec![Card::Sandbag, Card::WatersRise],
        vec![TileName::MistyMarsh, TileName::Observatory],
    );
    assert_eq!(game.loss_reason(), None);

    let events = game.end_turn().unwrap();

    assert_eq!(game.outcome(), Outcome::Lost(LossReason::WaterLevelMaxed));
    assert!(events.contains(&GameEvent::GameLost {
        reason: LossReason::WaterLevelMaxed
    }));
    // No further phases ran
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TileFlooded { .. } | GameEvent::TurnEnded { .. })));
    assert_eq!(game.current_player, 0);
}

#[test]
fn test_loss_when_safe_haven_sinks() {
    let mut game = fixed_game(2);
    stack_decks(
        &mut game,
        vec![Card::Sandbag, Card::Sandbag],
        vec![TileName::FoolsLanding, TileName::FoolsLanding],
    );
    assert_eq!(game.loss_reason(), None);

    let events = game.end_turn().unwrap();

    assert_eq!(game.outcome(), Outcome::Lost(LossReason::SafeHavenSunk));
    assert!(events.contains(&GameEvent::GameLost {
        reason: LossReason::SafeHavenSunk
    }));
    assert_eq!(game.use_sandbag(0, DUNES), Err(GameError::GameOver));
}

#[test]
fn test_loss_when_both_treasure_tiles_sink() {
    let mut game = fixed_game(2);
    game.board.set_state(TileName::TempleOfTheSun, TileState::Sunk);
    stack_decks(
        &mut game,
        vec![Card::Sandbag, Card::Sandbag],
        vec![TileName::TempleOfTheMoon, TileName::TempleOfTheMoon],
    );
    assert_eq!(game.loss_reason(), None);

    game.end_turn().unwrap();

    assert!(game.board.tile_at(TEMPLE_OF_THE_MOON).is_none());
    assert_eq!(
        game.outcome(),
        Outcome::Lost(LossReason::TreasureLost(TreasureKind::EarthStone))
    );
}

// ==================== Determinism ====================

/// Pick a move the way a hurried player would: end the turn often
fn choose_action(game: &GameState, chooser: &mut StdRng) -> Option<(PlayerId, GameAction)> {
    let actor = match &game.phase {
        GamePhase::HandLimit {
            players_remaining, ..
        } => *players_remaining.first()?,
        GamePhase::AwaitingAction => game.current_player,
        _ => return None,
    };
    let actions = game.valid_actions(actor);
    if actions.contains(&GameAction::EndTurn) && chooser.gen_bool(0.3) {
        return Some((actor, GameAction::EndTurn));
    }
    let index = chooser.gen_range(0..actions.len());
    Some((actor, actions[index].clone()))
}

#[test]
fn test_same_seed_plays_identically() {
    let config = GameConfig::new(1, 4).with_seed(2024);
    let mut a = GameState::new(config).unwrap();
    let mut b = GameState::new(config).unwrap();
    let mut chooser = StdRng::seed_from_u64(99);

    for _ in 0..150 {
        let Some((actor, action)) = choose_action(&a, &mut chooser) else {
            break;
        };
        let events_a = a.apply_action(actor, action.clone());
        let events_b = b.apply_action(actor, action);
        assert_eq!(events_a, events_b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}

#[test]
fn test_engines_do_not_share_decks() {
    let config = GameConfig::new(0, 2).with_seed(5);
    let mut a = GameState::new(config).unwrap();
    let b = GameState::new(config).unwrap();
    let untouched_treasure = b.treasure_pile.clone();
    let untouched_flood = b.flood_pile.clone();

    a.end_turn().unwrap();

    assert_ne!(a.flood_pile, untouched_flood);
    assert_eq!(b.treasure_pile, untouched_treasure);
    assert_eq!(b.flood_pile, untouched_flood);
}

#[test]
fn test_different_seeds_differ() {
    let a = GameState::new(GameConfig::new(0, 4).with_seed(1)).unwrap();
    let b = GameState::new(GameConfig::new(0, 4).with_seed(2)).unwrap();
    assert_ne!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_state_round_trips_through_json() {
    let game = GameState::new(GameConfig::new(2, 3).with_seed(11)).unwrap();
    let json = serde_json::to_string(&game).unwrap();
    let back: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.board, game.board);
    assert_eq!(back.players, game.players);
    assert_eq!(back.seed(), 11);
}

#[test]
fn test_restored_game_continues_same_random_stream() {
    let mut game = GameState::new(GameConfig::new(2, 3).with_seed(11)).unwrap();
    let mut chooser = StdRng::seed_from_u64(4);
    for _ in 0..20 {
        let Some((actor, action)) = choose_action(&game, &mut chooser) else {
            break;
        };
        game.apply_action(actor, action).unwrap();
    }

    let json = serde_json::to_string(&game).unwrap();
    let mut first: GameState = serde_json::from_str(&json).unwrap();
    let mut second: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(first.seed(), 11);
    assert_eq!(serde_json::to_string(&first).unwrap(), json);

    // Enough turns to pass several deck reshuffles
    for _ in 0..200 {
        let Some((actor, action)) = choose_action(&game, &mut chooser) else {
            break;
        };
        let expected = game.apply_action(actor, action.clone());
        assert_eq!(first.apply_action(actor, action.clone()), expected);
        assert_eq!(second.apply_action(actor, action), expected);
    }
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&game).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&second).unwrap(),
        serde_json::to_string(&game).unwrap()
    );
}

#[test]
fn test_restored_game_draws_same_end_turn() {
    let game = GameState::new(GameConfig::new(3, 2).with_seed(8)).unwrap();
    let json = serde_json::to_string(&game).unwrap();
    let mut first: GameState = serde_json::from_str(&json).unwrap();
    let mut second: GameState = serde_json::from_str(&json).unwrap();

    for _ in 0..10 {
        let a = first.end_turn();
        let b = second.end_turn();
        assert_eq!(a, b);
        if a.is_err() {
            break;
        }
    }
}

// ==================== Properties ====================

/// Any action at all, legal or not
fn arbitrary_action(game: &GameState, rng: &mut StdRng) -> (PlayerId, GameAction) {
    const CARDS: [Card; 5] = [FIRE, EARTH, Card::HelicopterLift, Card::Sandbag, Card::WatersRise];
    let players = game.player_count() as u8;
    let player = rng.gen_range(0..=players);
    let other = rng.gen_range(0..=players);
    let cell = Cell::new(rng.gen_range(-1..7), rng.gen_range(-1..7));
    let card = CARDS[rng.gen_range(0..CARDS.len())];
    let action = match rng.gen_range(0..9) {
        0 => GameAction::Move(cell),
        1 => GameAction::ShoreUp(cell),
        2 => GameAction::GiveCard { to: other, card },
        3 => GameAction::CollectTreasure,
        4 => GameAction::Command { target: other, to: cell },
        5 => GameAction::UseSandbag(cell),
        6 => GameAction::UseHelicopter {
            group: vec![player, other],
            to: cell,
        },
        7 => GameAction::Discard(card),
        _ => GameAction::EndTurn,
    };
    (player, action)
}

fn tile_states(game: &GameState) -> BTreeMap<TileName, TileState> {
    game.board.tiles().map(|t| (t.name, t.state)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_random_play_preserves_invariants(
        seed in any::<u64>(),
        players in 2u8..=4,
        difficulty in 0u8..=3,
        steps in 1usize..250,
    ) {
        let config = GameConfig::new(difficulty, players).with_seed(seed);
        let mut game = GameState::new(config).unwrap();
        let mut chooser = StdRng::seed_from_u64(seed.rotate_left(17));
        let mut level = game.water_level.level();
        let mut states = tile_states(&game);

        for _ in 0..steps {
            let Some((actor, action)) = choose_action(&game, &mut chooser) else {
                break;
            };
            prop_assert!(game.apply_action(actor, action).is_ok());

            prop_assert_eq!(game.treasure_cards_accounted(), Card::DECK_SIZE);
            prop_assert_eq!(game.flood_cards_accounted(), TileName::ALL.len());
            prop_assert!(game.players.iter().all(|p| !p.has_card(Card::WatersRise)));

            prop_assert!(game.water_level.level() >= level);
            level = game.water_level.level();

            let next = tile_states(&game);
            for (name, before) in &states {
                if *before == TileState::Sunk {
                    prop_assert_eq!(next[name], TileState::Sunk);
                }
            }
            states = next;

            let collected = game.collected.len();
            prop_assert!(collected <= TreasureKind::ALL.len());
        }
    }

    #[test]
    fn prop_rejected_actions_change_nothing(
        seed in any::<u64>(),
        players in 2u8..=4,
        attempts in 1usize..120,
    ) {
        let mut game = GameState::new(GameConfig::new(0, players).with_seed(seed)).unwrap();
        let mut rng = StdRng::seed_from_u64(seed ^ 0xA5A5);

        for _ in 0..attempts {
            let (player, action) = arbitrary_action(&game, &mut rng);
            let before = serde_json::to_string(&game).unwrap();
            if game.apply_action(player, action).is_err() {
                prop_assert_eq!(serde_json::to_string(&game).unwrap(), before);
            }
            prop_assert_eq!(game.treasure_cards_accounted(), Card::DECK_SIZE);
            prop_assert_eq!(game.flood_cards_accounted(), TileName::ALL.len());
        }
    }

    #[test]
    fn prop_flooded_tiles_dry_only_by_shoring_up(
        seed in any::<u64>(),
        players in 2u8..=4,
        difficulty in 0u8..=3,
        steps in 1usize..250,
    ) {
        let config = GameConfig::new(difficulty, players).with_seed(seed);
        let mut game = GameState::new(config).unwrap();
        let mut chooser = StdRng::seed_from_u64(seed.rotate_right(9));
        let mut states = tile_states(&game);

        for _ in 0..steps {
            let Some((actor, action)) = choose_action(&game, &mut chooser) else {
                break;
            };
            let target = match &action {
                GameAction::ShoreUp(cell) | GameAction::UseSandbag(cell) => {
                    game.board.tile_at(*cell).map(|t| t.name)
                }
                _ => None,
            };
            prop_assert!(game.apply_action(actor, action).is_ok());
            let next = tile_states(&game);

            for (name, before) in &states {
                let after = next[name];
                if Some(*name) == target {
                    prop_assert_eq!(*before, TileState::Flooded);
                    prop_assert_eq!(after, TileState::Dry);
                } else if target.is_some() {
                    prop_assert_eq!(after, *before);
                } else if *before == TileState::Flooded {
                    prop_assert_ne!(after, TileState::Dry);
                }
            }
            states = next;
        }
    }
}
