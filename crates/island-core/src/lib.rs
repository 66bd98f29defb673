//! Island Core - rule engine for a cooperative island survival board game
//!
//! Two to four adventurers move across a sinking island, shore up flooded
//! tiles, trade treasure cards and try to claim four treasures before
//! escaping by helicopter from the safe haven.
//!
//! # Architecture
//!
//! The engine is a single-threaded state machine with no I/O. A front end
//! reads state through query methods and snapshots, then submits
//! [`GameAction`]s to [`GameState::apply_action`]. It can be compiled to:
//! - Native Rust for tests and tools
//! - WebAssembly (with the `wasm` feature) for a browser client
//!
//! # Modules
//!
//! - [`grid`]: The 6x6 grid and its 24-cell island layout
//! - [`board`]: Tiles, flood states and reachability queries
//! - [`pile`]: Draw and discard stacks for both decks
//! - [`water`]: The water level meter
//! - [`rng`]: Seeded, resumable randomness
//! - [`player`]: Roles, capabilities, cards and hands
//! - [`actions`]: Actions players submit and the events they produce
//! - [`config`]: Game setup options
//! - [`game`]: Game state machine with full rule enforcement

pub mod actions;
pub mod board;
pub mod config;
pub mod game;
pub mod grid;
pub mod pile;
pub mod player;
pub mod rng;
pub mod water;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, MoveKind, PileKind};
pub use board::{
    Board, BoardSnapshot, FloodOutcome, Tile, TileName, TileSnapshot, TileState, TreasureKind,
};
pub use config::GameConfig;
pub use game::{GameError, GamePhase, GameState, LossReason, Outcome, ResumeAfterDiscard};
pub use grid::Cell;
pub use pile::Pile;
pub use player::{Capability, Card, Player, PlayerId, Role};
pub use rng::{GameRng, RngState};
pub use water::{WaterLevelInfo, WaterLevelMeter};
