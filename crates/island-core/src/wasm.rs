//! WebAssembly bindings for the island engine.
//!
//! Everything crosses the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::config::GameConfig;
use crate::game::GameState;
use crate::grid::Cell;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game from a difficulty (0-3) and player count (2-4)
    #[wasm_bindgen(constructor)]
    pub fn new(difficulty: u8, player_count: u8) -> Result<WasmGame, JsValue> {
        let state = GameState::new_game(difficulty, player_count)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Create a game from a JSON config, e.g. `{"player_count": 3, "seed": 7}`
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(config_json: &str) -> Result<WasmGame, JsValue> {
        let config =
            GameConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let state = GameState::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player
    }

    /// Get board state as JSON (for rendering)
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        serde_json::to_string(&self.state.board_snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get a specific player's state as JSON
    #[wasm_bindgen(js_name = getPlayer)]
    pub fn get_player(&self, player: u8) -> String {
        match self.state.get_player(player) {
            Some(p) => serde_json::to_string(p).unwrap_or_else(|_| "{}".to_string()),
            None => "null".to_string(),
        }
    }

    /// Cells a player can move to, as a JSON array
    #[wasm_bindgen(js_name = getLegalMoves)]
    pub fn get_legal_moves(&self, player: u8) -> String {
        let cells: Vec<Cell> = self.state.legal_moves(player).into_iter().collect();
        serde_json::to_string(&cells).unwrap_or_else(|_| "[]".to_string())
    }

    /// Cells a player can shore up, as a JSON array
    #[wasm_bindgen(js_name = getShoreUpTargets)]
    pub fn get_shore_up_targets(&self, player: u8) -> String {
        let cells: Vec<Cell> = self.state.shore_up_targets(player).into_iter().collect();
        serde_json::to_string(&cells).unwrap_or_else(|_| "[]".to_string())
    }

    /// Water level, flood cards per turn and danger flag
    #[wasm_bindgen(js_name = getWaterLevel)]
    pub fn get_water_level(&self) -> String {
        serde_json::to_string(&self.state.water_level_info()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Treasures claimed so far
    #[wasm_bindgen(js_name = getCollected)]
    pub fn get_collected(&self) -> String {
        serde_json::to_string(self.state.collected_kinds()).unwrap_or_else(|_| "[]".to_string())
    }

    /// "InProgress", "Won" or the loss reason
    #[wasm_bindgen(js_name = getOutcome)]
    pub fn get_outcome(&self) -> String {
        serde_json::to_string(&self.state.outcome())
            .unwrap_or_else(|_| "\"InProgress\"".to_string())
    }

    /// Get the current phase as a string
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        serde_json::to_string(&self.state.phase).unwrap_or_else(|_| "\"Unknown\"".to_string())
    }

    /// Get valid actions for a specific player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, player: u8) -> String {
        let actions = self.state.valid_actions(player);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(player, action) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}
