//! WASM bindings for the Yarn Fever engine.
//!
//! Exposed to JavaScript via wasm-bindgen. Only compiled with the `wasm`
//! feature.

use crate::{builtin_levels, Game, LevelSet, LoadOutcome, SlotId, YarnId};
use wasm_bindgen::prelude::*;

/// A Yarn Fever play session exposed to JavaScript.
#[wasm_bindgen]
pub struct WasmGame {
    inner: Game,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a session over the builtin level set.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmGame {
        WasmGame {
            inner: Game::new(builtin_levels()),
        }
    }

    /// Replace the level set with a parsed level file `{ levels: [...] }`
    /// and restart from the first level. Returns false and keeps the
    /// current session when the value does not parse.
    #[wasm_bindgen(js_name = loadLevels)]
    pub fn load_levels(&mut self, levels: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<LevelSet>(levels) {
            Ok(set) => {
                self.inner = Game::new(set.levels);
                true
            }
            Err(_) => false,
        }
    }

    /// Pick up a yarn. Returns true if its slot releases it.
    #[wasm_bindgen(js_name = selectYarn)]
    pub fn select_yarn(&mut self, yarn: u16) -> bool {
        self.inner.select(YarnId(yarn))
    }

    /// Put down the current selection without moving it.
    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.inner.clear_selection();
    }

    /// Apply a move. Returns `{accepted, triplets, cleared}` where
    /// `cleared` is `{moves, score, perfect}` or null.
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, yarn: u16, dest: u8) -> JsValue {
        let outcome = self.inner.apply_move(YarnId(yarn), SlotId(dest));
        let view = OutcomeView {
            accepted: outcome.accepted,
            triplets: outcome.triplets,
            cleared: outcome.cleared.map(|clear| ClearView {
                moves: clear.moves,
                score: clear.score,
                perfect: clear.perfect,
            }),
        };
        serde_wasm_bindgen::to_value(&view).unwrap()
    }

    /// Undo the most recent move. Returns true if a move was undone.
    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    /// Suggest a move as `{yarn, dest}`, or null when nothing can move.
    pub fn hint(&mut self) -> JsValue {
        match self.inner.find_hint() {
            Some(hint) => {
                let view = HintView {
                    yarn: hint.yarn.0,
                    dest: hint.dest.0,
                };
                serde_wasm_bindgen::to_value(&view).unwrap()
            }
            None => JsValue::NULL,
        }
    }

    /// Restart the current level. Session totals are kept.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Advance to the next level. Returns true while a level loaded,
    /// false once the set is exhausted.
    #[wasm_bindgen(js_name = nextLevel)]
    pub fn next_level(&mut self) -> bool {
        matches!(self.inner.next_level(), LoadOutcome::Loaded(_))
    }

    /// Full session snapshot as a JS object with slots and yarns.
    pub fn state(&self) -> JsValue {
        let board = self.inner.board();
        let palette = board.palette();
        let mut yarns = Vec::new();
        let slots: Vec<SlotView> = board
            .slots()
            .iter()
            .map(|slot| {
                for (layer, y) in slot.stack().iter().enumerate() {
                    yarns.push(YarnView {
                        id: y.id.0,
                        color: palette[y.color.0 as usize].clone(),
                        slot: slot.id.0,
                        layer: layer as u8,
                    });
                }
                SlotView {
                    id: slot.id.0,
                    kind: slot.kind.as_str(),
                    capacity: slot.capacity(),
                    target_color: slot
                        .target_color()
                        .map(|color| palette[color.0 as usize].clone()),
                    yarns: slot.stack().iter().map(|y| y.id.0).collect(),
                }
            })
            .collect();
        let view = GameView {
            level: board.level(),
            name: self.inner.level_name().map(str::to_string),
            moves: board.moves(),
            score: board.score(),
            total_score: self.inner.total_score(),
            completed_levels: self.inner.completed_levels(),
            level_count: self.inner.level_count(),
            cleared: board.was_cleared(),
            can_undo: board.can_undo(),
            selected: board.selected().map(|y| y.0),
            hinted: board.hinted().map(|y| y.0),
            slots,
            yarns,
        };
        serde_wasm_bindgen::to_value(&view).unwrap()
    }

    /// Id of the level in play.
    #[wasm_bindgen(js_name = currentLevel)]
    pub fn current_level(&self) -> u32 {
        self.inner.current_level()
    }

    /// Moves made on this level, undos included.
    pub fn moves(&self) -> u32 {
        self.inner.board().moves()
    }

    /// Running score for this level.
    pub fn score(&self) -> u32 {
        self.inner.board().score()
    }

    /// Session score across levels.
    #[wasm_bindgen(js_name = totalScore)]
    pub fn total_score(&self) -> u32 {
        self.inner.total_score()
    }

    /// Yarns still in play on this level.
    #[wasm_bindgen(js_name = yarnsLeft)]
    pub fn yarns_left(&self) -> u16 {
        self.inner.board().yarns_left()
    }
}

impl Default for WasmGame {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(serde::Serialize)]
struct OutcomeView {
    accepted: bool,
    triplets: u8,
    cleared: Option<ClearView>,
}

#[derive(serde::Serialize)]
struct ClearView {
    moves: u32,
    score: u32,
    perfect: bool,
}

#[derive(serde::Serialize)]
struct HintView {
    yarn: u16,
    dest: u8,
}

#[derive(serde::Serialize)]
struct GameView {
    level: u32,
    name: Option<String>,
    moves: u32,
    score: u32,
    total_score: u32,
    completed_levels: u32,
    level_count: usize,
    cleared: bool,
    can_undo: bool,
    selected: Option<u16>,
    hinted: Option<u16>,
    slots: Vec<SlotView>,
    yarns: Vec<YarnView>,
}

#[derive(serde::Serialize)]
struct SlotView {
    id: u8,
    kind: &'static str,
    capacity: u8,
    target_color: Option<String>,
    yarns: Vec<u16>,
}

#[derive(serde::Serialize)]
struct YarnView {
    id: u16,
    color: String,
    slot: u8,
    layer: u8,
}
