//! Yarn Fever puzzle logic with slot-stack board representation.
//!
//! # Slot Layout
//!
//! ```text
//! A board is a flat list of slots built in a fixed order:
//!
//!   [0 .. t)       target slots   t = min(targetSlots, 4), capacity = slotCapacity
//!   [t .. t+h)     temp slots     h = tempSlots, capacity = 6
//!   [t+h .. t+h+2) blocker slots  capacity = blockerCapacity
//!
//! Slot ids are indices into this list. Every scan (hints, target color
//! reassignment) walks the list in this order, so results are
//! deterministic for a given board state.
//! ```
//!
//! # Stacks and Layers
//!
//! Each slot holds a bottom-to-top stack of yarns. A yarn's layer is its
//! index in the owning stack, so layers follow the stack through every
//! mutation. Temp and blocker slots release only their top yarn; target
//! slots release any member so moves out of them can be undone.
//!
//! # Colors
//!
//! Level descriptors name colors as hex strings. The board interns them
//! into a palette in first-seen order and works with compact `ColorId`
//! indices. The palette order also seeds the initial target colors.

#[cfg(feature = "wasm")]
pub mod wasm;

use serde::Deserialize;

/// Slot role on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum SlotKind {
    /// Collects a single color and clears when full of it.
    Target,
    /// Layered working storage where yarns start out. Must be emptied
    /// to clear the level.
    Temp,
    /// Overflow storage. Accepts any color but releases only its top.
    Blocker,
}

impl SlotKind {
    /// Wire name of the kind.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Target => "target",
            SlotKind::Temp => "temp",
            SlotKind::Blocker => "blocker",
        }
    }
}

/// Palette index of a yarn color. The hex string lives in the board's
/// palette.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ColorId(pub u8);

/// Yarn identifier. Equals the yarn's index in the level descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct YarnId(pub u16);

/// Index of a slot in the board's slot list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct SlotId(pub u8);

/// A single ball of yarn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Yarn {
    pub id: YarnId,
    pub color: ColorId,
}

/// A stack of yarns with a capacity and a kind-specific acceptance
/// policy.
#[derive(Clone, PartialEq, Debug)]
pub struct Slot {
    pub id: SlotId,
    pub kind: SlotKind,
    capacity: u8,
    stack: Vec<Yarn>,
    target_color: Option<ColorId>,
}

impl Slot {
    fn new(id: SlotId, kind: SlotKind, capacity: u8) -> Slot {
        Slot {
            id,
            kind,
            capacity,
            stack: Vec::new(),
            target_color: None,
        }
    }

    /// Maximum number of yarns this slot holds.
    #[inline]
    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Yarns in this slot, bottom to top.
    #[inline]
    pub fn stack(&self) -> &[Yarn] {
        &self.stack
    }

    /// Number of yarns currently stacked.
    #[inline]
    pub fn len(&self) -> u8 {
        self.stack.len() as u8
    }

    /// Check if the slot holds no yarns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// The color a target slot is currently collecting, if any.
    #[inline]
    pub fn target_color(&self) -> Option<ColorId> {
        self.target_color
    }

    /// The yarn on top of the stack.
    #[inline]
    pub fn top(&self) -> Option<Yarn> {
        self.stack.last().copied()
    }

    /// A yarn's height within this slot (0 = bottom).
    pub fn layer_of(&self, yarn: YarnId) -> Option<u8> {
        self.stack.iter().position(|y| y.id == yarn).map(|i| i as u8)
    }

    /// Check if a yarn of the given color may be dropped here.
    ///
    /// Capacity is checked first. Blocker and temp slots then take any
    /// color; target slots only their assigned color, or anything while
    /// unassigned.
    pub fn can_accept(&self, color: ColorId) -> bool {
        if self.stack.len() >= self.capacity as usize {
            return false;
        }
        match self.kind {
            SlotKind::Target => match self.target_color {
                Some(assigned) => assigned == color,
                None => true,
            },
            SlotKind::Temp | SlotKind::Blocker => true,
        }
    }

    /// Check if the given yarn may be picked up from this slot.
    ///
    /// Temp and blocker slots release only their top yarn; target slots
    /// release any member.
    pub fn can_pick(&self, yarn: YarnId) -> bool {
        match self.kind {
            SlotKind::Temp | SlotKind::Blocker => {
                self.top().is_some_and(|top| top.id == yarn)
            }
            SlotKind::Target => self.stack.iter().any(|y| y.id == yarn),
        }
    }

    /// Drop a yarn on top of the stack.
    ///
    /// Returns false and leaves the slot untouched when the slot does
    /// not accept it. The first yarn into an unassigned target slot
    /// fixes the slot's color.
    pub fn push(&mut self, yarn: Yarn) -> bool {
        if !self.can_accept(yarn.color) {
            return false;
        }
        if self.kind == SlotKind::Target && self.target_color.is_none() {
            self.target_color = Some(yarn.color);
        }
        self.stack.push(yarn);
        true
    }

    /// Remove a yarn from anywhere in the stack.
    ///
    /// Returns the yarn and the index it was removed from. An emptied
    /// target slot loses its color assignment.
    fn remove(&mut self, yarn: YarnId) -> Option<(Yarn, u8)> {
        let index = self.stack.iter().position(|y| y.id == yarn)?;
        let removed = self.stack.remove(index);
        if self.kind == SlotKind::Target && self.stack.is_empty() {
            self.target_color = None;
        }
        Some((removed, index as u8))
    }

    /// Reinsert a yarn at a recorded stack index.
    ///
    /// Skips the acceptance check (the yarn fit here before). An empty
    /// target takes the yarn's color even when a completion sweep has
    /// reassigned the slot since the yarn left, keeping the first-piece
    /// rule. The index is clamped to the current stack length.
    fn insert_at(&mut self, index: u8, yarn: Yarn) {
        if self.kind == SlotKind::Target && self.stack.is_empty() {
            self.target_color = Some(yarn.color);
        }
        let index = (index as usize).min(self.stack.len());
        self.stack.insert(index, yarn);
    }

    /// A target slot is complete when full of its assigned color.
    pub fn is_complete(&self) -> bool {
        if self.kind != SlotKind::Target {
            return false;
        }
        let Some(assigned) = self.target_color else {
            return false;
        };
        self.stack.len() == self.capacity as usize
            && self.stack.iter().all(|y| y.color == assigned)
    }
}

// ============================================================================
// LEVEL DESCRIPTORS - JSON wire format and builtin fallback set
// ============================================================================

/// One yarn entry in a level descriptor.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YarnPlacement {
    /// Color as a hex string, e.g. "#FF6B9D".
    pub color: String,
    /// Stacking height within the starting slot (lower = nearer the
    /// bottom). Ties keep declaration order.
    #[serde(default)]
    pub layer: u8,
    /// Temp slot index this yarn starts in. When absent, defaults to
    /// the yarn's declaration index modulo the temp slot count.
    #[serde(default)]
    pub position: Option<u8>,
}

/// A level descriptor as parsed from a level file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Target slot count, capped at 4 by the board.
    #[serde(default = "default_target_slots")]
    pub target_slots: u8,
    #[serde(default = "default_temp_slots")]
    pub temp_slots: u8,
    /// Capacity of each target slot.
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: u8,
    /// Capacity of each of the two blocker slots.
    #[serde(default = "default_blocker_capacity")]
    pub blocker_capacity: u8,
    pub yarns: Vec<YarnPlacement>,
}

/// Top-level shape of a level file.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelSet {
    pub levels: Vec<Level>,
}

fn default_target_slots() -> u8 {
    4
}

fn default_temp_slots() -> u8 {
    3
}

fn default_slot_capacity() -> u8 {
    3
}

fn default_blocker_capacity() -> u8 {
    2
}

fn yarn(color: &str, layer: u8, position: u8) -> YarnPlacement {
    YarnPlacement {
        color: color.to_string(),
        layer,
        position: Some(position),
    }
}

/// The built-in level set, used when no level file is available.
pub fn builtin_levels() -> Vec<Level> {
    vec![
        Level {
            id: 1,
            name: Some("Getting Started".to_string()),
            target_slots: 4,
            temp_slots: 3,
            slot_capacity: 3,
            blocker_capacity: 2,
            yarns: vec![
                yarn("#FF6B9D", 0, 0),
                yarn("#FF6B9D", 0, 1),
                yarn("#FF6B9D", 1, 0),
                yarn("#4ECDC4", 0, 2),
                yarn("#4ECDC4", 1, 1),
                yarn("#4ECDC4", 2, 0),
                yarn("#FFD93D", 1, 2),
                yarn("#FFD93D", 2, 1),
                yarn("#FFD93D", 2, 2),
            ],
        },
        Level {
            id: 2,
            name: Some("Color Mix".to_string()),
            target_slots: 4,
            temp_slots: 3,
            slot_capacity: 3,
            blocker_capacity: 2,
            yarns: vec![
                yarn("#FF6B9D", 0, 0),
                yarn("#4ECDC4", 0, 1),
                yarn("#FFD93D", 0, 2),
                yarn("#A8E6CF", 1, 0),
                yarn("#FF6B9D", 1, 1),
                yarn("#4ECDC4", 1, 2),
                yarn("#FFD93D", 2, 0),
                yarn("#A8E6CF", 2, 1),
                yarn("#FF6B9D", 2, 2),
                yarn("#4ECDC4", 2, 0),
                yarn("#FFD93D", 2, 1),
                yarn("#A8E6CF", 2, 2),
            ],
        },
        Level {
            id: 3,
            name: Some("Rainbow Challenge".to_string()),
            target_slots: 4,
            temp_slots: 4,
            slot_capacity: 3,
            blocker_capacity: 2,
            yarns: vec![
                yarn("#FF6B9D", 0, 0),
                yarn("#FF6B9D", 0, 1),
                yarn("#FF6B9D", 1, 0),
                yarn("#4ECDC4", 0, 2),
                yarn("#4ECDC4", 1, 1),
                yarn("#4ECDC4", 1, 2),
                yarn("#FFD93D", 0, 3),
                yarn("#FFD93D", 1, 3),
                yarn("#FFD93D", 2, 0),
                yarn("#A8E6CF", 2, 1),
                yarn("#A8E6CF", 2, 2),
                yarn("#A8E6CF", 2, 3),
                yarn("#FF8B94", 2, 0),
                yarn("#FF8B94", 2, 1),
                yarn("#FF8B94", 2, 2),
            ],
        },
    ]
}

// ============================================================================
// MOVE RECORDS & OUTCOMES
// ============================================================================

/// History entry for one applied move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveRecord {
    /// The yarn that moved.
    pub yarn: YarnId,
    /// Slot it was lifted from.
    pub from: SlotId,
    /// Stack index it was lifted from. Target slots release mid-stack,
    /// so undo needs the exact position to restore stack order.
    pub from_index: u8,
    /// Slot it landed on.
    pub to: SlotId,
}

/// What clearing a level was worth.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelClear {
    /// Moves spent on the level, undos included.
    pub moves: u32,
    /// Final level score. Replaces any running triplet bonuses.
    pub score: u32,
    /// Whether the level finished within the move par.
    pub perfect: bool,
}

/// Result of a move request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveOutcome {
    /// False when the move was rejected. Nothing changed in that case.
    pub accepted: bool,
    /// Target stacks completed and swept by this move.
    pub triplets: u8,
    /// Set when this move cleared the level.
    pub cleared: Option<LevelClear>,
}

impl MoveOutcome {
    /// The outcome of a rejected move.
    #[inline]
    pub fn rejected() -> MoveOutcome {
        MoveOutcome {
            accepted: false,
            triplets: 0,
            cleared: None,
        }
    }
}

/// A suggested move: lift `yarn` and drop it on `dest`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Hint {
    pub yarn: YarnId,
    pub dest: SlotId,
}

// ============================================================================
// BOARD - Per-level state machine
// ============================================================================

/// The playing field for one level.
///
/// Owns the slots, the yarn location index, the color palette, and the
/// move history. All mutation goes through `apply_move` and `undo`;
/// every other operation is read-only.
#[derive(Clone, PartialEq, Debug)]
pub struct Board {
    level: u32,
    slots: Vec<Slot>,
    /// Where each yarn currently sits. `None` once swept off the board,
    /// or never set because the descriptor entry was unplaceable.
    locations: Vec<Option<SlotId>>,
    palette: Vec<String>,
    history: Vec<MoveRecord>,
    moves: u32,
    score: u32,
    cleared: bool,
    selected: Option<YarnId>,
    hinted: Option<YarnId>,
}

impl Board {
    /// Most target slots a board will lay out.
    pub const MAX_TARGETS: u8 = 4;
    /// Temp slots get fixed stacking headroom regardless of level
    /// settings.
    pub const TEMP_CAPACITY: u8 = 6;
    /// Blocker slots per board.
    pub const BLOCKER_COUNT: u8 = 2;
    /// Score awarded for each completed target stack.
    pub const TRIPLET_BONUS: u32 = 100;
    /// Base score for clearing a level.
    pub const CLEAR_BASE: u32 = 1000;
    /// Score deducted per move, up to `MAX_MOVE_PENALTY` in total.
    pub const MOVE_PENALTY: u32 = 5;
    /// Cap on the total move penalty.
    pub const MAX_MOVE_PENALTY: u32 = 500;
    /// The penalized base never drops below this.
    pub const MIN_CLEAR_SCORE: u32 = 100;
    /// Extra score per level number.
    pub const LEVEL_BONUS: u32 = 100;
    /// Awarded when the level is cleared within the move par.
    pub const PERFECT_BONUS: u32 = 500;
    /// Par is this many moves per level number.
    pub const PERFECT_PAR: u32 = 3;

    /// Lay out a board from a level descriptor.
    ///
    /// Yarns are grouped by their starting temp slot, ordered ascending
    /// by layer, and stacked bottom to top. Entries that cannot be
    /// placed (a position with no matching slot, or more yarns than the
    /// slot holds) are dropped. Target slots are seeded with the
    /// level's colors in declaration order.
    pub fn from_level(level: &Level) -> Board {
        let target_count = level.target_slots.min(Self::MAX_TARGETS);
        let temp_count = level.temp_slots;

        let mut slots = Vec::with_capacity(
            target_count as usize + temp_count as usize + Self::BLOCKER_COUNT as usize,
        );
        for _ in 0..target_count {
            let id = SlotId(slots.len() as u8);
            slots.push(Slot::new(id, SlotKind::Target, level.slot_capacity));
        }
        for _ in 0..temp_count {
            let id = SlotId(slots.len() as u8);
            slots.push(Slot::new(id, SlotKind::Temp, Self::TEMP_CAPACITY));
        }
        for _ in 0..Self::BLOCKER_COUNT {
            let id = SlotId(slots.len() as u8);
            slots.push(Slot::new(id, SlotKind::Blocker, level.blocker_capacity));
        }

        let mut palette: Vec<String> = Vec::new();
        let mut locations = vec![None; level.yarns.len()];

        // Group placements by starting slot, keeping layer and identity
        // so each group can be ordered before stacking.
        let mut groups: Vec<Vec<(u8, YarnId, ColorId)>> = vec![Vec::new(); temp_count as usize];
        for (index, placement) in level.yarns.iter().enumerate() {
            let Some(color) = intern_color(&mut palette, &placement.color) else {
                continue;
            };
            let Ok(id) = u16::try_from(index) else {
                continue;
            };
            let position = match placement.position {
                Some(position) => position,
                None if temp_count > 0 => (index % temp_count as usize) as u8,
                None => continue,
            };
            if position >= temp_count {
                continue;
            }
            groups[position as usize].push((placement.layer, YarnId(id), color));
        }

        for (offset, mut group) in groups.into_iter().enumerate() {
            let slot_index = target_count as usize + offset;
            group.sort_by_key(|&(layer, _, _)| layer);
            for (_, id, color) in group {
                let slot = &mut slots[slot_index];
                if slot.stack.len() >= slot.capacity as usize {
                    continue;
                }
                locations[id.0 as usize] = Some(SlotId(slot_index as u8));
                slot.stack.push(Yarn { id, color });
            }
        }

        // Seed target colors with the palette in declaration order.
        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.kind == SlotKind::Target && index < palette.len() {
                slot.target_color = Some(ColorId(index as u8));
            }
        }

        Board {
            level: level.id,
            slots,
            locations,
            palette,
            history: Vec::new(),
            moves: 0,
            score: 0,
            cleared: false,
            selected: None,
            hinted: None,
        }
    }

    // ========== State Queries ==========

    /// Level number this board was built from.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// All slots in board order: targets, then temps, then blockers.
    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Look up a slot by id.
    #[inline]
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.0 as usize)
    }

    /// The interned color palette, hex strings in first-seen order.
    #[inline]
    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Hex string for a color id.
    #[inline]
    pub fn color_hex(&self, color: ColorId) -> Option<&str> {
        self.palette.get(color.0 as usize).map(String::as_str)
    }

    /// Where a yarn currently sits. `None` when it is out of play.
    #[inline]
    pub fn yarn_slot(&self, yarn: YarnId) -> Option<SlotId> {
        self.locations.get(yarn.0 as usize).copied().flatten()
    }

    /// Number of yarn entries the level declared, placeable or not.
    /// Yarn ids below this count are valid for this board.
    #[inline]
    pub fn yarn_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of yarns still in play.
    pub fn yarns_left(&self) -> u16 {
        self.locations.iter().filter(|slot| slot.is_some()).count() as u16
    }

    /// Moves made on this level. Undo counts as a move.
    #[inline]
    pub fn moves(&self) -> u32 {
        self.moves
    }

    /// Running level score: triplet bonuses until the clear formula
    /// replaces them.
    #[inline]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Check if there is a move to undo.
    #[inline]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// The yarn currently picked up, if any.
    #[inline]
    pub fn selected(&self) -> Option<YarnId> {
        self.selected
    }

    /// The yarn flagged by the last hint, until the next mutation.
    #[inline]
    pub fn hinted(&self) -> Option<YarnId> {
        self.hinted
    }

    /// Check the win condition: every temp slot is empty. Target and
    /// blocker contents do not matter.
    pub fn is_cleared(&self) -> bool {
        self.slots
            .iter()
            .filter(|slot| slot.kind == SlotKind::Temp)
            .all(|slot| slot.is_empty())
    }

    /// Check if this level's clear has already been scored. Stays set
    /// even when an undo refills a temp slot afterwards.
    #[inline]
    pub fn was_cleared(&self) -> bool {
        self.cleared
    }

    // ========== Move Protocol ==========

    /// Check whether a yarn could legally move to `dest` right now.
    ///
    /// Pure: the yarn is evaluated in place and nothing is mutated.
    pub fn can_place(&self, yarn: YarnId, dest: SlotId) -> bool {
        let Some(from) = self.yarn_slot(yarn) else {
            return false;
        };
        let Some(source) = self.slot(from) else {
            return false;
        };
        if !source.can_pick(yarn) {
            return false;
        }
        let Some(color) = source.stack.iter().find(|y| y.id == yarn).map(|y| y.color) else {
            return false;
        };
        match self.slot(dest) {
            Some(slot) => slot.can_accept(color),
            None => false,
        }
    }

    /// Pick up a yarn. Fails when its slot will not release it; a
    /// failed pick drops any previous selection.
    pub fn select(&mut self, yarn: YarnId) -> bool {
        let ok = self
            .yarn_slot(yarn)
            .and_then(|id| self.slot(id))
            .is_some_and(|slot| slot.can_pick(yarn));
        self.selected = if ok { Some(yarn) } else { None };
        ok
    }

    /// Put down the current selection without moving it.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Apply a move: lift `yarn` and drop it on `dest`.
    ///
    /// On success the move is recorded and counted, then the completion
    /// sweep and the win check run. Dropping a yarn back on its own slot
    /// is a legal move when the slot accepts it. A rejected move changes
    /// nothing.
    pub fn apply_move(&mut self, yarn: YarnId, dest: SlotId) -> MoveOutcome {
        if !self.can_place(yarn, dest) {
            return MoveOutcome::rejected();
        }
        let Some(from) = self.yarn_slot(yarn) else {
            return MoveOutcome::rejected();
        };
        let Some((moved, from_index)) = self.slots[from.0 as usize].remove(yarn) else {
            return MoveOutcome::rejected();
        };
        let placed = self.slots[dest.0 as usize].push(moved);
        debug_assert!(placed, "destination refused a validated move");

        self.locations[yarn.0 as usize] = Some(dest);
        self.history.push(MoveRecord {
            yarn,
            from,
            from_index,
            to: dest,
        });
        self.moves += 1;
        self.selected = None;
        self.hinted = None;

        let triplets = self.sweep_triplets();
        let cleared = self.check_clear();

        MoveOutcome {
            accepted: true,
            triplets,
            cleared,
        }
    }

    // ========== Completion Sweep ==========

    /// Sweep completed target stacks.
    ///
    /// Each completed target awards the triplet bonus, drops its yarns
    /// from play, and is immediately reassigned the first color found in
    /// the temp and blocker stacks that no other target is collecting.
    /// Targets are processed in board order, so a color taken for an
    /// earlier slot is already claimed when a later one is scanned.
    fn sweep_triplets(&mut self) -> u8 {
        let mut swept = 0;
        for index in 0..self.slots.len() {
            if !self.slots[index].is_complete() {
                continue;
            }
            let drained: Vec<Yarn> = self.slots[index].stack.drain(..).collect();
            for yarn in &drained {
                self.locations[yarn.id.0 as usize] = None;
            }
            // Records naming swept yarns can no longer be undone.
            self.history
                .retain(|record| self.locations[record.yarn.0 as usize].is_some());
            self.slots[index].target_color = None;
            self.score += Self::TRIPLET_BONUS;
            self.reassign_target(index);
            swept += 1;
        }
        swept
    }

    /// Pick the next color for a freshly swept target slot: the first
    /// color in the temp and blocker stacks, bottom to top in board
    /// order, that no other target has. Stays unassigned when every
    /// remaining color is claimed.
    fn reassign_target(&mut self, target: usize) {
        let claimed: Vec<ColorId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| *index != target && slot.kind == SlotKind::Target)
            .filter_map(|(_, slot)| slot.target_color)
            .collect();
        let next = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.kind, SlotKind::Temp | SlotKind::Blocker))
            .flat_map(|slot| slot.stack.iter())
            .map(|y| y.color)
            .find(|color| !claimed.contains(color));
        self.slots[target].target_color = next;
    }

    // ========== Win Check ==========

    /// Score the clear once, on the move that empties the temps.
    ///
    /// Level ids come straight from level files, so the id arithmetic
    /// saturates instead of overflowing.
    fn check_clear(&mut self) -> Option<LevelClear> {
        if self.cleared || !self.is_cleared() {
            return None;
        }
        self.cleared = true;
        let penalty = self
            .moves
            .saturating_mul(Self::MOVE_PENALTY)
            .min(Self::MAX_MOVE_PENALTY);
        let base = (Self::CLEAR_BASE - penalty).max(Self::MIN_CLEAR_SCORE);
        let perfect = self.moves <= self.level.saturating_mul(Self::PERFECT_PAR);
        let mut score = base.saturating_add(self.level.saturating_mul(Self::LEVEL_BONUS));
        if perfect {
            score = score.saturating_add(Self::PERFECT_BONUS);
        }
        self.score = score;
        Some(LevelClear {
            moves: self.moves,
            score,
            perfect,
        })
    }

    // ========== Undo ==========

    /// Undo the most recent move.
    ///
    /// The yarn is spliced back into its recorded source position, so
    /// stack order survives the round trip. Counts as a move; no sweep
    /// or win check runs on the restored position. Returns false on
    /// empty history.
    pub fn undo(&mut self) -> bool {
        let Some(&record) = self.history.last() else {
            return false;
        };
        let Some((yarn, _)) = self.slots[record.to.0 as usize].remove(record.yarn) else {
            return false;
        };
        self.history.pop();
        self.slots[record.from.0 as usize].insert_at(record.from_index, yarn);
        self.locations[yarn.id.0 as usize] = Some(record.from);
        self.moves += 1;
        self.selected = None;
        self.hinted = None;
        true
    }

    // ========== Hints ==========

    /// Suggest a move: the first (yarn, destination) pair found by
    /// checking each slot's top yarn against every other slot in board
    /// order. The suggested yarn stays flagged until the next mutation.
    pub fn find_hint(&mut self) -> Option<Hint> {
        let hint = self.scan_hint();
        self.hinted = hint.map(|h| h.yarn);
        hint
    }

    fn scan_hint(&self) -> Option<Hint> {
        for source in &self.slots {
            let Some(top) = source.top() else {
                continue;
            };
            for dest in &self.slots {
                if dest.id != source.id && dest.can_accept(top.color) {
                    return Some(Hint {
                        yarn: top.id,
                        dest: dest.id,
                    });
                }
            }
        }
        None
    }
}

/// Intern a hex color string, returning its palette index. Fails once
/// the palette is full.
fn intern_color(palette: &mut Vec<String>, hex: &str) -> Option<ColorId> {
    if let Some(index) = palette.iter().position(|color| color == hex) {
        return Some(ColorId(index as u8));
    }
    if palette.len() > u8::MAX as usize {
        return None;
    }
    palette.push(hex.to_string());
    Some(ColorId((palette.len() - 1) as u8))
}

// ============================================================================
// GAME - Session over a level set
// ============================================================================

/// Outcome of loading or advancing a level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadOutcome {
    /// The level was loaded and play continues.
    Loaded(u32),
    /// The set has no such level; the session is over.
    AllCleared { total_score: u32 },
}

/// A full play session: a level set, the active board, and the running
/// totals that survive level changes and resets.
#[derive(Clone, PartialEq, Debug)]
pub struct Game {
    levels: Vec<Level>,
    board: Board,
    total_score: u32,
    completed_levels: u32,
}

impl Game {
    /// Level id a session starts on.
    const FIRST_LEVEL: u32 = 1;

    /// Create a session over a level set and load the first level.
    ///
    /// An empty set falls back to the builtin levels. A set without the
    /// first level id starts on its first entry instead.
    pub fn new(mut levels: Vec<Level>) -> Game {
        if levels.is_empty() {
            levels = builtin_levels();
        }
        let first = levels
            .iter()
            .find(|level| level.id == Self::FIRST_LEVEL)
            .unwrap_or(&levels[0]);
        let board = Board::from_level(first);
        Game {
            levels,
            board,
            total_score: 0,
            completed_levels: 0,
        }
    }

    /// The active board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Session score across levels: triplet bonuses plus level clears.
    #[inline]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    /// Levels cleared this session.
    #[inline]
    pub fn completed_levels(&self) -> u32 {
        self.completed_levels
    }

    /// Number of levels in the set.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Id of the level in play.
    #[inline]
    pub fn current_level(&self) -> u32 {
        self.board.level()
    }

    /// Display name of the level in play, when the descriptor has one.
    pub fn level_name(&self) -> Option<&str> {
        self.levels
            .iter()
            .find(|level| level.id == self.board.level())
            .and_then(|level| level.name.as_deref())
    }

    /// Forward a move to the board, banking score into session totals.
    ///
    /// Each swept triplet and the final clear score both accumulate
    /// into the total.
    pub fn apply_move(&mut self, yarn: YarnId, dest: SlotId) -> MoveOutcome {
        let outcome = self.board.apply_move(yarn, dest);
        self.total_score = self
            .total_score
            .saturating_add(u32::from(outcome.triplets) * Board::TRIPLET_BONUS);
        if let Some(clear) = outcome.cleared {
            self.total_score = self.total_score.saturating_add(clear.score);
            self.completed_levels += 1;
        }
        outcome
    }

    /// Pick up a yarn.
    pub fn select(&mut self, yarn: YarnId) -> bool {
        self.board.select(yarn)
    }

    /// Put down the current selection.
    pub fn clear_selection(&mut self) {
        self.board.clear_selection();
    }

    /// Undo the most recent move on the board.
    pub fn undo(&mut self) -> bool {
        self.board.undo()
    }

    /// Suggest a move on the board.
    pub fn find_hint(&mut self) -> Option<Hint> {
        self.board.find_hint()
    }

    /// Restart the current level from its descriptor. Session totals
    /// are unaffected.
    pub fn reset(&mut self) {
        if let Some(level) = self
            .levels
            .iter()
            .find(|level| level.id == self.board.level())
        {
            self.board = Board::from_level(level);
        }
    }

    /// Advance to the next level id, or report the session complete
    /// when the set has no such level.
    pub fn next_level(&mut self) -> LoadOutcome {
        let Some(next) = self.board.level().checked_add(1) else {
            return LoadOutcome::AllCleared {
                total_score: self.total_score,
            };
        };
        match self.levels.iter().find(|level| level.id == next) {
            Some(level) => {
                self.board = Board::from_level(level);
                LoadOutcome::Loaded(next)
            }
            None => LoadOutcome::AllCleared {
                total_score: self.total_score,
            },
        }
    }
}
