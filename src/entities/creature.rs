//! Creature state: position, guarded vitals, and the AI action queue
//!
//! The turn engine owns creatures and mutates them on the simulation
//! thread, but hp, mana, the on-map flag, and the stats snapshot are read
//! by a presentation thread at arbitrary times. Each of those fields has
//! its own guard; there is deliberately no creature-wide lock and no
//! ordering guarantee across fields.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::core::types::{CreatureId, FactionColor};
use crate::map::coord::TileCoord;
use crate::map::tile::Passability;

/// One scalar stat guarded for single-field atomicity
#[derive(Debug, Default)]
pub struct StatCell(Mutex<f64>);

impl StatCell {
    pub fn new(value: f64) -> Self {
        Self(Mutex::new(value))
    }

    pub fn get(&self) -> f64 {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, value: f64) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Add `delta` and return the new value.
    pub fn adjust(&self, delta: f64) -> f64 {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += delta;
        *guard
    }
}

/// Immutable description of a creature class, shared by every instance of
/// that class. Kept separate from instance state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureKind {
    pub class_name: String,
    pub is_worker: bool,
    pub tile_passability: Passability,
    pub max_hp: f64,
    pub max_mana: f64,
    pub sight_radius: f64,
    pub attack_damage: f64,
}

impl CreatureKind {
    /// The worker class produced by dungeon temples.
    pub fn kobold() -> Self {
        Self {
            class_name: "Kobold".to_string(),
            is_worker: true,
            tile_passability: Passability::Walkable,
            max_hp: 10.0,
            max_mana: 0.0,
            sight_radius: 10.0,
            attack_damage: 1.0,
        }
    }

    pub fn fighter(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            is_worker: false,
            tile_passability: Passability::Walkable,
            max_hp: 30.0,
            max_mana: 20.0,
            sight_radius: 15.0,
            attack_damage: 4.0,
        }
    }
}

/// One step of a creature's current plan
#[derive(Debug, Clone, PartialEq)]
pub enum CreatureAction {
    Idle,
    /// Walk the remaining tiles of a path, front first
    WalkTo(VecDeque<TileCoord>),
    Dig(TileCoord),
    Claim(TileCoord),
    Attack(CreatureId),
    Train,
}

/// Presentation-thread projection of a creature's stats
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatureStats {
    pub hp: f64,
    pub mana: f64,
    pub level: u32,
    pub experience: f64,
}

/// A single creature on the map
#[derive(Debug)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub kind: CreatureKind,
    pub color: FactionColor,
    pub level: u32,
    pub experience: f64,
    pub position: TileCoord,
    pub home_tile: Option<TileCoord>,
    /// Visible tiles recomputed at the start of each AI step
    pub visible_tiles: Vec<TileCoord>,
    /// Living enemies standing on those tiles, refreshed alongside them
    pub visible_enemies: Vec<CreatureId>,

    hp: StatCell,
    mana: StatCell,
    on_map: AtomicBool,
    action_queue: Mutex<VecDeque<CreatureAction>>,
    stats: Mutex<CreatureStats>,
}

impl Creature {
    pub fn new(
        id: CreatureId,
        name: String,
        kind: CreatureKind,
        color: FactionColor,
        position: TileCoord,
    ) -> Self {
        let hp = kind.max_hp;
        let mana = kind.max_mana;
        Self {
            id,
            name,
            kind,
            color,
            level: 1,
            experience: 0.0,
            position,
            home_tile: None,
            visible_tiles: Vec::new(),
            visible_enemies: Vec::new(),
            hp: StatCell::new(hp),
            mana: StatCell::new(mana),
            on_map: AtomicBool::new(false),
            action_queue: Mutex::new(VecDeque::new()),
            stats: Mutex::new(CreatureStats::default()),
        }
    }

    pub fn hp(&self) -> f64 {
        self.hp.get()
    }

    pub fn set_hp(&self, hp: f64) {
        self.hp.set(hp);
    }

    pub fn mana(&self) -> f64 {
        self.mana.get()
    }

    pub fn set_mana(&self, mana: f64) {
        self.mana.set(mana);
    }

    pub fn is_on_map(&self) -> bool {
        self.on_map.load(Ordering::Acquire)
    }

    pub fn set_on_map(&self, on_map: bool) {
        self.on_map.store(on_map, Ordering::Release);
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<CreatureAction>> {
        self.action_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_action(&self, action: CreatureAction) {
        self.queue().push_back(action);
    }

    pub fn push_front_action(&self, action: CreatureAction) {
        self.queue().push_front(action);
    }

    pub fn pop_action(&self) -> Option<CreatureAction> {
        self.queue().pop_front()
    }

    pub fn peek_action(&self) -> Option<CreatureAction> {
        self.queue().front().cloned()
    }

    pub fn action_queue_len(&self) -> usize {
        self.queue().len()
    }

    pub fn clear_action_queue(&self) {
        self.queue().clear();
    }

    /// Replace the front action with a rewritten one.
    pub fn replace_front_action(&self, action: CreatureAction) {
        let mut queue = self.queue();
        queue.pop_front();
        queue.push_front(action);
    }

    pub fn receive_exp(&mut self, experience: f64) {
        self.experience += experience;
        // Each level costs ten times the level number in experience
        while self.experience >= 10.0 * self.level as f64 {
            self.experience -= 10.0 * self.level as f64;
            self.level += 1;
        }
    }

    /// Refresh the presentation snapshot from current state.
    pub fn update_stats(&self) {
        let snapshot = CreatureStats {
            hp: self.hp(),
            mana: self.mana(),
            level: self.level,
            experience: self.experience,
        };
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn stats(&self) -> CreatureStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl crate::entities::capability::Attackable for Creature {
    fn hit_points(&self) -> f64 {
        self.hp()
    }

    fn take_damage(&mut self, damage: f64) {
        self.hp.adjust(-damage);
    }

    fn faction(&self) -> FactionColor {
        self.color
    }
}
