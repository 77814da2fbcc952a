//! Capability traits for map entities
//!
//! Entities are a small closed set of variants; cross-cutting behavior is
//! expressed through these traits rather than an inheritance tree.

use ahash::AHashMap;

use crate::core::types::{CreatureId, FactionColor, Turn};
use crate::entities::missile::Missile;
use crate::map::grid::TileGrid;

/// Result of one upkeep round for an active object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpkeepOutcome {
    /// Keep the object in the active set
    Continue,
    /// The object is done; remove it from the active set this pass
    Finished,
}

/// Environment handed to active objects during the upkeep sweep
pub struct UpkeepEnv<'a> {
    pub grid: &'a mut TileGrid,
    /// Faction of every living creature, for target selection
    pub creature_colors: &'a AHashMap<CreatureId, FactionColor>,
    /// Missiles spawned during the sweep; activated after it completes
    pub spawned_missiles: &'a mut Vec<Missile>,
    pub turn: Turn,
}

/// Anything requiring a once-per-turn upkeep operation
pub trait Upkeepable {
    fn upkeep(&mut self, env: &mut UpkeepEnv<'_>) -> UpkeepOutcome;
}

/// Anything that can be targeted and damaged in combat
pub trait Attackable {
    fn hit_points(&self) -> f64;
    fn take_damage(&mut self, damage: f64);
    fn faction(&self) -> FactionColor;
    fn is_destroyed(&self) -> bool {
        self.hit_points() <= 0.0
    }
}

/// Anything advanced per rendered frame rather than per turn
pub trait Animated {
    fn advance(&mut self, dt: f64);
}
