//! Simulation context: counters, id wells, and configuration
//!
//! Replaces ambient global state with one object owned by the game world.
//! Created when a map is created, reset when the map is cleared.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{CreatureId, LightId, MissileId, RoomId, TrapId};

/// Shared counters and configuration for one simulation run
#[derive(Debug)]
pub struct SimContext {
    pub config: SimulationConfig,
    /// Diagnostics: total calls to the A* path routine
    path_calls: AtomicU64,
    next_creature: AtomicU32,
    next_room: AtomicU32,
    next_trap: AtomicU32,
    next_missile: AtomicU32,
    next_light: AtomicU32,
    next_flood_color: AtomicU32,
    pub rng: ChaCha8Rng,
}

impl SimContext {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            config,
            path_calls: AtomicU64::new(0),
            next_creature: AtomicU32::new(0),
            next_room: AtomicU32::new(0),
            next_trap: AtomicU32::new(0),
            next_missile: AtomicU32::new(0),
            next_light: AtomicU32::new(0),
            next_flood_color: AtomicU32::new(0),
            rng,
        }
    }

    /// Reset every counter and re-seed the RNG. Map-clear boundary.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        *self = Self::new(config);
    }

    pub fn record_path_call(&self) {
        self.path_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn path_calls(&self) -> u64 {
        self.path_calls.load(Ordering::Relaxed)
    }

    pub fn mint_creature_id(&self) -> CreatureId {
        CreatureId(self.next_creature.fetch_add(1, Ordering::Relaxed))
    }

    pub fn mint_room_id(&self) -> RoomId {
        RoomId(self.next_room.fetch_add(1, Ordering::Relaxed))
    }

    pub fn mint_trap_id(&self) -> TrapId {
        TrapId(self.next_trap.fetch_add(1, Ordering::Relaxed))
    }

    pub fn mint_missile_id(&self) -> MissileId {
        MissileId(self.next_missile.fetch_add(1, Ordering::Relaxed))
    }

    pub fn mint_light_id(&self) -> LightId {
        LightId(self.next_light.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate a fresh connectivity color for the flood fill.
    pub fn mint_flood_color(&self) -> u32 {
        self.next_flood_color.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
