//! Missiles: short-lived projectiles launched by traps and creatures

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionColor, MissileId};
use crate::entities::capability::{Animated, UpkeepEnv, UpkeepOutcome, Upkeepable};
use crate::map::coord::TileCoord;

/// Continuous map position (tile units)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct MapPosition {
    pub x: f64,
    pub y: f64,
}

impl MapPosition {
    pub fn from_tile(coord: TileCoord) -> Self {
        Self {
            x: coord.x as f64,
            y: coord.y as f64,
        }
    }

    pub fn nearest_tile(&self) -> TileCoord {
        TileCoord::new(self.x.round() as i32, self.y.round() as i32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Missile {
    /// Assigned by the registry when the missile is added to the map
    pub id: MissileId,
    pub name: String,
    pub color: FactionColor,
    pub position: MapPosition,
    /// Smoothed position the renderer draws; trails `position`
    pub render_position: MapPosition,
    velocity: (f64, f64),
    /// Turns of flight remaining
    turns_remaining: u32,
    pub damage: f64,
}

impl Missile {
    /// Build a missile flying from one tile toward another at one tile of
    /// travel per turn. The registry fills in the real id on add.
    pub fn launched_at(origin: TileCoord, target: TileCoord, color: FactionColor) -> Self {
        let dx = (target.x - origin.x) as f64;
        let dy = (target.y - origin.y) as f64;
        let distance = (dx * dx + dy * dy).sqrt().max(1.0);

        Self {
            id: MissileId(u32::MAX),
            name: String::new(),
            color,
            position: MapPosition::from_tile(origin),
            render_position: MapPosition::from_tile(origin),
            velocity: (dx / distance, dy / distance),
            turns_remaining: distance.ceil() as u32,
            damage: 5.0,
        }
    }
}

impl Upkeepable for Missile {
    fn upkeep(&mut self, env: &mut UpkeepEnv<'_>) -> UpkeepOutcome {
        if self.turns_remaining == 0 {
            return UpkeepOutcome::Finished;
        }
        self.turns_remaining -= 1;

        self.position.x += self.velocity.0;
        self.position.y += self.velocity.1;

        // Leaving the map ends the flight immediately
        if !env.grid.contains(self.position.nearest_tile()) {
            return UpkeepOutcome::Finished;
        }

        if self.turns_remaining == 0 {
            UpkeepOutcome::Finished
        } else {
            UpkeepOutcome::Continue
        }
    }
}

impl Animated for Missile {
    fn advance(&mut self, dt: f64) {
        // Ease the rendered position toward the authoritative one; the
        // turn-scale motion itself happens in upkeep.
        let ease = (dt * 4.0).min(1.0);
        self.render_position.x += (self.position.x - self.render_position.x) * ease;
        self.render_position.y += (self.position.y - self.render_position.y) * ease;
    }
}
