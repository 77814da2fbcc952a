//! Simulation configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other.

/// Mana income every seat receives each turn before the claimed-tile bonus.
pub const MANA_BASE_INCOME: i64 = 50;

/// Hard cap on a seat's stored mana.
pub const MANA_CAP: i64 = 250_000;

/// Worker quota multiplier: a faction wants `4 * temples` workers in total.
pub const WORKERS_PER_TEMPLE: u32 = 4;

/// How much fullness one dig action removes from a tile.
pub const DIG_RATE: f64 = 20.0;

/// Gold paid out when a gold tile is fully excavated.
pub const GOLD_PER_TILE: i64 = 500;

/// Angular half-width numerator for occlusion culling: an opaque tile at
/// distance `d` shadows a wedge of `OCCLUSION_HALF_WIDTH / d` radians on
/// each side of its bearing.
pub const OCCLUSION_HALF_WIDTH: f64 = 1.5;

/// Default radius the spiral coordinate table is precomputed out to.
/// Visibility queries beyond this radius are truncated to it.
pub const SPIRAL_MAX_RADIUS: i32 = 100;

/// Configuration for the simulation systems
///
/// These values have been tuned against the default campaign maps.
/// Changing them will affect gameplay pacing and balance.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Radius the spiral offset table is precomputed out to (tiles)
    ///
    /// Bounds the largest visibility query any creature can make.
    /// Memory cost grows with the square of this value.
    pub spiral_radius: i32,

    /// Default sight radius for creatures without an explicit one (tiles)
    pub default_sight_radius: f64,

    /// Seed for the simulation RNG; identical seeds replay identically
    pub rng_seed: u64,

    /// Whether this map is the authoritative (server) side
    ///
    /// Only the authoritative side emits outbound entity notifications.
    pub authoritative: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spiral_radius: SPIRAL_MAX_RADIUS,
            default_sight_radius: 15.0,
            rng_seed: 0,
            authoritative: true,
        }
    }
}
