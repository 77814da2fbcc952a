//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Faction identifier ("seat color"). Tiles, creatures, rooms, and traps all
/// carry one to mark ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionColor(pub u32);

impl std::fmt::Display for FactionColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "color {}", self.0)
    }
}

/// Game turn counter (simulation time unit)
pub type Turn = u64;

/// Handle to a creature in the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureId(pub u32);

/// Handle to a room in the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u32);

/// Handle to a trap in the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrapId(pub u32);

/// Handle to a missile in the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissileId(pub u32);

/// Handle to a map light in the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightId(pub u32);
