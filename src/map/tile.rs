//! Map tiles: terrain type, dig fullness, ownership, and back-references
//!
//! Passability is never stored; it is derived from type and fullness so the
//! two can never disagree.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{CreatureId, FactionColor, RoomId, TrapId};
use crate::map::coord::TileCoord;

/// Terrain type of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileType {
    #[default]
    Dirt,
    Gold,
    Rock,
    Water,
    Lava,
    Claimed,
    /// Hole in the map; never passable, never visible through
    Null,
}

/// Traversal capability class used to filter valid path steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Passability {
    Walkable,
    Flyable,
    Diggable,
    Impassable,
}

/// A single map tile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    tile_type: TileType,
    /// Dig-remaining measure in `[0, 100]`; 0 means fully excavated
    fullness: f64,
    pub owner: Option<FactionColor>,
    /// Transient region tag assigned by the flood fill; `None` = unassigned
    pub connectivity_color: Option<u32>,
    /// Creatures currently standing on this tile (non-owning handles)
    pub occupants: Vec<CreatureId>,
    /// Room covering this tile, if any (non-owning handle)
    pub covering_room: Option<RoomId>,
    /// Trap covering this tile, if any (non-owning handle)
    pub covering_trap: Option<TrapId>,
    /// Factions that have flagged this tile for digging
    pub marked_for_digging: AHashSet<FactionColor>,
}

impl Tile {
    pub fn new(coord: TileCoord, tile_type: TileType) -> Self {
        let fullness = match tile_type {
            TileType::Dirt | TileType::Gold | TileType::Rock | TileType::Claimed => 100.0,
            TileType::Water | TileType::Lava | TileType::Null => 0.0,
        };
        Self {
            coord,
            tile_type,
            fullness,
            owner: None,
            connectivity_color: None,
            occupants: Vec::new(),
            covering_room: None,
            covering_trap: None,
            marked_for_digging: AHashSet::new(),
        }
    }

    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }

    pub fn fullness(&self) -> f64 {
        self.fullness
    }

    /// Set the terrain type. Returns true if passability changed.
    pub(crate) fn set_tile_type(&mut self, tile_type: TileType) -> bool {
        let before = self.passability();
        self.tile_type = tile_type;
        self.passability() != before
    }

    /// Set the fullness, clamped to `[0, 100]`. Returns true if passability
    /// changed.
    pub(crate) fn set_fullness(&mut self, fullness: f64) -> bool {
        let before = self.passability();
        self.fullness = fullness.clamp(0.0, 100.0);
        self.passability() != before
    }

    /// Passability as a pure function of (type, fullness)
    pub fn passability(&self) -> Passability {
        if self.fullness > 0.0 {
            return match self.tile_type {
                TileType::Dirt | TileType::Gold | TileType::Claimed => Passability::Diggable,
                TileType::Rock | TileType::Null => Passability::Impassable,
                // Water and lava are constructed with zero fullness; a level
                // that sets it anyway still cannot be dug through them.
                TileType::Water | TileType::Lava => Passability::Impassable,
            };
        }

        match self.tile_type {
            TileType::Dirt | TileType::Gold | TileType::Rock | TileType::Claimed
            | TileType::Water => Passability::Walkable,
            TileType::Lava => Passability::Flyable,
            TileType::Null => Passability::Impassable,
        }
    }

    /// Does sight pass through (and into) this tile?
    pub fn permits_vision(&self) -> bool {
        self.fullness == 0.0 && self.tile_type != TileType::Null
    }

    /// Can the given faction dig this tile?
    pub fn is_diggable(&self, color: FactionColor) -> bool {
        if self.fullness == 0.0 {
            return false;
        }
        match self.tile_type {
            TileType::Dirt | TileType::Gold => true,
            TileType::Claimed => self.owner == Some(color),
            _ => false,
        }
    }

    /// Can the given faction place a room or trap here?
    pub fn is_buildable_upon(&self, color: FactionColor) -> bool {
        self.tile_type == TileType::Claimed
            && self.fullness == 0.0
            && self.owner == Some(color)
            && self.covering_room.is_none()
            && self.covering_trap.is_none()
    }
}
