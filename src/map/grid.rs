//! The tile grid: dense row-major storage for every tile on the map
//!
//! The grid is the substrate all other map queries run against. It is
//! mutated only by the simulation thread; cross-thread readers go through
//! the per-creature guarded state instead.

use serde::{Deserialize, Serialize};

use crate::core::error::{GameError, Result};
use crate::core::types::{CreatureId, FactionColor};
use crate::map::coord::TileCoord;
use crate::map::tile::{Tile, TileType};

/// Dense width x height tile storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    /// Bumped whenever any tile's passability changes; connectivity results
    /// are valid only while this stands still.
    terrain_revision: u64,
}

impl TileGrid {
    /// Create a new all-dirt map. Fails on degenerate or overflowing
    /// dimensions rather than allocating a broken grid.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let count = (width as usize)
            .checked_mul(height as usize)
            .filter(|&n| n > 0 && n <= u32::MAX as usize)
            .ok_or(GameError::MapAllocation { width, height })?;

        let mut tiles = Vec::with_capacity(count);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                tiles.push(Tile::new(TileCoord::new(x, y), TileType::Dirt));
            }
        }

        Ok(Self {
            width,
            height,
            tiles,
            terrain_revision: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn terrain_revision(&self) -> u64 {
        self.terrain_revision
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.x < self.width as i32
            && coord.y < self.height as i32
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    /// Row-major iteration over every tile
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Existing orthogonal neighbors of a coordinate
    pub fn neighbors4(&self, coord: TileCoord) -> Vec<TileCoord> {
        coord
            .neighbors4()
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect()
    }

    /// All existing tiles in the axis-aligned rectangle spanned by two
    /// corners (inclusive, any corner order).
    pub fn rectangular_region(&self, a: TileCoord, b: TileCoord) -> Vec<TileCoord> {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        let mut region = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let c = TileCoord::new(x, y);
                if self.contains(c) {
                    region.push(c);
                }
            }
        }
        region
    }

    /// Change a tile's terrain type, tracking passability invalidation.
    pub fn set_tile_type(&mut self, coord: TileCoord, tile_type: TileType) {
        let Some(i) = self.index(coord) else { return };
        if self.tiles[i].set_tile_type(tile_type) {
            self.terrain_revision += 1;
        }
    }

    /// Change a tile's fullness, tracking passability invalidation.
    pub fn set_fullness(&mut self, coord: TileCoord, fullness: f64) {
        let Some(i) = self.index(coord) else { return };
        if self.tiles[i].set_fullness(fullness) {
            self.terrain_revision += 1;
        }
    }

    /// Remove `amount` fullness from a tile. Returns the gold payout if the
    /// dig finished excavating a gold tile, and clears dig marks once open.
    pub fn dig(&mut self, coord: TileCoord, amount: f64) -> i64 {
        let Some(i) = self.index(coord) else { return 0 };
        let tile = &mut self.tiles[i];
        if tile.fullness() == 0.0 {
            return 0;
        }

        let remaining = tile.fullness() - amount;
        let was_gold = tile.tile_type() == TileType::Gold;
        if tile.set_fullness(remaining) {
            self.terrain_revision += 1;
        }

        let tile = &mut self.tiles[i];
        if tile.fullness() == 0.0 {
            tile.marked_for_digging.clear();
            if was_gold {
                return crate::core::config::GOLD_PER_TILE;
            }
        }
        0
    }

    /// Claim an excavated tile for a faction.
    pub fn claim(&mut self, coord: TileCoord, color: FactionColor) {
        let Some(i) = self.index(coord) else { return };
        let tile = &mut self.tiles[i];
        if tile.fullness() > 0.0 {
            return;
        }
        if tile.set_tile_type(TileType::Claimed) {
            self.terrain_revision += 1;
        }
        self.tiles[i].owner = Some(color);
    }

    pub fn add_occupant(&mut self, coord: TileCoord, creature: CreatureId) {
        if let Some(tile) = self.tile_mut(coord) {
            if !tile.occupants.contains(&creature) {
                tile.occupants.push(creature);
            }
        }
    }

    pub fn remove_occupant(&mut self, coord: TileCoord, creature: CreatureId) {
        if let Some(tile) = self.tile_mut(coord) {
            tile.occupants.retain(|c| *c != creature);
        }
    }

    /// Tiles in an area the given faction could dig
    pub fn diggable_tiles_in_area(
        &self,
        a: TileCoord,
        b: TileCoord,
        color: FactionColor,
    ) -> Vec<TileCoord> {
        self.rectangular_region(a, b)
            .into_iter()
            .filter(|c| self.tile(*c).map(|t| t.is_diggable(color)).unwrap_or(false))
            .collect()
    }

    /// Tiles in an area the given faction could build upon
    pub fn buildable_tiles_in_area(
        &self,
        a: TileCoord,
        b: TileCoord,
        color: FactionColor,
    ) -> Vec<TileCoord> {
        self.rectangular_region(a, b)
            .into_iter()
            .filter(|c| {
                self.tile(*c)
                    .map(|t| t.is_buildable_upon(color))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Every tile the given faction has marked for digging
    pub fn tiles_marked_for_digging(&self, color: FactionColor) -> Vec<TileCoord> {
        self.iter()
            .filter(|t| t.marked_for_digging.contains(&color))
            .map(|t| t.coord)
            .collect()
    }

    /// Set or clear the dig mark on a batch of tiles for one faction.
    pub fn mark_tiles_for_digging(&mut self, tiles: &[TileCoord], mark: bool, color: FactionColor) {
        for &coord in tiles {
            if let Some(tile) = self.tile_mut(coord) {
                if mark && tile.is_diggable(color) {
                    tile.marked_for_digging.insert(color);
                } else {
                    tile.marked_for_digging.remove(&color);
                }
            }
        }
    }
}
