//! Rooms: faction-owned structures covering a set of tiles
//!
//! Treasuries store gold; dungeon temples produce workers. A room that
//! loses its last covered tile is removed during upkeep.

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionColor, RoomId};
use crate::entities::capability::{UpkeepEnv, UpkeepOutcome, Upkeepable};
use crate::map::coord::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    DungeonTemple,
    Treasury,
    Quarters,
    Dojo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub room_type: RoomType,
    pub color: FactionColor,
    covered_tiles: Vec<TileCoord>,
    /// Gold stored here; meaningful for treasuries only
    gold: i64,
}

impl Room {
    pub fn new(
        id: RoomId,
        room_type: RoomType,
        color: FactionColor,
        covered_tiles: Vec<TileCoord>,
    ) -> Self {
        Self {
            id,
            name: format!("{:?}_{}", room_type, id.0),
            room_type,
            color,
            covered_tiles,
            gold: 0,
        }
    }

    pub fn covered_tiles(&self) -> &[TileCoord] {
        &self.covered_tiles
    }

    pub fn num_covered_tiles(&self) -> usize {
        self.covered_tiles.len()
    }

    pub fn first_covered_tile(&self) -> Option<TileCoord> {
        self.covered_tiles.first().copied()
    }

    /// Detach one covered tile (e.g. the tile was claimed by an enemy).
    pub fn release_tile(&mut self, coord: TileCoord) {
        self.covered_tiles.retain(|c| *c != coord);
    }

    pub fn total_gold(&self) -> i64 {
        self.gold
    }

    /// Store gold; returns the amount actually accepted.
    pub fn deposit_gold(&mut self, amount: i64) -> i64 {
        if self.room_type != RoomType::Treasury || amount <= 0 {
            return 0;
        }
        self.gold += amount;
        amount
    }

    /// Withdraw up to `amount` gold; returns the amount actually taken.
    pub fn withdraw_gold(&mut self, amount: i64) -> i64 {
        let taken = amount.clamp(0, self.gold);
        self.gold -= taken;
        taken
    }
}

impl Upkeepable for Room {
    fn upkeep(&mut self, _env: &mut UpkeepEnv<'_>) -> UpkeepOutcome {
        // Rooms persist; emptied rooms are culled by the turn engine's
        // zero-covered-tiles check, not by reporting Finished here.
        UpkeepOutcome::Continue
    }
}
