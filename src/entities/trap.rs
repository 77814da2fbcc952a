//! Traps: armed structures that fire at enemy creatures during upkeep

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionColor, TrapId};
use crate::entities::capability::{Attackable, UpkeepEnv, UpkeepOutcome, Upkeepable};
use crate::entities::missile::Missile;
use crate::map::coord::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapType {
    Cannon,
    Boulder,
}

impl TrapType {
    /// Turns between shots
    pub fn reload_turns(&self) -> u32 {
        match self {
            TrapType::Cannon => 2,
            TrapType::Boulder => 4,
        }
    }

    /// How far the trap can reach, in tiles
    pub fn range(&self) -> u32 {
        match self {
            TrapType::Cannon => 6,
            TrapType::Boulder => 1,
        }
    }

    pub fn shots(&self) -> u32 {
        match self {
            TrapType::Cannon => u32::MAX,
            TrapType::Boulder => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trap {
    pub id: TrapId,
    pub name: String,
    pub trap_type: TrapType,
    pub color: FactionColor,
    covered_tiles: Vec<TileCoord>,
    reload_counter: u32,
    shots_remaining: u32,
    integrity: f64,
}

impl Trap {
    pub fn new(
        id: TrapId,
        trap_type: TrapType,
        color: FactionColor,
        covered_tiles: Vec<TileCoord>,
    ) -> Self {
        Self {
            id,
            name: format!("{:?}_{}", trap_type, id.0),
            trap_type,
            color,
            covered_tiles,
            reload_counter: 0,
            shots_remaining: trap_type.shots(),
            integrity: 10.0,
        }
    }

    pub fn covered_tiles(&self) -> &[TileCoord] {
        &self.covered_tiles
    }

    pub fn num_covered_tiles(&self) -> usize {
        self.covered_tiles.len()
    }

    pub fn release_tile(&mut self, coord: TileCoord) {
        self.covered_tiles.retain(|c| *c != coord);
    }

    /// Nearest enemy standing within range of any covered tile.
    fn find_target(&self, env: &UpkeepEnv<'_>) -> Option<TileCoord> {
        let range = self.trap_type.range();
        let mut best: Option<(u32, TileCoord)> = None;

        for &tile_coord in &self.covered_tiles {
            let area = env.grid.rectangular_region(
                TileCoord::new(tile_coord.x - range as i32, tile_coord.y - range as i32),
                TileCoord::new(tile_coord.x + range as i32, tile_coord.y + range as i32),
            );
            for coord in area {
                let Some(tile) = env.grid.tile(coord) else { continue };
                let hostile = tile.occupants.iter().any(|id| {
                    env.creature_colors
                        .get(id)
                        .map(|c| *c != self.color)
                        .unwrap_or(false)
                });
                if hostile {
                    let dist = tile_coord.manhattan(&coord);
                    if dist <= range && best.map(|(d, _)| dist < d).unwrap_or(true) {
                        best = Some((dist, coord));
                    }
                }
            }
        }

        best.map(|(_, coord)| coord)
    }
}

impl Upkeepable for Trap {
    fn upkeep(&mut self, env: &mut UpkeepEnv<'_>) -> UpkeepOutcome {
        if self.is_destroyed() || self.shots_remaining == 0 {
            return UpkeepOutcome::Finished;
        }

        if self.reload_counter > 0 {
            self.reload_counter -= 1;
            return UpkeepOutcome::Continue;
        }

        if let Some(target) = self.find_target(env) {
            if let Some(origin) = self.covered_tiles.first().copied() {
                env.spawned_missiles
                    .push(Missile::launched_at(origin, target, self.color));
                self.reload_counter = self.trap_type.reload_turns();
                self.shots_remaining = self.shots_remaining.saturating_sub(1);
            }
        }

        if self.shots_remaining == 0 {
            UpkeepOutcome::Finished
        } else {
            UpkeepOutcome::Continue
        }
    }
}

impl Attackable for Trap {
    fn hit_points(&self) -> f64 {
        self.integrity
    }

    fn take_damage(&mut self, damage: f64) {
        self.integrity -= damage;
    }

    fn faction(&self) -> FactionColor {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use crate::core::types::CreatureId;
    use crate::map::grid::TileGrid;

    #[test]
    fn test_cannon_fires_at_enemy_in_range() {
        let mut grid = TileGrid::new(10, 10).unwrap();
        let mut colors = AHashMap::new();
        colors.insert(CreatureId(0), FactionColor(2));
        grid.add_occupant(TileCoord::new(4, 0), CreatureId(0));

        let mut trap = Trap::new(TrapId(0), TrapType::Cannon, FactionColor(1), vec![TileCoord::new(0, 0)]);
        let mut spawned = Vec::new();
        let mut env = UpkeepEnv {
            grid: &mut grid,
            creature_colors: &colors,
            spawned_missiles: &mut spawned,
            turn: 1,
        };

        assert_eq!(trap.upkeep(&mut env), UpkeepOutcome::Continue);
        assert_eq!(env.spawned_missiles.len(), 1);

        // Reloading: no second shot next turn
        assert_eq!(trap.upkeep(&mut env), UpkeepOutcome::Continue);
        assert_eq!(env.spawned_missiles.len(), 1);
    }

    #[test]
    fn test_cannon_ignores_own_faction() {
        let mut grid = TileGrid::new(10, 10).unwrap();
        let mut colors = AHashMap::new();
        colors.insert(CreatureId(0), FactionColor(1));
        grid.add_occupant(TileCoord::new(2, 0), CreatureId(0));

        let mut trap = Trap::new(TrapId(0), TrapType::Cannon, FactionColor(1), vec![TileCoord::new(0, 0)]);
        let mut spawned = Vec::new();
        let mut env = UpkeepEnv {
            grid: &mut grid,
            creature_colors: &colors,
            spawned_missiles: &mut spawned,
            turn: 1,
        };

        trap.upkeep(&mut env);
        assert!(spawned.is_empty());
    }

    #[test]
    fn test_boulder_finishes_after_single_shot() {
        let mut grid = TileGrid::new(5, 5).unwrap();
        let mut colors = AHashMap::new();
        colors.insert(CreatureId(0), FactionColor(2));
        grid.add_occupant(TileCoord::new(1, 0), CreatureId(0));

        let mut trap = Trap::new(TrapId(0), TrapType::Boulder, FactionColor(1), vec![TileCoord::new(0, 0)]);
        let mut spawned = Vec::new();
        let mut env = UpkeepEnv {
            grid: &mut grid,
            creature_colors: &colors,
            spawned_missiles: &mut spawned,
            turn: 1,
        };

        assert_eq!(trap.upkeep(&mut env), UpkeepOutcome::Finished);
        assert_eq!(spawned.len(), 1);
    }
}
