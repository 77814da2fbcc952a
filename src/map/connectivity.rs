//! Connectivity partitioning: flood-fill region colors for walkable tiles
//!
//! Two tiles carry the same color exactly when a walking creature can reach
//! one from the other. Pathfinding uses this as an O(1) pre-filter. Colors
//! go stale the moment any tile's passability changes; running a path query
//! against stale colors silently produces wrong rejections, so the engine
//! tracks the grid revision it last filled at.

use tracing::debug;

use crate::core::context::SimContext;
use crate::map::coord::TileCoord;
use crate::map::grid::TileGrid;
use crate::map::tile::Passability;

/// Flood-fill driver and staleness tracker
#[derive(Debug, Default)]
pub struct ConnectivityEngine {
    enabled: bool,
    filled_at_revision: Option<u64>,
}

impl ConnectivityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Colors computed for an earlier terrain revision are unusable.
    pub fn is_stale(&self, grid: &TileGrid) -> bool {
        self.enabled && self.filled_at_revision != Some(grid.terrain_revision())
    }

    /// Reset every tile's color, then sweep the grid row-major and give each
    /// still-unassigned walkable tile's region a freshly allocated color.
    pub fn enable_flood_fill(&mut self, grid: &mut TileGrid, ctx: &SimContext) {
        for tile in grid.iter_mut() {
            tile.connectivity_color = None;
        }

        self.enabled = true;
        let mut regions = 0u32;

        for y in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                let coord = TileCoord::new(x, y);
                let unassigned_walkable = grid
                    .tile(coord)
                    .map(|t| {
                        t.connectivity_color.is_none()
                            && t.passability() == Passability::Walkable
                    })
                    .unwrap_or(false);
                if unassigned_walkable {
                    let color = ctx.mint_flood_color();
                    flood_fill(grid, coord, color);
                    regions += 1;
                }
            }
        }

        self.filled_at_revision = Some(grid.terrain_revision());
        debug!(regions, revision = grid.terrain_revision(), "flood fill complete");
    }

    /// Do two coordinates sit in the same walkable region?
    ///
    /// Non-walkable tiles are never assigned a color and so never match.
    pub fn walkable_path_exists(&self, grid: &TileGrid, a: TileCoord, b: TileCoord) -> bool {
        let Some(ta) = grid.tile(a) else { return false };
        let Some(tb) = grid.tile(b) else { return false };
        match (ta.connectivity_color, tb.connectivity_color) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }
}

/// Iterative flood fill with an explicit work stack; large maps must not be
/// bounded by call-stack depth.
fn flood_fill(grid: &mut TileGrid, start: TileCoord, color: u32) {
    let mut stack = vec![start];

    while let Some(coord) = stack.pop() {
        let Some(tile) = grid.tile_mut(coord) else { continue };
        if tile.connectivity_color == Some(color)
            || tile.passability() != Passability::Walkable
        {
            continue;
        }
        tile.connectivity_color = Some(color);

        for neighbor in coord.neighbors4() {
            if let Some(t) = grid.tile(neighbor) {
                if t.connectivity_color != Some(color)
                    && t.passability() == Passability::Walkable
                {
                    stack.push(neighbor);
                }
            }
        }
    }
}
