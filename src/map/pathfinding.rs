//! A* pathfinding over the tile grid
//!
//! Unit step costs, Manhattan heuristic, 4-connected neighbors. Admissible
//! steps are filtered by a traversal class, and walkable queries are
//! pre-filtered by the connectivity partition before the search runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::context::SimContext;
use crate::core::types::FactionColor;
use crate::map::connectivity::ConnectivityEngine;
use crate::map::coord::TileCoord;
use crate::map::grid::TileGrid;
use crate::map::tile::{Passability, Tile};

/// Node in the A* open set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathNode {
    coord: TileCoord,
    f_cost: u32, // g_cost + heuristic
    g_cost: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties broken by lower g, then lower
        // (y, x) so equal-cost searches replay identically.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then(other.g_cost.cmp(&self.g_cost))
            .then(other.coord.y.cmp(&self.coord.y))
            .then(other.coord.x.cmp(&self.coord.x))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Is `tile` an admissible step for the given traversal class?
pub(crate) fn step_allowed(tile: &Tile, class: Passability, color: FactionColor) -> bool {
    match class {
        Passability::Walkable => tile.passability() == Passability::Walkable,
        Passability::Flyable => matches!(
            tile.passability(),
            Passability::Walkable | Passability::Flyable
        ),
        Passability::Diggable => {
            tile.passability() == Passability::Walkable || tile.is_diggable(color)
        }
        Passability::Impassable => false,
    }
}

/// Find a path between two coordinates.
///
/// Returns an ordered tile sequence including both endpoints, or an empty
/// vector when either endpoint is missing or no path exists. Every call
/// increments the context's path-call counter.
pub fn path(
    grid: &TileGrid,
    connectivity: &ConnectivityEngine,
    ctx: &SimContext,
    from: TileCoord,
    to: TileCoord,
    class: Passability,
    color: FactionColor,
) -> Vec<TileCoord> {
    ctx.record_path_call();

    if grid.tile(from).is_none() || grid.tile(to).is_none() {
        return Vec::new();
    }

    // O(1) rejection: walking between different connectivity regions can
    // never succeed, so skip the search entirely.
    if connectivity.is_enabled()
        && class == Passability::Walkable
        && !connectivity.walkable_path_exists(grid, from, to)
    {
        return Vec::new();
    }

    if from == to {
        return vec![from];
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<TileCoord, TileCoord> = AHashMap::new();
    let mut g_scores: AHashMap<TileCoord, u32> = AHashMap::new();

    g_scores.insert(from, 0);
    open_set.push(PathNode {
        coord: from,
        f_cost: from.manhattan(&to),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == to {
            return reconstruct_path(&came_from, current.coord);
        }

        // Superseded entry from before a cheaper route was found
        if current.g_cost > *g_scores.get(&current.coord).unwrap_or(&u32::MAX) {
            continue;
        }

        for neighbor in current.coord.neighbors4() {
            let Some(tile) = grid.tile(neighbor) else {
                continue;
            };
            if !step_allowed(tile, class, color) {
                continue;
            }

            let tentative_g = current.g_cost + 1;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + neighbor.manhattan(&to),
                    g_cost: tentative_g,
                });
            }
        }
    }

    Vec::new() // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<TileCoord, TileCoord>,
    mut current: TileCoord,
) -> Vec<TileCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Cheap existence check.
///
/// Walkable queries degenerate to the connectivity-color comparison when
/// the partition is available; everything else falls back to running the
/// search and asking for at least two tiles.
pub fn path_exists(
    grid: &TileGrid,
    connectivity: &ConnectivityEngine,
    ctx: &SimContext,
    from: TileCoord,
    to: TileCoord,
    class: Passability,
    color: FactionColor,
) -> bool {
    if class == Passability::Walkable && connectivity.is_enabled() {
        return connectivity.walkable_path_exists(grid, from, to);
    }
    path(grid, connectivity, ctx, from, to, class, color).len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::TileType;

    fn open_grid(w: u32, h: u32) -> TileGrid {
        let mut grid = TileGrid::new(w, h).unwrap();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                grid.set_fullness(TileCoord::new(x, y), 0.0);
            }
        }
        grid
    }

    fn fixtures() -> (ConnectivityEngine, SimContext) {
        (ConnectivityEngine::new(), SimContext::default())
    }

    #[test]
    fn test_path_across_open_grid_is_manhattan_optimal() {
        let grid = open_grid(5, 5);
        let (conn, ctx) = fixtures();

        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 0),
            TileCoord::new(4, 4),
            Passability::Walkable,
            FactionColor(0),
        );

        // 8 unit steps between the corners, so 9 tiles including both ends
        assert_eq!(p.len(), 9);
        assert_eq!(p.first(), Some(&TileCoord::new(0, 0)));
        assert_eq!(p.last(), Some(&TileCoord::new(4, 4)));
    }

    #[test]
    fn test_path_steps_are_4_connected() {
        let grid = open_grid(6, 6);
        let (conn, ctx) = fixtures();
        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 3),
            TileCoord::new(5, 1),
            Passability::Walkable,
            FactionColor(0),
        );
        for pair in p.windows(2) {
            assert_eq!(pair[0].manhattan(&pair[1]), 1);
        }
    }

    #[test]
    fn test_path_identity() {
        let grid = open_grid(3, 3);
        let (conn, ctx) = fixtures();
        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(1, 1),
            TileCoord::new(1, 1),
            Passability::Walkable,
            FactionColor(0),
        );
        assert_eq!(p, vec![TileCoord::new(1, 1)]);
    }

    #[test]
    fn test_path_missing_endpoint_is_empty() {
        let grid = open_grid(3, 3);
        let (conn, ctx) = fixtures();
        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 0),
            TileCoord::new(9, 9),
            Passability::Walkable,
            FactionColor(0),
        );
        assert!(p.is_empty());
    }

    #[test]
    fn test_path_around_obstacle() {
        let mut grid = open_grid(5, 5);
        // Partial wall at x = 2 with a gap at y = 4
        for y in 0..4 {
            grid.set_tile_type(TileCoord::new(2, y), TileType::Rock);
            grid.set_fullness(TileCoord::new(2, y), 100.0);
        }
        let (conn, ctx) = fixtures();

        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 0),
            TileCoord::new(4, 0),
            Passability::Walkable,
            FactionColor(0),
        );
        assert!(!p.is_empty());
        assert!(p.contains(&TileCoord::new(2, 4)));
        for c in &p {
            assert_ne!(grid.tile(*c).unwrap().tile_type(), TileType::Rock);
        }
    }

    #[test]
    fn test_solid_wall_blocks_walkers_and_flood_fill_agrees() {
        let mut grid = open_grid(5, 5);
        for y in 0..5 {
            grid.set_tile_type(TileCoord::new(2, y), TileType::Rock);
            grid.set_fullness(TileCoord::new(2, y), 100.0);
        }
        let (mut conn, ctx) = fixtures();
        conn.enable_flood_fill(&mut grid, &ctx);

        let start = TileCoord::new(0, 0);
        let goal = TileCoord::new(4, 4);
        let p = path(
            &grid, &conn, &ctx, start, goal,
            Passability::Walkable,
            FactionColor(0),
        );
        assert!(p.is_empty());
        assert!(!path_exists(
            &grid, &conn, &ctx, start, goal,
            Passability::Walkable,
            FactionColor(0),
        ));
        assert_ne!(
            grid.tile(start).unwrap().connectivity_color,
            grid.tile(goal).unwrap().connectivity_color
        );
    }

    #[test]
    fn test_flyer_crosses_lava_walker_does_not() {
        let mut grid = open_grid(5, 3);
        for y in 0..3 {
            grid.set_tile_type(TileCoord::new(2, y), TileType::Lava);
        }
        let (conn, ctx) = fixtures();
        let start = TileCoord::new(0, 1);
        let goal = TileCoord::new(4, 1);

        let walk = path(&grid, &conn, &ctx, start, goal, Passability::Walkable, FactionColor(0));
        assert!(walk.is_empty());

        let fly = path(&grid, &conn, &ctx, start, goal, Passability::Flyable, FactionColor(0));
        assert_eq!(fly.len(), 5);
    }

    #[test]
    fn test_digger_tunnels_through_dirt() {
        let mut grid = TileGrid::new(5, 1).unwrap();
        // Only the endpoints are excavated
        grid.set_fullness(TileCoord::new(0, 0), 0.0);
        grid.set_fullness(TileCoord::new(4, 0), 0.0);
        let (conn, ctx) = fixtures();

        let start = TileCoord::new(0, 0);
        let goal = TileCoord::new(4, 0);
        let dig = path(&grid, &conn, &ctx, start, goal, Passability::Diggable, FactionColor(1));
        assert_eq!(dig.len(), 5);

        let walk = path(&grid, &conn, &ctx, start, goal, Passability::Walkable, FactionColor(1));
        assert!(walk.is_empty());
    }

    #[test]
    fn test_impassable_class_finds_nothing() {
        let grid = open_grid(3, 3);
        let (conn, ctx) = fixtures();
        let p = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 0),
            TileCoord::new(2, 2),
            Passability::Impassable,
            FactionColor(0),
        );
        assert!(p.is_empty());
    }

    #[test]
    fn test_path_call_counter() {
        let grid = open_grid(3, 3);
        let (conn, ctx) = fixtures();
        assert_eq!(ctx.path_calls(), 0);
        let _ = path(
            &grid,
            &conn,
            &ctx,
            TileCoord::new(0, 0),
            TileCoord::new(2, 2),
            Passability::Walkable,
            FactionColor(0),
        );
        assert_eq!(ctx.path_calls(), 1);
    }

    #[test]
    fn test_existence_is_symmetric() {
        let mut grid = open_grid(6, 6);
        grid.set_tile_type(TileCoord::new(3, 3), TileType::Rock);
        grid.set_fullness(TileCoord::new(3, 3), 100.0);
        let (mut conn, ctx) = fixtures();
        conn.enable_flood_fill(&mut grid, &ctx);

        for (a, b) in [
            (TileCoord::new(0, 0), TileCoord::new(5, 5)),
            (TileCoord::new(1, 4), TileCoord::new(4, 1)),
        ] {
            let forward = path_exists(&grid, &conn, &ctx, a, b, Passability::Walkable, FactionColor(0));
            let backward = path_exists(&grid, &conn, &ctx, b, a, Passability::Walkable, FactionColor(0));
            assert_eq!(forward, backward);
        }
    }
}
