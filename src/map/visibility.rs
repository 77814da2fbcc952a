//! Field of view and line of sight
//!
//! `visible_tiles` walks the precomputed spiral nearest-first and culls
//! angular wedges behind opaque tiles instead of ray-casting per tile.
//! `line_of_sight` is a discrete Bresenham-family tracer that always yields
//! a 4-connected path, and `cut_corners` smooths A* paths with it.

use std::collections::VecDeque;

use crate::core::config::OCCLUSION_HALF_WIDTH;
use crate::core::types::FactionColor;
use crate::map::coord::TileCoord;
use crate::map::grid::TileGrid;
use crate::map::pathfinding::step_allowed;
use crate::map::spiral::TileCoordinateMap;
use crate::map::tile::Passability;

/// Tiles visible from `origin` within `radius`, in nearest-first order.
///
/// An opaque tile is itself visible (it is the last thing seen along its
/// bearing) but shadows an angular wedge of `OCCLUSION_HALF_WIDTH / d`
/// radians to each side of its direction; everything still queued inside
/// that wedge is discarded without further work.
pub fn visible_tiles(
    grid: &TileGrid,
    spiral: &TileCoordinateMap,
    origin: TileCoord,
    radius: f64,
) -> Vec<TileCoord> {
    let Some(origin_tile) = grid.tile(origin) else {
        return Vec::new();
    };
    if !origin_tile.permits_vision() {
        return Vec::new();
    }

    let radius_squared = (radius * radius) as i64;
    let mut queue: VecDeque<(TileCoord, f64)> = spiral
        .entries_within(radius_squared)
        .iter()
        .filter_map(|e| {
            let coord = TileCoord::new(origin.x + e.offset.x, origin.y + e.offset.y);
            grid.contains(coord).then_some((coord, e.angle))
        })
        .collect();

    let mut visible = Vec::new();
    while let Some((coord, _)) = queue.pop_front() {
        let Some(tile) = grid.tile(coord) else {
            continue;
        };

        visible.push(coord);
        if tile.permits_vision() {
            continue;
        }

        // Opaque: discard every queued tile inside this tile's shadow wedge.
        let dx = (coord.x - origin.x) as f64;
        let dy = (coord.y - origin.y) as f64;
        let distance = (dx * dx + dy * dy).sqrt();
        let center = dy.atan2(dx);
        let half_width = OCCLUSION_HALF_WIDTH / distance;
        queue.retain(|(_, angle)| !angle_within(*angle, center, half_width));
    }

    visible
}

/// Is `angle` within `half_width` radians of `center`, with 2-pi wrap?
fn angle_within(angle: f64, center: f64, half_width: f64) -> bool {
    let tau = std::f64::consts::TAU;
    let delta = (angle - center).rem_euclid(tau);
    delta <= half_width || delta >= tau - half_width
}

/// Discrete sight line from `from` to `to`, inclusive of both endpoints.
///
/// The trace is always 4-connected: every diagonal step of the underlying
/// Bresenham walk inserts the intermediate tile, so a wall corner can never
/// be skipped over. Returns an empty path the moment the line steps onto a
/// tile that does not exist, which stops sight from cutting across holes in
/// the map.
pub fn line_of_sight(grid: &TileGrid, from: TileCoord, to: TileCoord) -> Vec<TileCoord> {
    let (mut x0, mut y0, mut x1, mut y1) = (from.x, from.y, to.x, to.y);
    let mut dx = x1 - x0;
    let mut dy = y1 - y0;

    // Trace steep lines as their transpose
    let steep = dy.abs() >= dx.abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
        dx = x1 - x0;
        dy = y1 - y0;
    }

    let xstep = if dx < 0 {
        dx = -dx;
        -1
    } else {
        1
    };
    let ystep = if dy < 0 {
        dy = -dy;
        -1
    } else {
        1
    };

    let two_dy = 2 * dy;
    let two_dy_two_dx = two_dy - 2 * dx;
    let mut error = two_dy - dx;
    let mut y = y0;

    let plot = |x: i32, y: i32| {
        if steep {
            TileCoord::new(y, x)
        } else {
            TileCoord::new(x, y)
        }
    };

    let mut path = Vec::new();
    let mut x = x0;
    while x != x1 {
        if !grid.contains(plot(x, y)) {
            return Vec::new();
        }
        path.push(plot(x, y));

        if error > 0 {
            // The next step moves diagonally; emit the intermediate tile so
            // the path stays 4-connected.
            if !grid.contains(plot(x + xstep, y)) {
                return Vec::new();
            }
            path.push(plot(x + xstep, y));
            error += two_dy_two_dx;
            y += ystep;
        } else {
            error += two_dy;
        }

        x += xstep;
    }

    if !grid.contains(to) {
        return Vec::new();
    }
    path.push(to);
    path
}

/// Reduce a tile path to "can a creature of this class traverse every tile".
///
/// An empty path is never clear, and nothing traverses the impassable
/// class.
pub fn path_is_clear(
    grid: &TileGrid,
    path: &[TileCoord],
    class: Passability,
    color: FactionColor,
) -> bool {
    if path.is_empty() || class == Passability::Impassable {
        return false;
    }
    path.iter().all(|c| {
        grid.tile(*c)
            .map(|t| step_allowed(t, class, color))
            .unwrap_or(false)
    })
}

/// Path smoothing: from each anchor, advance a lookahead as far as sight
/// plus clearness permit, then drop the tiles strictly between anchor and
/// the last clear tile. No-ops on paths of length 3 or less.
///
/// Never lengthens the path and always preserves the first and last tile.
pub fn cut_corners(
    grid: &TileGrid,
    path: &mut Vec<TileCoord>,
    class: Passability,
    color: FactionColor,
) {
    if path.len() <= 3 {
        return;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    let mut anchor = 0;
    loop {
        smoothed.push(path[anchor]);
        if anchor + 1 >= path.len() {
            break;
        }

        // First index the anchor cannot see clearly, or the path end
        let mut lookahead = anchor + 1;
        while lookahead < path.len() {
            let sight = line_of_sight(grid, path[anchor], path[lookahead]);
            if path_is_clear(grid, &sight, class, color) {
                lookahead += 1;
            } else {
                break;
            }
        }

        if lookahead == path.len() {
            // Clear all the way: keep only the final tile and finish
            if lookahead - 1 > anchor {
                smoothed.push(path[lookahead - 1]);
            }
            break;
        }

        // Keep the last clearly-seen tile, then re-anchor on the blocked one
        if lookahead - 1 > anchor {
            smoothed.push(path[lookahead - 1]);
        }
        anchor = lookahead;
    }

    *path = smoothed;
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

    #[test]
    fn test_los_straight_row() {
        let grid = open_grid(6, 6);
        let path = line_of_sight(&grid, TileCoord::new(0, 2), TileCoord::new(4, 2));
        assert_eq!(
            path,
            vec![
                TileCoord::new(0, 2),
                TileCoord::new(1, 2),
                TileCoord::new(2, 2),
                TileCoord::new(3, 2),
                TileCoord::new(4, 2),
            ]
        );
    }

    #[test]
    fn test_los_straight_column() {
        let grid = open_grid(6, 6);
        let path = line_of_sight(&grid, TileCoord::new(3, 0), TileCoord::new(3, 3));
        assert_eq!(path.len(), 4);
        assert_eq!(path.first(), Some(&TileCoord::new(3, 0)));
        assert_eq!(path.last(), Some(&TileCoord::new(3, 3)));
    }

    #[test]
    fn test_los_axis_aligned_reversal() {
        let grid = open_grid(8, 8);
        let a = TileCoord::new(1, 5);
        let b = TileCoord::new(6, 5);
        let forward = line_of_sight(&grid, a, b);
        let mut backward = line_of_sight(&grid, b, a);
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_los_is_4_connected() {
        let grid = open_grid(10, 10);
        let path = line_of_sight(&grid, TileCoord::new(0, 0), TileCoord::new(7, 4));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(&pair[1]), 1, "diagonal skip in {:?}", path);
        }
    }

    #[test]
    fn test_los_aborts_off_map() {
        let grid = open_grid(4, 4);
        let path = line_of_sight(&grid, TileCoord::new(0, 0), TileCoord::new(8, 2));
        assert!(path.is_empty());
    }

    #[test]
    fn test_los_same_tile() {
        let grid = open_grid(4, 4);
        let path = line_of_sight(&grid, TileCoord::new(2, 2), TileCoord::new(2, 2));
        assert_eq!(path, vec![TileCoord::new(2, 2)]);
    }

    #[test]
    fn test_visible_tiles_open_radius() {
        let grid = open_grid(11, 11);
        let spiral = TileCoordinateMap::new(10);
        let origin = TileCoord::new(5, 5);

        let visible = visible_tiles(&grid, &spiral, origin, 2.0);
        assert!(visible.contains(&origin));
        assert!(visible.contains(&TileCoord::new(7, 5)));
        assert!(!visible.contains(&TileCoord::new(8, 5)));
    }

    #[test]
    fn test_opaque_origin_sees_nothing() {
        let mut grid = open_grid(5, 5);
        grid.set_fullness(TileCoord::new(2, 2), 100.0);
        let spiral = TileCoordinateMap::new(5);

        let visible = visible_tiles(&grid, &spiral, TileCoord::new(2, 2), 3.0);
        assert!(visible.is_empty());
    }

    #[test]
    fn test_wall_shadows_tiles_behind_it() {
        let mut grid = open_grid(13, 13);
        let origin = TileCoord::new(6, 6);
        // Unexcavated dirt two tiles east blocks that bearing
        grid.set_fullness(TileCoord::new(8, 6), 100.0);
        let spiral = TileCoordinateMap::new(12);

        let visible = visible_tiles(&grid, &spiral, origin, 5.0);
        // The blocker itself is the last thing seen on that bearing
        assert!(visible.contains(&TileCoord::new(8, 6)));
        assert!(!visible.contains(&TileCoord::new(9, 6)));
        assert!(!visible.contains(&TileCoord::new(10, 6)));
        // Bearings well off the shadow wedge are unaffected
        assert!(visible.contains(&TileCoord::new(6, 9)));
        assert!(visible.contains(&TileCoord::new(2, 6)));
    }

    #[test]
    fn test_visibility_monotonic_in_radius() {
        let mut grid = open_grid(15, 15);
        grid.set_fullness(TileCoord::new(9, 7), 100.0);
        grid.set_fullness(TileCoord::new(5, 9), 100.0);
        let spiral = TileCoordinateMap::new(14);
        let origin = TileCoord::new(7, 7);

        let near: Vec<_> = visible_tiles(&grid, &spiral, origin, 3.0);
        let far: Vec<_> = visible_tiles(&grid, &spiral, origin, 6.0);
        for coord in near {
            assert!(far.contains(&coord), "{} lost at larger radius", coord);
        }
    }

    #[test]
    fn test_path_is_clear_rules() {
        let mut grid = open_grid(5, 1);
        grid.set_tile_type(TileCoord::new(2, 0), TileType::Lava);
        let path: Vec<_> = (0..5).map(|x| TileCoord::new(x, 0)).collect();

        assert!(!path_is_clear(&grid, &path, Passability::Walkable, FactionColor(0)));
        assert!(path_is_clear(&grid, &path, Passability::Flyable, FactionColor(0)));
        assert!(!path_is_clear(&grid, &path, Passability::Impassable, FactionColor(0)));
        assert!(!path_is_clear(&grid, &[], Passability::Walkable, FactionColor(0)));
    }

    #[test]
    fn test_cut_corners_straightens_staircase() {
        let grid = open_grid(8, 8);
        // 4-connected staircase from (0,0) to (3,3)
        let mut path = vec![
            TileCoord::new(0, 0),
            TileCoord::new(1, 0),
            TileCoord::new(1, 1),
            TileCoord::new(2, 1),
            TileCoord::new(2, 2),
            TileCoord::new(3, 2),
            TileCoord::new(3, 3),
        ];
        let original = path.clone();
        cut_corners(&grid, &mut path, Passability::Walkable, FactionColor(0));

        assert!(path.len() <= original.len());
        assert_eq!(path.first(), original.first());
        assert_eq!(path.last(), original.last());
    }

    #[test]
    fn test_cut_corners_short_path_untouched() {
        let grid = open_grid(5, 5);
        let mut path = vec![
            TileCoord::new(0, 0),
            TileCoord::new(1, 0),
            TileCoord::new(2, 0),
        ];
        let original = path.clone();
        cut_corners(&grid, &mut path, Passability::Walkable, FactionColor(0));
        assert_eq!(path, original);
    }

    #[test]
    fn test_cut_corners_keeps_detour_around_wall() {
        let mut grid = open_grid(5, 5);
        grid.set_fullness(TileCoord::new(1, 1), 100.0);
        // Path bends around the blocked (1,1)
        let mut path = vec![
            TileCoord::new(0, 0),
            TileCoord::new(0, 1),
            TileCoord::new(0, 2),
            TileCoord::new(1, 2),
            TileCoord::new(2, 2),
            TileCoord::new(2, 1),
            TileCoord::new(2, 0),
        ];
        cut_corners(&grid, &mut path, Passability::Walkable, FactionColor(0));
        assert_eq!(path.first(), Some(&TileCoord::new(0, 0)));
        assert_eq!(path.last(), Some(&TileCoord::new(2, 0)));
        // The blocked tile can never appear in a smoothed path
        assert!(!path.contains(&TileCoord::new(1, 1)));
    }
}
