//! Precomputed spiral offset table for visibility queries
//!
//! Every field-of-view query walks the same nearest-first ring of relative
//! offsets, so the offsets, their squared radii, and their polar angles are
//! computed once per map and reused.

use crate::map::coord::TileCoord;

/// One precomputed offset from a query origin
#[derive(Debug, Clone, Copy)]
pub struct SpiralEntry {
    pub offset: TileCoord,
    pub radius_squared: i64,
    /// Polar angle of the offset's center, in `(-pi, pi]`
    pub angle: f64,
}

/// Offsets out to a maximum radius, sorted nearest-first
#[derive(Debug, Clone)]
pub struct TileCoordinateMap {
    max_radius: i32,
    entries: Vec<SpiralEntry>,
}

impl TileCoordinateMap {
    pub fn new(max_radius: i32) -> Self {
        let max_radius = max_radius.max(0);
        let limit = (max_radius as i64) * (max_radius as i64);
        let mut entries = Vec::new();

        for dy in -max_radius..=max_radius {
            for dx in -max_radius..=max_radius {
                let radius_squared = (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64);
                if radius_squared > limit {
                    continue;
                }
                entries.push(SpiralEntry {
                    offset: TileCoord::new(dx, dy),
                    radius_squared,
                    angle: (dy as f64).atan2(dx as f64),
                });
            }
        }

        // Nearest first; equal radii ordered by angle so the walk order is
        // reproducible.
        entries.sort_by(|a, b| {
            a.radius_squared
                .cmp(&b.radius_squared)
                .then(a.angle.total_cmp(&b.angle))
        });

        Self {
            max_radius,
            entries,
        }
    }

    pub fn max_radius(&self) -> i32 {
        self.max_radius
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with squared radius at most `radius_squared`, nearest first
    pub fn entries_within(&self, radius_squared: i64) -> &[SpiralEntry] {
        // Entries are sorted by squared radius, so the prefix is the answer.
        let end = self
            .entries
            .partition_point(|e| e.radius_squared <= radius_squared);
        &self.entries[..end]
    }
}
