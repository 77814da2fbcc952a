//! Map lights: positional light sources with a per-frame flicker

use serde::{Deserialize, Serialize};

use crate::core::types::LightId;
use crate::entities::capability::Animated;
use crate::entities::missile::MapPosition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLight {
    pub id: LightId,
    pub name: String,
    pub position: MapPosition,
    /// RGB in `[0, 1]`
    pub color: (f64, f64, f64),
    pub brightness: f64,
    flicker_phase: f64,
}

impl MapLight {
    pub fn new(id: LightId, position: MapPosition, color: (f64, f64, f64), brightness: f64) -> Self {
        Self {
            id,
            name: format!("MapLight_{}", id.0),
            position,
            color,
            brightness,
            flicker_phase: 0.0,
        }
    }

    /// Current brightness including the flicker wobble
    pub fn effective_brightness(&self) -> f64 {
        self.brightness * (1.0 + 0.1 * self.flicker_phase.sin())
    }
}

impl Animated for MapLight {
    fn advance(&mut self, dt: f64) {
        self.flicker_phase = (self.flicker_phase + dt * 7.0) % std::f64::consts::TAU;
    }
}
