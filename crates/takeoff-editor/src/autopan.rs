//! Edge-triggered auto-pan.
//!
//! While a gesture is in progress and the pointer sits near a container
//! edge, every animation frame shifts the viewport so the content scrolls
//! toward the pointer. The host owns the frame loop; the engine tells it
//! when frames are needed.

use crate::config::EngineConfig;
use kurbo::{Point, Size, Vec2};
use takeoff_core::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoPanSettings {
    /// Width of the edge band, in screen px.
    pub edge_threshold: f64,
    /// Speed at the inner edge of the band (px/frame).
    pub speed_base: f64,
    /// Speed at (and beyond) the container edge (px/frame).
    pub speed_max: f64,
}

impl AutoPanSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            edge_threshold: config.edge_threshold,
            speed_base: config.pan_speed_base,
            speed_max: config.pan_speed_max,
        }
    }
}

impl Default for AutoPanSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Pan speed for a pointer `distance` px from an edge; zero outside the band.
pub fn edge_speed(distance: f64, settings: &AutoPanSettings) -> f64 {
    if distance >= settings.edge_threshold {
        return 0.0;
    }
    let factor = (1.0 - distance / settings.edge_threshold).clamp(0.0, 1.0);
    settings.speed_base + (settings.speed_max - settings.speed_base) * factor * factor
}

/// Only the nearer of two opposing edges counts.
fn axis_speed(pos: f64, extent: f64, settings: &AutoPanSettings) -> f64 {
    let near = pos;
    let far = extent - pos;
    if near <= far {
        edge_speed(near, settings)
    } else {
        -edge_speed(far, settings)
    }
}

/// Per-frame offset delta for a screen-space pointer. Near left/top gives
/// a positive delta (content moves right/down).
pub fn pan_velocity(pointer: Point, container: Size, settings: &AutoPanSettings) -> Vec2 {
    Vec2::new(
        axis_speed(pointer.x, container.width, settings),
        axis_speed(pointer.y, container.height, settings),
    )
}

#[derive(Debug, Default)]
pub struct AutoPanController {
    velocity: Vec2,
}

impl AutoPanController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_running(&self) -> bool {
        self.velocity != Vec2::ZERO
    }

    /// Recompute the pan vector from the pointer position. Returns whether
    /// panning is (still) running; a pointer back in the safe zone stops it.
    pub fn setup_by_pointer(
        &mut self,
        pointer: Point,
        container: Size,
        settings: &AutoPanSettings,
    ) -> bool {
        let velocity = pan_velocity(pointer, container, settings);
        if velocity != self.velocity {
            log::trace!("auto-pan velocity ({:.2}, {:.2})", velocity.x, velocity.y);
        }
        self.velocity = velocity;
        self.is_running()
    }

    /// Apply one frame of panning. Returns the applied delta, or `None`
    /// when idle.
    pub fn shift_viewport(&mut self, viewport: &mut Viewport) -> Option<Vec2> {
        if !self.is_running() {
            return None;
        }
        viewport.pan_by(self.velocity);
        Some(self.velocity)
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            log::trace!("auto-pan stopped");
        }
        self.velocity = Vec2::ZERO;
    }
}
