//! Pan/zoom transform between screen space and content space.
//!
//! `screen = content * scale + offset`. The offset is where the content
//! origin lands on screen; the scale is always kept inside `ScaleLimits`.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom bounds and the per-step wheel factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_factor: f64,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            zoom_factor: 1.1,
        }
    }
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset: Vec2,
    pub container: Size,
    pub limits: ScaleLimits,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0), ScaleLimits::default())
    }
}

impl Viewport {
    pub fn new(container: Size, limits: ScaleLimits) -> Self {
        Self {
            scale: limits.clamp(1.0),
            offset: Vec2::ZERO,
            container,
            limits,
        }
    }

    pub fn screen_to_content(&self, screen: Point) -> Point {
        ((screen - self.offset).to_vec2() / self.scale).to_point()
    }

    pub fn content_to_screen(&self, content: Point) -> Point {
        (content.to_vec2() * self.scale).to_point() + self.offset
    }

    /// Convert a screen-space length (e.g. a hit radius in px) to content units.
    pub fn screen_len_to_content(&self, len: f64) -> f64 {
        len / self.scale
    }

    /// Zoom one wheel step in or out, keeping the content point under
    /// `pointer` fixed on screen. Returns whether the scale changed.
    pub fn zoom_at_pointer(&mut self, pointer: Point, zoom_in: bool) -> bool {
        let factor = if zoom_in {
            self.limits.zoom_factor
        } else {
            1.0 / self.limits.zoom_factor
        };
        self.zoom_to(self.scale * factor, pointer)
    }

    /// Set the scale (clamped), keeping the content point under `pointer` fixed.
    pub fn zoom_to(&mut self, scale: f64, pointer: Point) -> bool {
        let anchor = self.screen_to_content(pointer);
        let new_scale = self.limits.clamp(scale);
        if new_scale == self.scale {
            return false;
        }
        self.scale = new_scale;
        self.offset = pointer.to_vec2() - anchor.to_vec2() * new_scale;
        true
    }

    /// Fit `content` inside the container with `padding` on every side,
    /// never enlarging past 1:1, and center it.
    pub fn fit_to_container(&mut self, content: Size, container: Size, padding: f64) {
        self.container = container;
        if content.width <= 0.0 || content.height <= 0.0 {
            self.scale = self.limits.clamp(1.0);
            self.offset = Vec2::new(container.width / 2.0, container.height / 2.0);
            return;
        }
        let fit_w = (container.width - 2.0 * padding) / content.width;
        let fit_h = (container.height - 2.0 * padding) / content.height;
        self.scale = self.limits.clamp(1.0_f64.min(fit_w).min(fit_h));
        self.offset = Vec2::new(
            (container.width - content.width * self.scale) / 2.0,
            (container.height - content.height * self.scale) / 2.0,
        );
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    pub fn set_container(&mut self, container: Size) {
        self.container = container;
    }

    pub fn container_center(&self) -> Point {
        Point::new(self.container.width / 2.0, self.container.height / 2.0)
    }

    /// Content-space rectangle currently visible in the container.
    pub fn visible_content_rect(&self) -> Rect {
        Rect::from_points(
            self.screen_to_content(Point::ORIGIN),
            self.screen_to_content(self.container.to_vec2().to_point()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    fn sample_viewport() -> Viewport {
        let mut vp = Viewport::default();
        vp.scale = 2.5;
        vp.offset = Vec2::new(-130.0, 47.5);
        vp
    }

    #[test]
    fn round_trip_screen_content() {
        let vp = sample_viewport();
        for p in [
            Point::new(0.0, 0.0),
            Point::new(123.4, -56.7),
            Point::new(4096.0, 3072.0),
        ] {
            assert!(close(vp.screen_to_content(vp.content_to_screen(p)), p));
            assert!(close(vp.content_to_screen(vp.screen_to_content(p)), p));
        }
    }

    #[test]
    fn zoom_keeps_pointer_anchor() {
        let mut vp = sample_viewport();
        let pointer = Point::new(321.0, 210.0);
        let before = vp.screen_to_content(pointer);
        assert!(vp.zoom_at_pointer(pointer, true));
        assert!((vp.scale - 2.75).abs() < EPS);
        assert!(close(vp.screen_to_content(pointer), before));

        assert!(vp.zoom_at_pointer(pointer, false));
        assert!(close(vp.screen_to_content(pointer), before));
    }

    #[test]
    fn zoom_clamps_to_limits() {
        let mut vp = Viewport::default();
        vp.scale = 9.95;
        let pointer = Point::new(10.0, 10.0);
        let before = vp.screen_to_content(pointer);
        assert!(vp.zoom_at_pointer(pointer, true));
        assert_eq!(vp.scale, 10.0);
        assert!(close(vp.screen_to_content(pointer), before));
        // Already at the max: nothing changes.
        assert!(!vp.zoom_at_pointer(pointer, true));
    }

    #[test]
    fn fit_shrinks_and_centers() {
        let mut vp = Viewport::default();
        vp.fit_to_container(Size::new(2000.0, 1000.0), Size::new(1040.0, 800.0), 20.0);
        assert!((vp.scale - 0.5).abs() < EPS);
        assert!((vp.offset.x - 20.0).abs() < EPS);
        assert!((vp.offset.y - 150.0).abs() < EPS);
    }

    #[test]
    fn fit_never_enlarges() {
        let mut vp = Viewport::default();
        vp.fit_to_container(Size::new(200.0, 100.0), Size::new(1000.0, 800.0), 20.0);
        assert_eq!(vp.scale, 1.0);
        assert!((vp.offset.x - 400.0).abs() < EPS);
        assert!((vp.offset.y - 350.0).abs() < EPS);
    }

    #[test]
    fn pan_moves_offset() {
        let mut vp = Viewport::default();
        vp.pan_by(Vec2::new(12.0, -3.0));
        vp.pan_by(Vec2::new(1.0, 1.0));
        assert_eq!(vp.offset, Vec2::new(13.0, -2.0));
    }

    #[test]
    fn visible_rect_tracks_transform() {
        let mut vp = Viewport::new(Size::new(100.0, 50.0), ScaleLimits::default());
        vp.scale = 2.0;
        vp.offset = Vec2::new(-20.0, 10.0);
        let r = vp.visible_content_rect();
        assert!((r.x0 - 10.0).abs() < EPS && (r.y0 + 5.0).abs() < EPS);
        assert!((r.x1 - 60.0).abs() < EPS && (r.y1 - 20.0).abs() < EPS);
    }
}
