//! Hit testing: content point → detection lookup.
//!
//! Z-order follows the render policy: selected shapes draw above unselected
//! ones, and among equals smaller areas draw above larger ones, so a room
//! drawn inside a floor outline stays clickable.

use crate::id::DetectionId;
use crate::model::{Detection, Shape};
use kurbo::Point;
use std::cmp::Ordering;

/// Content-space hit tolerances for markups without area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitTolerance {
    /// Half-size of the square around a point marker.
    pub point_radius: f64,
    /// Max distance from a line segment.
    pub line_tolerance: f64,
}

impl HitTolerance {
    fn for_detection(&self, d: &Detection) -> f64 {
        match d.shape {
            Shape::Polygon { .. } => 0.0,
            Shape::Line { .. } => self.line_tolerance,
            Shape::Point { .. } => self.point_radius,
        }
    }
}

/// Every live (non-deleted) detection containing `point`, in input order.
pub fn hits_at<'a>(
    point: Point,
    detections: &'a [Detection],
    tolerance: HitTolerance,
) -> impl Iterator<Item = &'a Detection> + 'a {
    detections
        .iter()
        .filter(move |d| !d.is_deleted() && d.shape.contains(point, tolerance.for_detection(d)))
}

/// The detection drawn frontmost at `point`.
///
/// Candidates are ordered by `(selected, primary, area descending)` and the
/// last one wins. The sort is stable, so among exact ties the later entry
/// in `detections` (painted later) wins.
pub fn resolve_topmost(
    point: Point,
    detections: &[Detection],
    tolerance: HitTolerance,
    selected: &[DetectionId],
    primary: Option<DetectionId>,
) -> Option<DetectionId> {
    let mut candidates: Vec<(bool, bool, f64, DetectionId)> = hits_at(point, detections, tolerance)
        .map(|d| {
            (
                selected.contains(&d.id),
                primary == Some(d.id),
                d.shape.area_px(),
                d.id,
            )
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal))
    });
    candidates.last().map(|c| c.3)
}

/// Index of the vertex of `detection` nearest to `point`, if within `radius`.
pub fn hit_vertex(point: Point, detection: &Detection, radius: f64) -> Option<usize> {
    detection
        .shape
        .vertices()
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.distance(point)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
}
