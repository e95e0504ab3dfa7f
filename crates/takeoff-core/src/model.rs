//! Detection data model.
//!
//! A `Detection` is a measured markup on a plan page: a polygon (with
//! optional holes), a two-point line, or a single point marker. Geometry
//! lives in content space (image pixels). Real-world measurements are
//! derived from the geometry and a pixels-per-foot ratio, never edited by
//! hand.
//!
//! The persistence layer speaks two geometry dialects: explicit point
//! lists, and legacy center + width + height boxes. Both enter through
//! [`RawGeometry`] and become the same [`Shape`]; nothing past this module
//! branches on the dialect.

use crate::error::GeometryError;
use crate::geometry::{
    bounding_box, centroid, distance_to_segment, line_length, pixel_area_to_square_feet,
    pixel_to_real_feet, point_in_polygon, polygon_area_with_holes, polygon_perimeter,
    BOUNDARY_EPSILON,
};
use crate::id::DetectionId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Confidence below which the renderer flags a detection for review.
pub const LOW_CONFIDENCE: f64 = 0.5;

// ─── Markup & status ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupType {
    Polygon,
    Line,
    Point,
}

impl MarkupType {
    /// Minimum number of points the markup needs.
    pub fn min_points(self) -> usize {
        match self {
            MarkupType::Polygon => 3,
            MarkupType::Line => 2,
            MarkupType::Point => 1,
        }
    }
}

impl fmt::Display for MarkupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkupType::Polygon => "polygon",
            MarkupType::Line => "line",
            MarkupType::Point => "point",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Produced by region detection, untouched by a person.
    #[default]
    Auto,
    Edited,
    Verified,
    /// Soft-deleted: kept for history, invisible to hit testing.
    Deleted,
}

// ─── Shape ───────────────────────────────────────────────────────────────

/// Geometry of a detection, in content space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shape {
    Polygon {
        outer: Vec<Point>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        holes: Vec<Vec<Point>>,
    },
    Line {
        start: Point,
        end: Point,
    },
    Point {
        at: Point,
    },
}

impl Shape {
    /// A simple polygon without holes.
    pub fn polygon(outer: Vec<Point>) -> Result<Self, GeometryError> {
        Self::polygon_with_holes(outer, Vec::new())
    }

    /// A polygon with holes. Holes with fewer than three points are dropped.
    pub fn polygon_with_holes(
        outer: Vec<Point>,
        holes: Vec<Vec<Point>>,
    ) -> Result<Self, GeometryError> {
        if outer.len() < 3 {
            return Err(GeometryError::TooFewPoints {
                markup: MarkupType::Polygon,
                expected: 3,
                found: outer.len(),
            });
        }
        let holes: Vec<Vec<Point>> = holes.into_iter().filter(|h| h.len() >= 3).collect();
        let all_finite = outer.iter().chain(holes.iter().flatten()).all(|p| is_finite(*p));
        if !all_finite {
            return Err(GeometryError::NonFinite);
        }
        Ok(Shape::Polygon { outer, holes })
    }

    pub fn line(start: Point, end: Point) -> Result<Self, GeometryError> {
        if !is_finite(start) || !is_finite(end) {
            return Err(GeometryError::NonFinite);
        }
        Ok(Shape::Line { start, end })
    }

    pub fn point(at: Point) -> Result<Self, GeometryError> {
        if !is_finite(at) {
            return Err(GeometryError::NonFinite);
        }
        Ok(Shape::Point { at })
    }

    /// Axis-aligned rectangle, corners clockwise from the top-left
    /// (min x/min y, max x/min y, max x/max y, min x/max y).
    pub fn rectangle(a: Point, b: Point) -> Result<Self, GeometryError> {
        let r = Rect::from_points(a, b);
        Self::polygon(vec![
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ])
    }

    /// Build a shape from either geometry dialect.
    pub fn from_raw(markup: MarkupType, raw: &RawGeometry) -> Result<Self, GeometryError> {
        match raw {
            RawGeometry::Points { points, holes } => {
                if points.len() < markup.min_points() {
                    return Err(GeometryError::TooFewPoints {
                        markup,
                        expected: markup.min_points(),
                        found: points.len(),
                    });
                }
                match markup {
                    MarkupType::Polygon => Self::polygon_with_holes(points.clone(), holes.clone()),
                    MarkupType::Line => Self::line(points[0], points[1]),
                    MarkupType::Point => Self::point(points[0]),
                }
            }
            RawGeometry::CenterBox(legacy) => {
                let rect = legacy.to_rect()?;
                match markup {
                    MarkupType::Polygon => Self::rectangle(rect.origin(), Point::new(rect.x1, rect.y1)),
                    MarkupType::Line => Self::line(rect.origin(), Point::new(rect.x1, rect.y1)),
                    MarkupType::Point => Self::point(rect.center()),
                }
            }
        }
    }

    pub fn markup_type(&self) -> MarkupType {
        match self {
            Shape::Polygon { .. } => MarkupType::Polygon,
            Shape::Line { .. } => MarkupType::Line,
            Shape::Point { .. } => MarkupType::Point,
        }
    }

    /// Editable vertices: the outer ring, the two endpoints, or the point.
    pub fn vertices(&self) -> SmallVec<[Point; 8]> {
        match self {
            Shape::Polygon { outer, .. } => outer.iter().copied().collect(),
            Shape::Line { start, end } => SmallVec::from_slice(&[*start, *end]),
            Shape::Point { at } => SmallVec::from_slice(&[*at]),
        }
    }

    /// Copy of the shape with vertex `index` moved to `to`.
    /// Out-of-range indices return the shape unchanged.
    pub fn with_vertex(&self, index: usize, to: Point) -> Shape {
        let mut shape = self.clone();
        match &mut shape {
            Shape::Polygon { outer, .. } => {
                if let Some(v) = outer.get_mut(index) {
                    *v = to;
                }
            }
            Shape::Line { start, end } => match index {
                0 => *start = to,
                1 => *end = to,
                _ => {}
            },
            Shape::Point { at } => {
                if index == 0 {
                    *at = to;
                }
            }
        }
        shape
    }

    /// Copy of the shape moved by `delta`, holes included.
    pub fn translated(&self, delta: Vec2) -> Shape {
        match self {
            Shape::Polygon { outer, holes } => Shape::Polygon {
                outer: outer.iter().map(|p| *p + delta).collect(),
                holes: holes
                    .iter()
                    .map(|h| h.iter().map(|p| *p + delta).collect())
                    .collect(),
            },
            Shape::Line { start, end } => Shape::Line {
                start: *start + delta,
                end: *end + delta,
            },
            Shape::Point { at } => Shape::Point { at: *at + delta },
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Polygon { outer, .. } => bounding_box(outer).unwrap_or(Rect::ZERO),
            Shape::Line { start, end } => Rect::from_points(*start, *end),
            Shape::Point { at } => Rect::from_points(*at, *at),
        }
    }

    /// Pixel area; zero for lines and points.
    pub fn area_px(&self) -> f64 {
        match self {
            Shape::Polygon { outer, holes } => polygon_area_with_holes(outer, holes),
            _ => 0.0,
        }
    }

    /// Pixel perimeter (polygon outer ring) or length (line).
    pub fn perimeter_px(&self) -> f64 {
        match self {
            Shape::Polygon { outer, .. } => polygon_perimeter(outer),
            Shape::Line { start, end } => line_length(*start, *end),
            Shape::Point { .. } => 0.0,
        }
    }

    /// Label anchor: polygon centroid, line midpoint, or the point itself.
    pub fn anchor(&self) -> Point {
        match self {
            Shape::Polygon { outer, .. } => centroid(outer).unwrap_or(Point::ORIGIN),
            Shape::Line { start, end } => start.midpoint(*end),
            Shape::Point { at } => *at,
        }
    }

    /// Whether `p` hits this shape.
    ///
    /// Polygons use the inclusive point-in-polygon rule; a point strictly
    /// inside a hole misses. Lines hit within `tolerance` of the segment.
    /// Points hit inside their bounding box grown by `tolerance`.
    pub fn contains(&self, p: Point, tolerance: f64) -> bool {
        match self {
            Shape::Polygon { outer, holes } => {
                point_in_polygon(p, outer)
                    && !holes.iter().any(|h| point_in_polygon(p, h) && !on_ring(p, h))
            }
            Shape::Line { start, end } => distance_to_segment(p, *start, *end) <= tolerance,
            Shape::Point { .. } => {
                let r = self.bounds().inflate(tolerance, tolerance);
                p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
            }
        }
    }

    /// Geometry in the persistence dialect (explicit points).
    pub fn to_raw(&self) -> RawGeometry {
        match self {
            Shape::Polygon { outer, holes } => RawGeometry::Points {
                points: outer.clone(),
                holes: holes.clone(),
            },
            Shape::Line { start, end } => RawGeometry::Points {
                points: vec![*start, *end],
                holes: Vec::new(),
            },
            Shape::Point { at } => RawGeometry::Points {
                points: vec![*at],
                holes: Vec::new(),
            },
        }
    }
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn on_ring(p: Point, ring: &[Point]) -> bool {
    let n = ring.len();
    (0..n).any(|i| distance_to_segment(p, ring[i], ring[(i + 1) % n]) <= BOUNDARY_EPSILON)
}

// ─── Boundary dialects ───────────────────────────────────────────────────

/// Center-based bounding box used by older detections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl LegacyBox {
    pub fn from_rect(r: Rect) -> Self {
        let c = r.center();
        Self {
            center_x: c.x,
            center_y: c.y,
            width: r.width(),
            height: r.height(),
        }
    }

    pub fn to_rect(&self) -> Result<Rect, GeometryError> {
        let values = [self.center_x, self.center_y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(GeometryError::InvalidLegacyBox {
                width: self.width,
                height: self.height,
            });
        }
        Ok(Rect::from_center_size(
            Point::new(self.center_x, self.center_y),
            (self.width, self.height),
        ))
    }
}

/// Geometry as it arrives from (and returns to) the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGeometry {
    Points {
        points: Vec<Point>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        holes: Vec<Vec<Point>>,
    },
    CenterBox(LegacyBox),
}

// ─── Measurements ────────────────────────────────────────────────────────

/// Real-world quantities derived from a shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Measurements {
    pub area_sf: f64,
    pub perimeter_lf: f64,
    pub real_width_ft: f64,
    pub real_height_ft: f64,
}

impl Measurements {
    /// Measure `shape` at `scale_ratio` pixels per foot.
    /// An unusable ratio gives all-zero measurements.
    pub fn for_shape(shape: &Shape, scale_ratio: f64) -> Self {
        let bounds = shape.bounds();
        Self {
            area_sf: pixel_area_to_square_feet(shape.area_px(), scale_ratio),
            perimeter_lf: pixel_to_real_feet(shape.perimeter_px(), scale_ratio),
            real_width_ft: pixel_to_real_feet(bounds.width(), scale_ratio),
            real_height_ft: pixel_to_real_feet(bounds.height(), scale_ratio),
        }
    }
}

// ─── Detection ───────────────────────────────────────────────────────────

/// A persisted, measured markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DetectionRecord", try_from = "DetectionRecord")]
pub struct Detection {
    pub id: DetectionId,
    pub class: String,
    pub shape: Shape,
    pub status: Status,
    pub confidence: f64,
    pub measurements: Measurements,
}

impl Detection {
    pub fn new(id: DetectionId, class: impl Into<String>, shape: Shape, scale_ratio: f64) -> Self {
        let measurements = Measurements::for_shape(&shape, scale_ratio);
        Self {
            id,
            class: class.into(),
            shape,
            status: Status::Auto,
            confidence: 1.0,
            measurements,
        }
    }

    pub fn markup_type(&self) -> MarkupType {
        self.shape.markup_type()
    }

    /// Replace the geometry and re-derive measurements. Untouched
    /// auto detections become `Edited`.
    pub fn set_shape(&mut self, shape: Shape, scale_ratio: f64) {
        self.shape = shape;
        self.remeasure(scale_ratio);
        if self.status == Status::Auto {
            self.status = Status::Edited;
        }
    }

    pub fn remeasure(&mut self, scale_ratio: f64) {
        self.measurements = Measurements::for_shape(&self.shape, scale_ratio);
    }

    pub fn is_deleted(&self) -> bool {
        self.status == Status::Deleted
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE
    }

    /// Center + width + height view of the geometry, for legacy consumers.
    pub fn legacy_box(&self) -> LegacyBox {
        LegacyBox::from_rect(self.shape.bounds())
    }
}

/// Wire form of a detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionRecord {
    id: DetectionId,
    #[serde(default)]
    class: String,
    markup_type: MarkupType,
    geometry: RawGeometry,
    #[serde(default)]
    status: Status,
    #[serde(default = "full_confidence")]
    confidence: f64,
    #[serde(default)]
    measurements: Measurements,
}

fn full_confidence() -> f64 {
    1.0
}

impl From<Detection> for DetectionRecord {
    fn from(d: Detection) -> Self {
        Self {
            id: d.id,
            markup_type: d.shape.markup_type(),
            geometry: d.shape.to_raw(),
            class: d.class,
            status: d.status,
            confidence: d.confidence,
            measurements: d.measurements,
        }
    }
}

impl TryFrom<DetectionRecord> for Detection {
    type Error = GeometryError;

    fn try_from(r: DetectionRecord) -> Result<Self, Self::Error> {
        let shape = Shape::from_raw(r.markup_type, &r.geometry)?;
        if !(0.0..=1.0).contains(&r.confidence) {
            log::warn!("{:?}: confidence {} clamped to [0, 1]", r.id, r.confidence);
        }
        Ok(Self {
            id: r.id,
            class: r.class,
            shape,
            status: r.status,
            confidence: r.confidence.clamp(0.0, 1.0),
            measurements: r.measurements,
        })
    }
}

// ─── Region-detection candidates ─────────────────────────────────────────

/// A provisional polygon proposed by a region-detection service.
/// Rendered as an overlay until the host confirms or discards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePolygon {
    pub points: Vec<Point>,
    pub class: String,
    pub confidence: f64,
}

impl CandidatePolygon {
    pub fn to_shape(&self) -> Result<Shape, GeometryError> {
        Shape::polygon(self.points.clone())
    }
}
