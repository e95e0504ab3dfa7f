//! Drawing tools.
//!
//! Each tool turns content-space pointer input into a transient
//! `DrawingSession` and, on completion, into `EngineEvent`s. Tools never
//! touch the detection list; the engine routes their events to the host.
//!
//! ## Gestures
//!
//! | Input | Create / Split | Line | Point | Calibrate |
//! |-------|----------------|------|-------|-----------|
//! | Click | add vertex (close near start) | start / finish | place | point A / B |
//! | Drag | rectangle | — | — | — |
//! | Double-click | finish (≥ 3) | — | — | — |
//! | Right-click | finish (≥ 3) or cancel | cancel | — | cancel |
//! | **Shift** | 45° snap from last vertex | — | — | — |

use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::input::{Modifiers, PointerButton};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use takeoff_core::geometry::snap_to_angle;
use takeoff_core::{Detection, DetectionId, Shape};

/// The active tool determines how pointer input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    #[default]
    Select,
    PaintSelect,
    Create,
    Line,
    Point,
    Calibrate,
    Split,
    Pan,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Select,
        ToolKind::PaintSelect,
        ToolKind::Create,
        ToolKind::Line,
        ToolKind::Point,
        ToolKind::Calibrate,
        ToolKind::Split,
        ToolKind::Pan,
    ];

    /// Host-facing tool name (matches the serde form).
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::PaintSelect => "paintSelect",
            ToolKind::Create => "create",
            ToolKind::Line => "line",
            ToolKind::Point => "point",
            ToolKind::Calibrate => "calibrate",
            ToolKind::Split => "split",
            ToolKind::Pan => "pan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Whether this tool places geometry (as opposed to selecting or panning).
    pub fn draws(self) -> bool {
        matches!(
            self,
            ToolKind::Create | ToolKind::Line | ToolKind::Point | ToolKind::Calibrate | ToolKind::Split
        )
    }
}

// ─── Drawing session ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Polygon,
    RectangleFromDrag,
    Line,
    SplitPolygon,
    SplitRectangle,
}

impl SessionKind {
    pub fn is_rectangle(self) -> bool {
        matches!(self, SessionKind::RectangleFromDrag | SessionKind::SplitRectangle)
    }
}

/// Shape under construction. For rectangle sessions `vertices` holds the
/// drag origin and `preview_cursor` the opposite corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSession {
    pub kind: SessionKind,
    pub vertices: Vec<Point>,
    pub preview_cursor: Option<Point>,
    /// Pointer is close enough to the first vertex to close the polygon.
    pub near_start: bool,
}

impl DrawingSession {
    fn new(kind: SessionKind, first: Point) -> Self {
        Self {
            kind,
            vertices: vec![first],
            preview_cursor: Some(first),
            near_start: false,
        }
    }

    pub fn first_vertex(&self) -> Option<Point> {
        self.vertices.first().copied()
    }

    pub fn last_vertex(&self) -> Option<Point> {
        self.vertices.last().copied()
    }
}

/// Two-click scale calibration. `point_b` follows the pointer once
/// `point_a` is placed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationState {
    pub point_a: Option<Point>,
    pub point_b: Option<Point>,
}

impl CalibrationState {
    pub fn pixel_distance(&self) -> Option<f64> {
        Some(self.point_a?.distance(self.point_b?))
    }
}

// ─── Tool plumbing ───────────────────────────────────────────────────────

/// Pointer input already converted to content space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolInput {
    Press {
        at: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    Move {
        at: Point,
        modifiers: Modifiers,
    },
    Release {
        at: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    DoubleClick {
        at: Point,
        modifiers: Modifiers,
    },
}

/// Engine state a tool may read while handling input.
pub struct ToolContext<'a> {
    /// Current viewport scale (screen px per content px).
    pub scale: f64,
    /// Pixels per foot, for measuring emitted shapes.
    pub scale_ratio: f64,
    /// Class assigned to new detections.
    pub class: &'a str,
    /// The single selected, live polygon, if there is exactly one.
    pub split_target: Option<&'a Detection>,
    pub config: &'a EngineConfig,
}

impl ToolContext<'_> {
    /// Close-the-loop radius in content space.
    fn close_radius(&self) -> f64 {
        self.config.close_threshold / self.scale
    }

    /// Apply Shift angle snapping relative to `last`.
    fn constrain(&self, last: Option<Point>, raw: Point, modifiers: Modifiers) -> Point {
        match last {
            Some(last) if modifiers.shift => snap_to_angle(
                last,
                raw,
                self.config.snap_increment_deg,
                self.config.snap_min_distance,
            ),
            _ => raw,
        }
    }
}

/// Trait for tools that turn input into drawing sessions and events.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle one pointer input, returning zero or more events.
    fn handle(&mut self, input: &ToolInput, ctx: &ToolContext<'_>) -> Vec<EngineEvent>;

    /// The session in progress, for rendering and auto-pan.
    fn session(&self) -> Option<&DrawingSession> {
        None
    }

    /// Whether the tool holds any transient state.
    fn is_active(&self) -> bool {
        self.session().is_some()
    }

    /// Drop all transient state without emitting.
    fn cancel(&mut self);

    /// Finish the session from the keyboard (Enter).
    fn complete(&mut self, _ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        Vec::new()
    }

    /// Remove the last placed vertex. Returns whether anything changed.
    fn undo_vertex(&mut self) -> bool {
        if self.is_active() {
            self.cancel();
            true
        } else {
            false
        }
    }
}

// ─── Polygon Tool (create / split) ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonPurpose {
    /// Emit a new detection.
    Create,
    /// Emit a cutting polygon for the selected detection.
    Split,
}

pub struct PolygonTool {
    purpose: PolygonPurpose,
    session: Option<DrawingSession>,
    /// Pointer-down with no session yet: becomes a rectangle drag or the
    /// first polygon vertex on release.
    pending_press: Option<Point>,
    /// Polygon being split, fixed when the session starts.
    split_target: Option<DetectionId>,
}

impl PolygonTool {
    pub fn new(purpose: PolygonPurpose) -> Self {
        Self {
            purpose,
            session: None,
            pending_press: None,
            split_target: None,
        }
    }

    fn polygon_kind(&self) -> SessionKind {
        match self.purpose {
            PolygonPurpose::Create => SessionKind::Polygon,
            PolygonPurpose::Split => SessionKind::SplitPolygon,
        }
    }

    fn rectangle_kind(&self) -> SessionKind {
        match self.purpose {
            PolygonPurpose::Create => SessionKind::RectangleFromDrag,
            PolygonPurpose::Split => SessionKind::SplitRectangle,
        }
    }

    fn start_session(&mut self, kind: SessionKind, first: Point, ctx: &ToolContext<'_>) {
        log::debug!("{kind:?} session started at ({:.1}, {:.1})", first.x, first.y);
        self.split_target = ctx.split_target.map(|d| d.id);
        self.session = Some(DrawingSession::new(kind, first));
    }

    /// Split needs exactly one selected polygon, the same one the session
    /// started on.
    fn split_ready(&self, ctx: &ToolContext<'_>) -> bool {
        match self.purpose {
            PolygonPurpose::Create => true,
            PolygonPurpose::Split => match (self.split_target, ctx.split_target) {
                (Some(started_on), Some(current)) => started_on == current.id,
                _ => false,
            },
        }
    }

    /// Turn finished vertices into the purpose's event and reset.
    fn finish(&mut self, points: Vec<Point>, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        self.session = None;
        self.pending_press = None;
        let target = self.split_target.take();

        match self.purpose {
            PolygonPurpose::Create => match Shape::polygon(points) {
                Ok(shape) => {
                    log::debug!("polygon completed ({} vertices)", shape.vertices().len());
                    vec![EngineEvent::create(shape, ctx.class, ctx.scale_ratio)]
                }
                Err(err) => {
                    log::warn!("dropping polygon: {err}");
                    Vec::new()
                }
            },
            PolygonPurpose::Split => match target {
                Some(original_id) => {
                    log::debug!("split requested for {original_id:?}");
                    vec![EngineEvent::SplitRequested {
                        original_id,
                        cutting_polygon: points,
                    }]
                }
                None => Vec::new(),
            },
        }
    }

    fn press(&mut self, at: Point, modifiers: Modifiers, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        let Some(session) = self.session.as_mut() else {
            if self.purpose == PolygonPurpose::Split && ctx.split_target.is_none() {
                log::debug!("split ignored: select exactly one polygon first");
                return Vec::new();
            }
            self.pending_press = Some(at);
            return Vec::new();
        };
        if session.kind.is_rectangle() {
            return Vec::new();
        }

        let closes = session.vertices.len() >= 3
            && session
                .first_vertex()
                .is_some_and(|first| at.distance(first) < ctx.close_radius());
        if closes {
            return self.complete(ctx);
        }

        let vertex = ctx.constrain(session.last_vertex(), at, modifiers);
        session.vertices.push(vertex);
        session.preview_cursor = Some(vertex);
        session.near_start = false;
        Vec::new()
    }

    fn release(&mut self, at: Point, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        let Some(start) = self.pending_press.take() else {
            return Vec::new();
        };

        let dragged = match &self.session {
            Some(session) if session.kind.is_rectangle() => true,
            Some(_) => return Vec::new(),
            None => at.distance(start) > ctx.config.drag_threshold,
        };
        if !dragged {
            let kind = self.polygon_kind();
            self.start_session(kind, start, ctx);
            if let Some(session) = self.session.as_mut() {
                session.preview_cursor = Some(at);
            }
            return Vec::new();
        }

        // Fast drags may arrive without a move past the threshold.
        if self.session.is_none() {
            let kind = self.rectangle_kind();
            self.start_session(kind, start, ctx);
        }
        if !self.split_ready(ctx) {
            self.cancel();
            return Vec::new();
        }

        match Shape::rectangle(start, at) {
            Ok(shape) if shape.area_px() > 0.0 => {
                let corners = shape.vertices().to_vec();
                self.finish(corners, ctx)
            }
            _ => {
                log::debug!("degenerate rectangle dropped");
                self.cancel();
                Vec::new()
            }
        }
    }

    fn double_click(&mut self, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.kind.is_rectangle() {
            return Vec::new();
        }

        // The double-click's second press lands on the vertex it just placed.
        let n = session.vertices.len();
        if n >= 2 && session.vertices[n - 1] == session.vertices[n - 2] {
            session.vertices.pop();
        }

        match session.vertices.len() {
            0 | 1 => {
                self.cancel();
                Vec::new()
            }
            2 => Vec::new(),
            _ => self.complete(ctx),
        }
    }
}

impl Tool for PolygonTool {
    fn kind(&self) -> ToolKind {
        match self.purpose {
            PolygonPurpose::Create => ToolKind::Create,
            PolygonPurpose::Split => ToolKind::Split,
        }
    }

    fn handle(&mut self, input: &ToolInput, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        match *input {
            ToolInput::Press {
                at,
                button: PointerButton::Primary,
                modifiers,
            } => self.press(at, modifiers, ctx),

            ToolInput::Press {
                button: PointerButton::Secondary,
                ..
            } => {
                self.pending_press = None;
                match &self.session {
                    Some(s) if !s.kind.is_rectangle() && s.vertices.len() >= 3 => {
                        self.complete(ctx)
                    }
                    Some(_) => {
                        self.cancel();
                        Vec::new()
                    }
                    None => Vec::new(),
                }
            }

            ToolInput::Move { at, modifiers } => {
                if let Some(start) = self.pending_press {
                    if self.session.is_none() && at.distance(start) > ctx.config.drag_threshold {
                        let kind = self.rectangle_kind();
                        self.start_session(kind, start, ctx);
                    }
                }
                let radius = ctx.close_radius();
                if let Some(session) = self.session.as_mut() {
                    if session.kind.is_rectangle() {
                        session.preview_cursor = Some(at);
                    } else {
                        session.preview_cursor =
                            Some(ctx.constrain(session.last_vertex(), at, modifiers));
                        session.near_start = session.vertices.len() >= 3
                            && session
                                .first_vertex()
                                .is_some_and(|first| at.distance(first) < radius);
                    }
                }
                Vec::new()
            }

            ToolInput::Release {
                at,
                button: PointerButton::Primary,
                ..
            } => self.release(at, ctx),

            ToolInput::DoubleClick { .. } => self.double_click(ctx),

            _ => Vec::new(),
        }
    }

    fn session(&self) -> Option<&DrawingSession> {
        self.session.as_ref()
    }

    fn is_active(&self) -> bool {
        self.session.is_some() || self.pending_press.is_some()
    }

    fn cancel(&mut self) {
        if self.session.is_some() {
            log::debug!("{:?} session cancelled", self.kind());
        }
        self.session = None;
        self.pending_press = None;
        self.split_target = None;
    }

    fn complete(&mut self, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        let ready = match &self.session {
            Some(s) => !s.kind.is_rectangle() && s.vertices.len() >= 3,
            None => false,
        };
        if !ready || !self.split_ready(ctx) {
            return Vec::new();
        }
        match self.session.take() {
            Some(session) => self.finish(session.vertices, ctx),
            None => Vec::new(),
        }
    }

    fn undo_vertex(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.kind.is_rectangle() {
            session.vertices.pop();
            if session.vertices.len() > 1 {
                return true;
            }
        }
        self.cancel();
        true
    }
}

// ─── Line Tool ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct LineTool {
    session: Option<DrawingSession>,
}

impl LineTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tool for LineTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Line
    }

    fn handle(&mut self, input: &ToolInput, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        match *input {
            ToolInput::Press {
                at,
                button: PointerButton::Primary,
                ..
            } => {
                let Some(start) = self.session.as_ref().and_then(|s| s.first_vertex()) else {
                    log::debug!("line started at ({:.1}, {:.1})", at.x, at.y);
                    self.session = Some(DrawingSession::new(SessionKind::Line, at));
                    return Vec::new();
                };
                if at.distance(start) <= 0.0 {
                    return Vec::new();
                }
                self.session = None;
                match Shape::line(start, at) {
                    Ok(shape) => {
                        log::debug!("line completed ({:.1} px)", shape.perimeter_px());
                        vec![EngineEvent::create(shape, ctx.class, ctx.scale_ratio)]
                    }
                    Err(err) => {
                        log::warn!("dropping line: {err}");
                        Vec::new()
                    }
                }
            }
            ToolInput::Press {
                button: PointerButton::Secondary,
                ..
            } => {
                self.cancel();
                Vec::new()
            }
            ToolInput::Move { at, .. } => {
                if let Some(session) = self.session.as_mut() {
                    session.preview_cursor = Some(at);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn session(&self) -> Option<&DrawingSession> {
        self.session.as_ref()
    }

    fn cancel(&mut self) {
        if self.session.take().is_some() {
            log::debug!("line cancelled");
        }
    }
}

// ─── Point Tool ──────────────────────────────────────────────────────────

/// Stateless: every primary click places a marker.
#[derive(Default)]
pub struct PointTool;

impl PointTool {
    pub fn new() -> Self {
        Self
    }
}

impl Tool for PointTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Point
    }

    fn handle(&mut self, input: &ToolInput, ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        match *input {
            ToolInput::Press {
                at,
                button: PointerButton::Primary,
                ..
            } => match Shape::point(at) {
                Ok(shape) => vec![EngineEvent::create(shape, ctx.class, ctx.scale_ratio)],
                Err(err) => {
                    log::warn!("dropping point: {err}");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }

    fn cancel(&mut self) {}
}

// ─── Calibrate Tool ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct CalibrateTool {
    state: CalibrationState,
}

impl CalibrateTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }
}

impl Tool for CalibrateTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Calibrate
    }

    fn handle(&mut self, input: &ToolInput, _ctx: &ToolContext<'_>) -> Vec<EngineEvent> {
        match *input {
            ToolInput::Press {
                at,
                button: PointerButton::Primary,
                ..
            } => {
                let Some(point_a) = self.state.point_a else {
                    self.state.point_a = Some(at);
                    self.state.point_b = Some(at);
                    return Vec::new();
                };
                let pixel_distance = point_a.distance(at);
                if pixel_distance <= 0.0 {
                    return Vec::new();
                }
                self.state = CalibrationState::default();
                log::debug!("calibration line measured {pixel_distance:.2} px");
                vec![EngineEvent::CalibrationComplete {
                    point_a,
                    point_b: at,
                    pixel_distance,
                }]
            }
            ToolInput::Press {
                button: PointerButton::Secondary,
                ..
            } => {
                self.cancel();
                Vec::new()
            }
            ToolInput::Move { at, .. } => {
                if self.state.point_a.is_some() {
                    self.state.point_b = Some(at);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn is_active(&self) -> bool {
        self.state.point_a.is_some()
    }

    fn cancel(&mut self) {
        self.state = CalibrationState::default();
    }
}
