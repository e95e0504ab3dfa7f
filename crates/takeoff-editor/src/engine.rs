//! The annotation engine: routes input to the active tool and owns every
//! piece of interactive state.
//!
//! The host feeds screen-space `InputEvent`s into [`Engine::apply`] and
//! gets back the `EngineEvent`s they produced. Everything the renderer
//! needs (viewport, session preview, selection, cursor) is read back
//! through accessors; the engine never draws.
//!
//! At most one gesture is in progress at a time: a drawing session, a
//! paint-select stroke, or a vertex/move edit. Switching tools cancels
//! whatever was in progress.

use crate::autopan::{AutoPanController, AutoPanSettings};
use crate::config::{ConfigError, EngineConfig};
use crate::edit::{ShapeEdit, ShapeEditor};
use crate::events::EngineEvent;
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::selection::{Selection, SelectionManager, split_target};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{
    CalibrateTool, CalibrationState, DrawingSession, LineTool, PointTool, PolygonPurpose,
    PolygonTool, Tool, ToolContext, ToolInput, ToolKind,
};
use kurbo::{Point, Size, Vec2};
use serde::Serialize;
use takeoff_core::geometry::calibration_ratio;
use takeoff_core::{CandidatePolygon, Detection, DetectionId, Viewport, hit_vertex};

/// Cursor the host should show, derived from tool and gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    Pointer,
    Grab,
    Grabbing,
    Move,
    NotAllowed,
}

impl CursorHint {
    /// CSS `cursor` value.
    pub fn css(self) -> &'static str {
        match self {
            CursorHint::Default => "default",
            CursorHint::Crosshair => "crosshair",
            CursorHint::Pointer => "pointer",
            CursorHint::Grab => "grab",
            CursorHint::Grabbing => "grabbing",
            CursorHint::Move => "move",
            CursorHint::NotAllowed => "not-allowed",
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    viewport: Viewport,
    image_size: Option<Size>,
    tool: ToolKind,

    create_tool: PolygonTool,
    split_tool: PolygonTool,
    line_tool: LineTool,
    point_tool: PointTool,
    calibrate_tool: CalibrateTool,

    selection: SelectionManager,
    editor: ShapeEditor,
    autopan: AutoPanController,

    detections: Vec<Detection>,
    candidates: Vec<CandidatePolygon>,
    scale_ratio: f64,
    active_class: String,

    /// Last screen pointer position, for re-projecting previews after the
    /// viewport moves under a still pointer.
    pointer: Option<(Point, Modifiers)>,
    /// Previous screen sample of a pan drag.
    pan_drag: Option<Point>,
    /// Press on a member of a multi-selection: narrows to it on release
    /// unless the pointer was dragged.
    pending_narrow: Option<(DetectionId, Point)>,
    space_held: bool,
    hover: Option<DetectionId>,
    hover_handle: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            viewport: Viewport::new(Size::new(800.0, 600.0), config.scale_limits()),
            config,
            image_size: None,
            tool: ToolKind::Select,
            create_tool: PolygonTool::new(PolygonPurpose::Create),
            split_tool: PolygonTool::new(PolygonPurpose::Split),
            line_tool: LineTool::new(),
            point_tool: PointTool::new(),
            calibrate_tool: CalibrateTool::new(),
            selection: SelectionManager::new(),
            editor: ShapeEditor::new(),
            autopan: AutoPanController::new(),
            detections: Vec::new(),
            candidates: Vec::new(),
            scale_ratio: 0.0,
            active_class: String::new(),
            pointer: None,
            pan_drag: None,
            pending_narrow: None,
            space_held: false,
            hover: None,
            hover_handle: false,
        }
    }

    // ─── Read access ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// The drawing session of the active tool, if any.
    pub fn session(&self) -> Option<&DrawingSession> {
        self.active_tool().and_then(|t| t.session())
    }

    pub fn calibration(&self) -> &CalibrationState {
        self.calibrate_tool.state()
    }

    /// The selection to highlight (provisional while paint-selecting).
    pub fn selection(&self) -> &Selection {
        self.selection.visible()
    }

    pub fn committed_selection(&self) -> &Selection {
        self.selection.selection()
    }

    /// Vertex/move edit in progress, with its preview geometry.
    pub fn edit_preview(&self) -> Option<&ShapeEdit> {
        self.editor.current()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn candidates(&self) -> &[CandidatePolygon] {
        &self.candidates
    }

    pub fn scale_ratio(&self) -> f64 {
        self.scale_ratio
    }

    pub fn active_class(&self) -> &str {
        &self.active_class
    }

    pub fn hover(&self) -> Option<DetectionId> {
        self.hover
    }

    /// Whether a gesture that keeps the viewport live is in progress.
    pub fn session_active(&self) -> bool {
        self.session().is_some() || self.selection.is_painting() || self.editor.is_active()
    }

    /// Whether the host should keep delivering `InputEvent::Frame`.
    pub fn needs_frame(&self) -> bool {
        self.session_active() && self.autopan.is_running()
    }

    pub fn cursor_hint(&self) -> CursorHint {
        if self.pan_drag.is_some() {
            return CursorHint::Grabbing;
        }
        if self.tool == ToolKind::Pan || self.space_held {
            return CursorHint::Grab;
        }
        match self.tool {
            ToolKind::Select => {
                if self.editor.is_active() || self.hover_handle {
                    CursorHint::Move
                } else if self.hover.is_some() {
                    CursorHint::Pointer
                } else {
                    CursorHint::Default
                }
            }
            ToolKind::PaintSelect => CursorHint::Crosshair,
            ToolKind::Split
                if self.session().is_none()
                    && split_target(self.selection.selection(), &self.detections).is_none() =>
            {
                CursorHint::NotAllowed
            }
            _ => match self.session() {
                Some(s) if s.near_start => CursorHint::Pointer,
                _ => CursorHint::Crosshair,
            },
        }
    }

    // ─── Host-driven state ──────────────────────────────────────────────

    /// Replace the configuration. The current scale is re-clamped.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.viewport.limits = config.scale_limits();
        self.viewport.scale = self.viewport.limits.clamp(self.viewport.scale);
        Ok(())
    }

    /// Switch tools. Any gesture in progress is cancelled, not completed.
    pub fn set_tool(&mut self, kind: ToolKind) -> Vec<EngineEvent> {
        if kind == self.tool {
            return Vec::new();
        }
        self.cancel_all();
        log::debug!("tool {} -> {}", self.tool.name(), kind.name());
        self.tool = kind;
        self.hover = None;
        self.hover_handle = false;
        vec![EngineEvent::ToolChanged { tool: kind }]
    }

    /// A new page image: fit it into the container and drop every gesture.
    pub fn load_image(&mut self, width: f64, height: f64) -> Vec<EngineEvent> {
        self.cancel_all();
        let size = Size::new(width, height);
        self.image_size = Some(size);
        self.viewport
            .fit_to_container(size, self.viewport.container, self.config.fit_padding);
        log::debug!("image {width}x{height} loaded at scale {:.3}", self.viewport.scale);
        vec![self.viewport_event()]
    }

    /// The canvas element was resized. The transform is kept as is.
    pub fn set_container(&mut self, width: f64, height: f64) {
        self.viewport.set_container(Size::new(width, height));
    }

    /// Replace the detection snapshot, e.g. after the host applied an event.
    pub fn set_detections(&mut self, mut detections: Vec<Detection>) -> Vec<EngineEvent> {
        for d in &mut detections {
            d.remeasure(self.scale_ratio);
        }
        self.detections = detections;

        let edited_gone = self.editor.current().is_some_and(|edit| {
            !self
                .detections
                .iter()
                .any(|d| d.id == edit.id && !d.is_deleted())
        });
        if edited_gone {
            self.editor.cancel();
        }
        if let Some(id) = self.hover {
            if !self.detections.iter().any(|d| d.id == id && !d.is_deleted()) {
                self.hover = None;
                self.hover_handle = false;
            }
        }
        self.selection.retain_existing(&self.detections)
    }

    pub fn set_scale_ratio(&mut self, scale_ratio: f64) {
        self.scale_ratio = scale_ratio;
        for d in &mut self.detections {
            d.remeasure(scale_ratio);
        }
    }

    /// Derive the scale ratio from a calibration line of known length.
    /// Returns the new ratio, or `None` if the inputs cannot produce one.
    pub fn apply_calibration(&mut self, pixel_distance: f64, real_feet: f64) -> Option<f64> {
        let ratio = calibration_ratio(pixel_distance, real_feet)?;
        log::debug!("calibrated: {ratio:.3} px/ft");
        self.set_scale_ratio(ratio);
        Some(ratio)
    }

    pub fn set_active_class(&mut self, class: impl Into<String>) {
        self.active_class = class.into();
    }

    /// Replace the candidate overlays. Candidates without a usable
    /// polygon are dropped.
    pub fn set_candidates(&mut self, mut candidates: Vec<CandidatePolygon>) {
        candidates.retain(|c| match c.to_shape() {
            Ok(_) => true,
            Err(err) => {
                log::warn!("dropping {} candidate: {err}", c.class);
                false
            }
        });
        self.candidates = candidates;
    }

    /// Hand the candidate overlays back to the host (to confirm them).
    pub fn take_candidates(&mut self) -> Vec<CandidatePolygon> {
        std::mem::take(&mut self.candidates)
    }

    pub fn clear_candidates(&mut self) {
        self.candidates.clear();
    }

    /// Host-driven selection (e.g. a row picked in the estimate grid).
    pub fn select_ids(&mut self, ids: &[DetectionId]) -> Vec<EngineEvent> {
        self.selection.set(ids, &self.detections)
    }

    pub fn zoom_step(&mut self, zoom_in: bool) -> Vec<EngineEvent> {
        let center = self.viewport.container_center();
        if self.viewport.zoom_at_pointer(center, zoom_in) {
            vec![self.viewport_event()]
        } else {
            Vec::new()
        }
    }

    /// Re-fit the loaded image. No-op before an image is loaded.
    pub fn zoom_to_fit(&mut self) -> Vec<EngineEvent> {
        let Some(size) = self.image_size else {
            return Vec::new();
        };
        self.viewport
            .fit_to_container(size, self.viewport.container, self.config.fit_padding);
        vec![self.viewport_event()]
    }

    /// Escape: cancel the gesture in progress, or clear the selection
    /// when there is none.
    pub fn cancel(&mut self) -> Vec<EngineEvent> {
        if self.has_transient_state() {
            self.cancel_all();
            return Vec::new();
        }
        self.selection.clear()
    }

    // ─── Input routing ──────────────────────────────────────────────────

    pub fn apply(&mut self, event: InputEvent) -> Vec<EngineEvent> {
        let events = match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(x, y), button, modifiers),
            InputEvent::PointerMove { x, y, modifiers } => {
                self.pointer_move(Point::new(x, y), modifiers)
            }
            InputEvent::PointerUp {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_up(Point::new(x, y), button, modifiers),
            InputEvent::DoubleClick { x, y, modifiers } => {
                let at = self.viewport.screen_to_content(Point::new(x, y));
                self.with_active_tool(|tool, ctx| {
                    tool.handle(&ToolInput::DoubleClick { at, modifiers }, ctx)
                })
                .unwrap_or_default()
            }
            InputEvent::Wheel { x, y, delta_y, .. } => self.wheel(Point::new(x, y), delta_y),
            InputEvent::KeyDown { key, modifiers } => self.key_down(&key, modifiers),
            InputEvent::KeyUp { key, .. } => {
                if ShortcutMap::resolve_release(&key) == Some(ShortcutAction::PanEnd) {
                    self.space_held = false;
                    self.pan_drag = None;
                }
                Vec::new()
            }
            InputEvent::PointerLeave => {
                self.hover = None;
                self.hover_handle = false;
                Vec::new()
            }
            InputEvent::Frame => self.frame(),
        };

        if !self.session_active() {
            self.autopan.stop();
        }
        debug_assert!(self.gestures_in_progress() <= 1);
        events
    }

    fn pointer_down(
        &mut self,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Vec<EngineEvent> {
        self.pointer = Some((screen, modifiers));
        if button == PointerButton::Middle || self.tool == ToolKind::Pan || self.space_held {
            self.pan_drag = Some(screen);
            return Vec::new();
        }

        let at = self.viewport.screen_to_content(screen);
        log::trace!("press {button:?} at ({:.1}, {:.1}) with {}", at.x, at.y, self.tool.name());
        match self.tool {
            ToolKind::Select if button == PointerButton::Primary => self.select_press(at, modifiers),
            ToolKind::PaintSelect if button == PointerButton::Primary => {
                let tolerance = self.config.hit_tolerance(self.viewport.scale);
                self.selection
                    .begin_paint(at, &self.detections, tolerance, modifiers.additive());
                Vec::new()
            }
            ToolKind::Select | ToolKind::PaintSelect | ToolKind::Pan => Vec::new(),
            _ => {
                self.cancel_other_tools();
                self.with_active_tool(|tool, ctx| {
                    tool.handle(
                        &ToolInput::Press {
                            at,
                            button,
                            modifiers,
                        },
                        ctx,
                    )
                })
                .unwrap_or_default()
            }
        }
    }

    fn select_press(&mut self, at: Point, modifiers: Modifiers) -> Vec<EngineEvent> {
        let additive = modifiers.additive();
        if !additive {
            let radius = self.viewport.screen_len_to_content(self.config.handle_radius);
            if let Some((detection, index)) =
                handle_at(self.selection.selection(), &self.detections, at, radius)
            {
                self.editor.begin_vertex(detection, index, at);
                return Vec::new();
            }
        }

        let tolerance = self.config.hit_tolerance(self.viewport.scale);
        let hit = self.selection.topmost(at, &self.detections, tolerance);
        let selection = self.selection.selection();
        if let Some(id) = hit.filter(|id| !additive && selection.contains(*id)) {
            // Edits need a single selected shape.
            if selection.single().is_some() {
                if let Some(detection) = self.detections.iter().find(|d| d.id == id) {
                    self.editor.begin_move(detection, at);
                }
            } else {
                self.pending_narrow = Some((id, at));
            }
            return Vec::new();
        }
        self.selection
            .select_at(at, &self.detections, tolerance, additive)
    }

    fn pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<EngineEvent> {
        self.pointer = Some((screen, modifiers));
        if let Some(last) = self.pan_drag {
            self.pan_drag = Some(screen);
            let delta = screen - last;
            if delta == Vec2::ZERO {
                return Vec::new();
            }
            self.viewport.pan_by(delta);
            return vec![self.viewport_event()];
        }

        let events = self.track_pointer(screen, modifiers);
        if self.session_active() {
            let settings = AutoPanSettings::from_config(&self.config);
            self.autopan
                .setup_by_pointer(screen, self.viewport.container, &settings);
        } else {
            self.autopan.stop();
        }
        events
    }

    /// Feed the pointer's current content position to whatever is tracking
    /// it. Also used after the viewport moves under a still pointer.
    fn track_pointer(&mut self, screen: Point, modifiers: Modifiers) -> Vec<EngineEvent> {
        let at = self.viewport.screen_to_content(screen);
        match self.tool {
            ToolKind::Select => {
                if self.editor.is_pending() {
                    self.editor.update(at, self.config.drag_threshold);
                } else {
                    self.update_hover(at);
                }
                Vec::new()
            }
            ToolKind::PaintSelect => {
                let tolerance = self.config.hit_tolerance(self.viewport.scale);
                self.selection.paint_move(at, &self.detections, tolerance);
                Vec::new()
            }
            ToolKind::Pan => Vec::new(),
            _ => self
                .with_active_tool(|tool, ctx| tool.handle(&ToolInput::Move { at, modifiers }, ctx))
                .unwrap_or_default(),
        }
    }

    fn update_hover(&mut self, at: Point) {
        let tolerance = self.config.hit_tolerance(self.viewport.scale);
        let radius = self.viewport.screen_len_to_content(self.config.handle_radius);
        self.hover = self.selection.topmost(at, &self.detections, tolerance);
        self.hover_handle =
            handle_at(self.selection.selection(), &self.detections, at, radius).is_some();
    }

    fn pointer_up(
        &mut self,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Vec<EngineEvent> {
        self.pointer = Some((screen, modifiers));
        if self.pan_drag.take().is_some() {
            return Vec::new();
        }

        let at = self.viewport.screen_to_content(screen);
        match self.tool {
            ToolKind::Select => {
                if let Some((id, origin)) = self.pending_narrow.take() {
                    if at.distance(origin) > self.config.drag_threshold {
                        return Vec::new();
                    }
                    return self.selection.set(&[id], &self.detections);
                }
                self.editor.finish(self.scale_ratio).into_iter().collect()
            }
            ToolKind::PaintSelect => self.selection.end_paint(),
            ToolKind::Pan => Vec::new(),
            _ => self
                .with_active_tool(|tool, ctx| {
                    tool.handle(
                        &ToolInput::Release {
                            at,
                            button,
                            modifiers,
                        },
                        ctx,
                    )
                })
                .unwrap_or_default(),
        }
    }

    fn wheel(&mut self, screen: Point, delta_y: f64) -> Vec<EngineEvent> {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return Vec::new();
        }
        if !self.viewport.zoom_at_pointer(screen, delta_y < 0.0) {
            return Vec::new();
        }
        let mut events = vec![self.viewport_event()];
        // Screen-space thresholds changed with the scale.
        if let Some((pointer, modifiers)) = self.pointer {
            events.extend(self.track_pointer(pointer, modifiers));
        }
        events
    }

    fn frame(&mut self) -> Vec<EngineEvent> {
        if !self.session_active() {
            self.autopan.stop();
            return Vec::new();
        }
        let Some(delta) = self.autopan.shift_viewport(&mut self.viewport) else {
            return Vec::new();
        };
        log::trace!("auto-pan frame ({:.2}, {:.2})", delta.x, delta.y);

        let mut events = vec![self.viewport_event()];
        if let Some((pointer, modifiers)) = self.pointer {
            events.extend(self.track_pointer(pointer, modifiers));
        }
        events
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers) -> Vec<EngineEvent> {
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return Vec::new();
        };
        log::trace!("shortcut {action:?}");
        match action {
            ShortcutAction::ToolSelect => self.set_tool(ToolKind::Select),
            ShortcutAction::ToolPaintSelect => self.set_tool(ToolKind::PaintSelect),
            ShortcutAction::ToolCreate => self.set_tool(ToolKind::Create),
            ShortcutAction::ToolLine => self.set_tool(ToolKind::Line),
            ShortcutAction::ToolPoint => self.set_tool(ToolKind::Point),
            ShortcutAction::ToolCalibrate => self.set_tool(ToolKind::Calibrate),
            ShortcutAction::ToolSplit => self.set_tool(ToolKind::Split),
            ShortcutAction::ToolPan => self.set_tool(ToolKind::Pan),

            ShortcutAction::Complete => self
                .with_active_tool(|tool, ctx| tool.complete(ctx))
                .unwrap_or_default(),
            ShortcutAction::UndoVertex => {
                self.undo_vertex();
                Vec::new()
            }
            ShortcutAction::Delete => {
                if self.undo_vertex() {
                    return Vec::new();
                }
                self.delete_selection()
            }
            ShortcutAction::Cancel => self.cancel(),

            ShortcutAction::SelectAll => {
                if self.has_transient_state() {
                    return Vec::new();
                }
                self.selection.select_all(&self.detections)
            }
            ShortcutAction::ZoomIn => self.zoom_step(true),
            ShortcutAction::ZoomOut => self.zoom_step(false),
            ShortcutAction::ZoomToFit => self.zoom_to_fit(),
            ShortcutAction::PanStart => {
                self.space_held = true;
                Vec::new()
            }
            ShortcutAction::PanEnd => {
                self.space_held = false;
                Vec::new()
            }
        }
    }

    /// Drop the last vertex of the active drawing session.
    pub fn undo_vertex(&mut self) -> bool {
        match self.tool {
            ToolKind::Create => self.create_tool.undo_vertex(),
            ToolKind::Split => self.split_tool.undo_vertex(),
            ToolKind::Line => self.line_tool.undo_vertex(),
            ToolKind::Calibrate => self.calibrate_tool.undo_vertex(),
            _ => false,
        }
    }

    /// Ask the host to delete every selected detection.
    pub fn delete_selection(&mut self) -> Vec<EngineEvent> {
        if self.has_transient_state() || self.selection.selection().is_empty() {
            return Vec::new();
        }
        let ids = self.selection.selection().ids().to_vec();
        log::debug!("delete requested for {} detection(s)", ids.len());
        let mut events = vec![EngineEvent::DetectionDeleteRequested { ids }];
        events.extend(self.selection.clear());
        events
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn viewport_event(&self) -> EngineEvent {
        EngineEvent::ViewportChanged {
            scale: self.viewport.scale,
            offset: self.viewport.offset,
        }
    }

    fn active_tool(&self) -> Option<&dyn Tool> {
        match self.tool {
            ToolKind::Create => Some(&self.create_tool),
            ToolKind::Split => Some(&self.split_tool),
            ToolKind::Line => Some(&self.line_tool),
            ToolKind::Point => Some(&self.point_tool),
            ToolKind::Calibrate => Some(&self.calibrate_tool),
            ToolKind::Select | ToolKind::PaintSelect | ToolKind::Pan => None,
        }
    }

    /// Run `f` on the active drawing tool with a context built from the
    /// engine's other fields.
    fn with_active_tool<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Tool, &ToolContext<'_>) -> R,
    ) -> Option<R> {
        let ctx = ToolContext {
            scale: self.viewport.scale,
            scale_ratio: self.scale_ratio,
            class: &self.active_class,
            split_target: split_target(self.selection.selection(), &self.detections),
            config: &self.config,
        };
        let tool: &mut dyn Tool = match self.tool {
            ToolKind::Create => &mut self.create_tool,
            ToolKind::Split => &mut self.split_tool,
            ToolKind::Line => &mut self.line_tool,
            ToolKind::Point => &mut self.point_tool,
            ToolKind::Calibrate => &mut self.calibrate_tool,
            ToolKind::Select | ToolKind::PaintSelect | ToolKind::Pan => return None,
        };
        Some(f(tool, &ctx))
    }

    fn all_tools_mut(&mut self) -> [&mut dyn Tool; 5] {
        [
            &mut self.create_tool,
            &mut self.split_tool,
            &mut self.line_tool,
            &mut self.point_tool,
            &mut self.calibrate_tool,
        ]
    }

    /// Clear leftovers of tools other than the active one (an abandoned
    /// calibration point, a stale edit) before a new session starts.
    fn cancel_other_tools(&mut self) {
        let active = self.tool;
        for tool in self.all_tools_mut() {
            if tool.kind() != active {
                tool.cancel();
            }
        }
        self.selection.cancel_paint();
        self.editor.cancel();
    }

    fn cancel_all(&mut self) {
        for tool in self.all_tools_mut() {
            tool.cancel();
        }
        self.selection.cancel_paint();
        self.editor.cancel();
        self.autopan.stop();
        self.pan_drag = None;
        self.pending_narrow = None;
    }

    fn has_transient_state(&self) -> bool {
        self.active_tool().is_some_and(|t| t.is_active())
            || self.selection.is_painting()
            || self.editor.is_pending()
            || self.pan_drag.is_some()
            || self.pending_narrow.is_some()
    }

    fn gestures_in_progress(&self) -> usize {
        let tools = [
            self.create_tool.session().is_some(),
            self.split_tool.session().is_some(),
            self.line_tool.session().is_some(),
            self.calibrate_tool.is_active(),
        ];
        tools.into_iter().filter(|b| *b).count()
            + usize::from(self.selection.is_painting())
            + usize::from(self.editor.is_pending())
    }
}

/// Vertex handle under `at`. Handles exist only while exactly one live
/// detection is selected.
fn handle_at<'a>(
    selection: &Selection,
    detections: &'a [Detection],
    at: Point,
    radius: f64,
) -> Option<(&'a Detection, usize)> {
    let id = selection.single()?;
    let detection = detections.iter().find(|d| d.id == id && !d.is_deleted())?;
    hit_vertex(at, detection, radius).map(|index| (detection, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use takeoff_core::Shape;

    fn engine() -> Engine {
        let mut engine = Engine::default();
        engine.set_scale_ratio(64.0);
        engine.set_active_class("drywall");
        engine.set_tool(ToolKind::Create);
        engine
    }

    fn click(engine: &mut Engine, x: f64, y: f64) -> Vec<EngineEvent> {
        let mut events = engine.apply(InputEvent::pointer_down(x, y));
        events.extend(engine.apply(InputEvent::pointer_up(x, y)));
        events
    }

    #[test]
    fn tool_change_cancels_session() {
        let mut engine = engine();
        click(&mut engine, 10.0, 10.0);
        click(&mut engine, 100.0, 10.0);
        assert!(engine.session().is_some());

        let events = engine.set_tool(ToolKind::Line);
        assert_eq!(events, vec![EngineEvent::ToolChanged { tool: ToolKind::Line }]);
        assert!(engine.session().is_none());
        engine.set_tool(ToolKind::Create);
        assert!(engine.session().is_none(), "the old polygon does not come back");
    }

    #[test]
    fn same_tool_is_not_a_change() {
        let mut engine = engine();
        assert!(engine.set_tool(ToolKind::Create).is_empty());
    }

    #[test]
    fn abandoned_calibration_point_is_cleared() {
        let mut engine = engine();
        engine.set_tool(ToolKind::Calibrate);
        click(&mut engine, 5.0, 5.0);
        assert!(engine.calibration().point_a.is_some());
        engine.set_tool(ToolKind::Create);
        assert_eq!(*engine.calibration(), CalibrationState::default());
    }

    #[test]
    fn escape_cancels_then_clears_selection() {
        let mut engine = engine();
        let shape = Shape::rectangle(Point::new(0.0, 0.0), Point::new(50.0, 50.0)).unwrap();
        engine.set_detections(vec![Detection::new(DetectionId::new("eng_a"), "x", shape, 64.0)]);
        engine.select_ids(&[DetectionId::new("eng_a")]);

        click(&mut engine, 200.0, 200.0);
        assert!(engine.session().is_some());
        assert!(engine.apply(InputEvent::key("Escape")).is_empty());
        assert!(engine.session().is_none());
        assert_eq!(engine.selection().len(), 1);

        let events = engine.apply(InputEvent::key("Escape"));
        assert_eq!(
            events,
            vec![EngineEvent::SelectionChanged {
                selected_ids: vec![],
                primary_id: None
            }]
        );
    }

    #[test]
    fn wheel_zoom_emits_viewport_change() {
        let mut engine = engine();
        let events = engine.apply(InputEvent::Wheel {
            x: 100.0,
            y: 100.0,
            delta_y: -1.0,
            modifiers: Modifiers::NONE,
        });
        assert!(matches!(
            events.as_slice(),
            [EngineEvent::ViewportChanged { scale, .. }] if (*scale - 1.1).abs() < 1e-12
        ));
        let anchor = engine.viewport().screen_to_content(Point::new(100.0, 100.0));
        assert!(anchor.distance(Point::new(100.0, 100.0)) < 1e-9);
    }

    #[test]
    fn middle_drag_pans_without_touching_the_session() {
        let mut engine = engine();
        engine.apply(InputEvent::PointerDown {
            x: 10.0,
            y: 10.0,
            button: PointerButton::Middle,
            modifiers: Modifiers::NONE,
        });
        assert_eq!(engine.cursor_hint(), CursorHint::Grabbing);
        let events = engine.apply(InputEvent::pointer_move(30.0, 5.0));
        assert_eq!(
            events,
            vec![EngineEvent::ViewportChanged {
                scale: 1.0,
                offset: Vec2::new(20.0, -5.0)
            }]
        );
        engine.apply(InputEvent::PointerUp {
            x: 30.0,
            y: 5.0,
            button: PointerButton::Middle,
            modifiers: Modifiers::NONE,
        });
        assert!(engine.session().is_none());
        assert_eq!(engine.cursor_hint(), CursorHint::Crosshair);
    }

    #[test]
    fn cursor_shows_close_affordance() {
        let mut engine = engine();
        for (x, y) in [(100.0, 100.0), (200.0, 100.0), (200.0, 200.0)] {
            click(&mut engine, x, y);
        }
        engine.apply(InputEvent::pointer_move(104.0, 103.0));
        assert_eq!(engine.cursor_hint(), CursorHint::Pointer);
        engine.apply(InputEvent::pointer_move(150.0, 180.0));
        assert_eq!(engine.cursor_hint(), CursorHint::Crosshair);
    }

    #[test]
    fn split_cursor_needs_target() {
        let mut engine = engine();
        engine.set_tool(ToolKind::Split);
        assert_eq!(engine.cursor_hint(), CursorHint::NotAllowed);
    }

    #[test]
    fn calibration_sets_ratio_and_remeasures() {
        let mut engine = engine();
        let shape = Shape::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 100.0)).unwrap();
        engine.set_detections(vec![Detection::new(DetectionId::new("eng_cal"), "x", shape, 1.0)]);
        assert_eq!(engine.apply_calibration(500.0, 10.0), Some(50.0));
        assert_eq!(engine.detections()[0].measurements.area_sf, 4.0);
        assert_eq!(engine.apply_calibration(500.0, 0.0), None);
        assert_eq!(engine.scale_ratio(), 50.0);
    }

    #[test]
    fn unusable_candidates_are_dropped() {
        let mut engine = engine();
        let candidate = |class: &str, n: usize| CandidatePolygon {
            points: (0..n).map(|i| Point::new(i as f64 * 10.0, (i % 2) as f64 * 10.0)).collect(),
            class: class.to_string(),
            confidence: 0.9,
        };
        engine.set_candidates(vec![candidate("kept", 3), candidate("sliver", 2)]);
        assert_eq!(engine.candidates().len(), 1);
        assert_eq!(engine.candidates()[0].class, "kept");
        assert_eq!(engine.take_candidates().len(), 1);
        assert!(engine.candidates().is_empty());
    }

    #[test]
    fn handle_radius_is_screen_sized() {
        let mut engine = engine();
        engine.set_tool(ToolKind::Select);
        let shape = Shape::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 100.0)).unwrap();
        engine.set_detections(vec![Detection::new(DetectionId::new("eng_h"), "x", shape, 64.0)]);
        engine.select_ids(&[DetectionId::new("eng_h")]);
        engine.zoom_step(true);
        engine.zoom_step(true);
        // 8 screen px at scale 1.21 is under 7 content px.
        let corner = engine.viewport().content_to_screen(Point::new(100.0, 100.0));
        engine.apply(InputEvent::pointer_move(corner.x + 9.0, corner.y));
        assert_eq!(engine.cursor_hint(), CursorHint::Default);
        engine.apply(InputEvent::pointer_move(corner.x + 7.0, corner.y));
        assert_eq!(engine.cursor_hint(), CursorHint::Move);
    }

    #[test]
    fn cursor_css_names() {
        assert_eq!(CursorHint::NotAllowed.css(), "not-allowed");
        assert_eq!(
            serde_json::to_value(CursorHint::NotAllowed).unwrap(),
            serde_json::json!("not-allowed")
        );
    }
}
