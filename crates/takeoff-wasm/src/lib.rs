//! WASM bridge for Plan Takeoff — exposes the annotation engine to the
//! JavaScript plan viewer.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards raw DOM
//! events to a [`TakeoffCanvas`]; every handler returns the emitted engine
//! events as a JSON array, and the renderer reads state back through the
//! `get_*_json` accessors.

use serde::Serialize;
use takeoff_core::{CandidatePolygon, Detection, DetectionId, Measurements, Point, Shape, Vec2};
use takeoff_editor::{
    CalibrationState, DrawingSession, Engine, EngineConfig, EngineEvent, InputEvent, Modifiers,
    PointerButton, ToolKind,
};
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas controller.
#[wasm_bindgen]
pub struct TakeoffCanvas {
    engine: Engine,
}

#[wasm_bindgen]
impl TakeoffCanvas {
    /// Create a controller for a canvas element of the given size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let mut engine = Engine::default();
        engine.set_container(width, height);
        Self { engine }
    }

    /// The canvas element was resized.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.engine.set_container(width, height);
    }

    // ─── Host data ───────────────────────────────────────────────────────

    /// Replace the engine configuration from (possibly partial) JSON.
    /// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn set_config_json(&mut self, json: &str) -> String {
        let result = EngineConfig::from_json(json).and_then(|c| self.engine.set_config(c));
        match result {
            Ok(()) => ok_json(),
            Err(e) => {
                log::warn!("config rejected: {e}");
                error_json(e)
            }
        }
    }

    /// A new page image of the given pixel size. Returns events JSON.
    pub fn load_image(&mut self, width: f64, height: f64) -> String {
        events_json(&self.engine.load_image(width, height))
    }

    pub fn set_scale_ratio(&mut self, scale_ratio: f64) {
        self.engine.set_scale_ratio(scale_ratio);
    }

    pub fn get_scale_ratio(&self) -> f64 {
        self.engine.scale_ratio()
    }

    /// Turn a finished calibration line into a scale ratio.
    /// Returns `{"ok":true,"scaleRatio":n}` or `{"ok":false,"error":"..."}`.
    pub fn apply_calibration(&mut self, pixel_distance: f64, real_feet: f64) -> String {
        match self.engine.apply_calibration(pixel_distance, real_feet) {
            Some(ratio) => serde_json::json!({ "ok": true, "scaleRatio": ratio }).to_string(),
            None => {
                log::warn!("calibration rejected: {pixel_distance} px over {real_feet} ft");
                error_json("calibration needs a positive distance and length")
            }
        }
    }

    pub fn set_active_class(&mut self, class: &str) {
        self.engine.set_active_class(class);
    }

    /// Replace the detection list from the persistence wire format.
    /// Returns `{"ok":true,"events":[...]}` or `{"ok":false,"error":"..."}`.
    pub fn set_detections_json(&mut self, json: &str) -> String {
        match serde_json::from_str::<Vec<Detection>>(json) {
            Ok(detections) => {
                let events = self.engine.set_detections(detections);
                ok_events_json(&events)
            }
            Err(e) => {
                log::warn!("detections rejected: {e}");
                error_json(e)
            }
        }
    }

    /// Detections as the engine measured them, in wire format.
    pub fn get_detections_json(&self) -> String {
        to_json_or(self.engine.detections(), "[]")
    }

    /// Replace the candidate overlays. Returns `{"ok":true}` or an error.
    pub fn set_candidates_json(&mut self, json: &str) -> String {
        match serde_json::from_str::<Vec<CandidatePolygon>>(json) {
            Ok(candidates) => {
                self.engine.set_candidates(candidates);
                ok_json()
            }
            Err(e) => {
                log::warn!("candidates rejected: {e}");
                error_json(e)
            }
        }
    }

    /// Measurement labels for live detections: id, anchor point (polygon
    /// centroid, line midpoint, or the point) and measurements.
    pub fn get_labels_json(&self) -> String {
        let labels: Vec<serde_json::Value> = self
            .engine
            .detections()
            .iter()
            .filter(|d| !d.is_deleted())
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "anchor": d.shape.anchor(),
                    "markupType": d.markup_type(),
                    "measurements": d.measurements,
                })
            })
            .collect();
        to_json_or(&labels, "[]")
    }

    pub fn get_candidates_json(&self) -> String {
        to_json_or(self.engine.candidates(), "[]")
    }

    /// Remove and return the candidate overlays, e.g. to confirm them.
    pub fn take_candidates_json(&mut self) -> String {
        to_json_or(&self.engine.take_candidates(), "[]")
    }

    pub fn clear_candidates(&mut self) {
        self.engine.clear_candidates();
    }

    /// Select detections by id from a JSON string array. Returns events JSON.
    pub fn select_ids_json(&mut self, json: &str) -> String {
        match serde_json::from_str::<Vec<DetectionId>>(json) {
            Ok(ids) => events_json(&self.engine.select_ids(&ids)),
            Err(e) => {
                log::warn!("selection rejected: {e}");
                "[]".to_string()
            }
        }
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    /// Switch tool by name (`select`, `paintSelect`, `create`, `line`,
    /// `point`, `calibrate`, `split`, `pan`). Returns events JSON.
    pub fn set_tool(&mut self, name: &str) -> String {
        match ToolKind::from_name(name) {
            Some(kind) => events_json(&self.engine.set_tool(kind)),
            None => {
                log::warn!("unknown tool '{name}'");
                "[]".to_string()
            }
        }
    }

    pub fn get_tool(&self) -> String {
        self.engine.tool().name().to_string()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// `button` is the DOM `PointerEvent.button` value.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::PointerMove {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::PointerUp {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_double_click(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::DoubleClick {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_wheel(
        &mut self,
        x: f64,
        y: f64,
        delta_y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::Wheel {
            x,
            y,
            delta_y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    /// `key` is the DOM `KeyboardEvent.key` value.
    pub fn handle_key_down(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::KeyDown {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_key_up(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.apply(InputEvent::KeyUp {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_pointer_leave(&mut self) -> String {
        self.apply(InputEvent::PointerLeave)
    }

    /// One animation frame. Call while [`Self::needs_frame`] is true.
    pub fn frame(&mut self) -> String {
        self.apply(InputEvent::Frame)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> String {
        events_json(&self.engine.zoom_step(true))
    }

    pub fn zoom_out(&mut self) -> String {
        events_json(&self.engine.zoom_step(false))
    }

    pub fn zoom_to_fit(&mut self) -> String {
        events_json(&self.engine.zoom_to_fit())
    }

    /// Escape: cancel the gesture in progress, else clear the selection.
    pub fn cancel(&mut self) -> String {
        events_json(&self.engine.cancel())
    }

    /// Returns `true` if a vertex was removed (or the session cancelled).
    pub fn undo_vertex(&mut self) -> bool {
        self.engine.undo_vertex()
    }

    pub fn delete_selection(&mut self) -> String {
        events_json(&self.engine.delete_selection())
    }

    // ─── Render state ────────────────────────────────────────────────────

    pub fn needs_frame(&self) -> bool {
        self.engine.needs_frame()
    }

    pub fn session_active(&self) -> bool {
        self.engine.session_active()
    }

    /// CSS cursor value for the canvas element.
    pub fn cursor_hint(&self) -> String {
        self.engine.cursor_hint().css().to_string()
    }

    pub fn get_viewport_json(&self) -> String {
        let viewport = self.engine.viewport();
        serde_json::json!({
            "scale": viewport.scale,
            "offset": viewport.offset,
            "container": viewport.container,
            "imageSize": self.engine.image_size(),
        })
        .to_string()
    }

    /// The active drawing session, or `null`.
    pub fn get_session_json(&self) -> String {
        to_json_or(&self.engine.session(), "null")
    }

    pub fn get_calibration_json(&self) -> String {
        let calibration = self.engine.calibration();
        serde_json::json!({
            "pointA": calibration.point_a,
            "pointB": calibration.point_b,
            "pixelDistance": calibration.pixel_distance(),
        })
        .to_string()
    }

    /// Highlighted selection (provisional while paint-selecting).
    pub fn get_selection_json(&self) -> String {
        let selection = self.engine.selection();
        serde_json::json!({
            "selectedIds": selection.ids(),
            "primaryId": selection.primary(),
        })
        .to_string()
    }

    /// Preview geometry of a vertex/move edit, or `null`.
    pub fn get_edit_preview_json(&self) -> String {
        match self.engine.edit_preview() {
            Some(edit) => serde_json::json!({
                "id": edit.id,
                "geometry": edit.preview,
            })
            .to_string(),
            None => "null".to_string(),
        }
    }

    /// Everything a frame of the renderer needs, in one call.
    pub fn get_state_json(&self) -> String {
        let selection = self.engine.selection();
        let state = RenderState {
            tool: self.engine.tool(),
            cursor: self.engine.cursor_hint().css(),
            scale: self.engine.viewport().scale,
            offset: self.engine.viewport().offset,
            scale_ratio: self.engine.scale_ratio(),
            selected_ids: selection.ids(),
            primary_id: selection.primary(),
            hover_id: self.engine.hover(),
            session: self.engine.session(),
            calibration: self.engine.calibration(),
            needs_frame: self.engine.needs_frame(),
        };
        to_json_or(&state, "{}")
    }
}

impl TakeoffCanvas {
    fn apply(&mut self, event: InputEvent) -> String {
        events_json(&self.engine.apply(event))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderState<'a> {
    tool: ToolKind,
    cursor: &'static str,
    scale: f64,
    offset: Vec2,
    scale_ratio: f64,
    selected_ids: &'a [DetectionId],
    primary_id: Option<DetectionId>,
    hover_id: Option<DetectionId>,
    session: Option<&'a DrawingSession>,
    calibration: &'a CalibrationState,
    needs_frame: bool,
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn events_json(events: &[EngineEvent]) -> String {
    to_json_or(events, "[]")
}

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn ok_events_json(events: &[EngineEvent]) -> String {
    serde_json::json!({ "ok": true, "events": events }).to_string()
}

fn error_json(error: impl std::fmt::Display) -> String {
    serde_json::json!({ "ok": false, "error": error.to_string() }).to_string()
}

fn to_json_or<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::warn!("serialization failed: {e}");
        fallback.to_string()
    })
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Takeoff WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a detection list in wire format.
/// Returns `{"ok":true,"count":n}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_detections(json: &str) -> String {
    match serde_json::from_str::<Vec<Detection>>(json) {
        Ok(detections) => serde_json::json!({ "ok": true, "count": detections.len() }).to_string(),
        Err(e) => error_json(e),
    }
}

/// Area and perimeter of a polygon given as a JSON point array, at
/// `scale_ratio` pixels per foot. Returns measurements JSON or an error.
#[wasm_bindgen]
pub fn measure_polygon(points_json: &str, scale_ratio: f64) -> String {
    let points: Vec<Point> = match serde_json::from_str(points_json) {
        Ok(points) => points,
        Err(e) => return error_json(e),
    };
    match Shape::polygon(points) {
        Ok(shape) => {
            let measurements = Measurements::for_shape(&shape, scale_ratio);
            serde_json::json!({ "ok": true, "measurements": measurements }).to_string()
        }
        Err(e) => error_json(e),
    }
}
