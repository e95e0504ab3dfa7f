//! Events emitted by the engine.
//!
//! The engine never touches persistence: every committed change leaves as
//! an `EngineEvent` and comes back, once the host has applied it, through
//! `Engine::set_detections`.

use crate::tools::ToolKind;
use kurbo::{Point, Vec2};
use serde::Serialize;
use takeoff_core::{DetectionId, MarkupType, Measurements, Shape};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    DetectionCreateRequested {
        geometry: Shape,
        class: String,
        markup_type: MarkupType,
        measurements: Measurements,
    },
    DetectionUpdateRequested {
        id: DetectionId,
        new_geometry: Shape,
        new_measurements: Measurements,
    },
    DetectionDeleteRequested {
        ids: Vec<DetectionId>,
    },
    SelectionChanged {
        selected_ids: Vec<DetectionId>,
        primary_id: Option<DetectionId>,
    },
    CalibrationComplete {
        point_a: Point,
        point_b: Point,
        pixel_distance: f64,
    },
    SplitRequested {
        original_id: DetectionId,
        cutting_polygon: Vec<Point>,
    },
    ViewportChanged {
        scale: f64,
        offset: Vec2,
    },
    ToolChanged {
        tool: ToolKind,
    },
}

impl EngineEvent {
    /// A create request for `shape`, measured at `scale_ratio`.
    pub fn create(shape: Shape, class: &str, scale_ratio: f64) -> Self {
        EngineEvent::DetectionCreateRequested {
            markup_type: shape.markup_type(),
            measurements: Measurements::for_shape(&shape, scale_ratio),
            geometry: shape,
            class: class.to_string(),
        }
    }

    /// An update request for detection `id`, measured at `scale_ratio`.
    pub fn update(id: DetectionId, shape: Shape, scale_ratio: f64) -> Self {
        EngineEvent::DetectionUpdateRequested {
            id,
            new_measurements: Measurements::for_shape(&shape, scale_ratio),
            new_geometry: shape,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::DetectionCreateRequested { .. } => "detectionCreateRequested",
            EngineEvent::DetectionUpdateRequested { .. } => "detectionUpdateRequested",
            EngineEvent::DetectionDeleteRequested { .. } => "detectionDeleteRequested",
            EngineEvent::SelectionChanged { .. } => "selectionChanged",
            EngineEvent::CalibrationComplete { .. } => "calibrationComplete",
            EngineEvent::SplitRequested { .. } => "splitRequested",
            EngineEvent::ViewportChanged { .. } => "viewportChanged",
            EngineEvent::ToolChanged { .. } => "toolChanged",
        }
    }
}
