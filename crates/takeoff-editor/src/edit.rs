//! Direct manipulation of selected detections in the select tool:
//! dragging a single vertex/endpoint, or moving the whole shape.

use crate::events::EngineEvent;
use kurbo::Point;
use takeoff_core::{Detection, DetectionId, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Dragging vertex `n` of the outer ring (or endpoint `n` of a line).
    Vertex(usize),
    /// Translating the whole shape.
    Move,
}

/// An edit in progress. `preview` is what the renderer draws instead of
/// the stored geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeEdit {
    pub id: DetectionId,
    pub kind: EditKind,
    pub original: Shape,
    pub preview: Shape,
    origin: Point,
    /// A move only takes effect once the pointer passes the drag threshold.
    armed: bool,
}

#[derive(Default)]
pub struct ShapeEditor {
    edit: Option<ShapeEdit>,
}

impl ShapeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ShapeEdit> {
        self.edit.as_ref()
    }

    /// Whether an edit is visibly under way (a pressed-but-unmoved body
    /// move does not count).
    pub fn is_active(&self) -> bool {
        self.edit.as_ref().is_some_and(|e| e.armed)
    }

    pub fn is_pending(&self) -> bool {
        self.edit.is_some()
    }

    pub fn begin_vertex(&mut self, detection: &Detection, index: usize, at: Point) {
        log::debug!("vertex {index} drag on {:?}", detection.id);
        self.edit = Some(ShapeEdit {
            id: detection.id,
            kind: EditKind::Vertex(index),
            original: detection.shape.clone(),
            preview: detection.shape.clone(),
            origin: at,
            armed: true,
        });
    }

    pub fn begin_move(&mut self, detection: &Detection, at: Point) {
        self.edit = Some(ShapeEdit {
            id: detection.id,
            kind: EditKind::Move,
            original: detection.shape.clone(),
            preview: detection.shape.clone(),
            origin: at,
            armed: false,
        });
    }

    /// Follow the pointer. Returns whether the preview changed.
    pub fn update(&mut self, at: Point, drag_threshold: f64) -> bool {
        let Some(edit) = self.edit.as_mut() else {
            return false;
        };
        let next = match edit.kind {
            EditKind::Vertex(index) => edit.original.with_vertex(index, at),
            EditKind::Move => {
                if !edit.armed && at.distance(edit.origin) <= drag_threshold {
                    return false;
                }
                if !edit.armed {
                    log::debug!("move drag on {:?}", edit.id);
                }
                edit.armed = true;
                edit.original.translated(at - edit.origin)
            }
        };
        if next == edit.preview {
            return false;
        }
        edit.preview = next;
        true
    }

    /// End the edit. Emits an update only when the geometry changed.
    pub fn finish(&mut self, scale_ratio: f64) -> Option<EngineEvent> {
        let edit = self.edit.take()?;
        if !edit.armed || edit.preview == edit.original {
            return None;
        }
        log::debug!("{:?} edited ({:?})", edit.id, edit.kind);
        Some(EngineEvent::update(edit.id, edit.preview, scale_ratio))
    }

    pub fn cancel(&mut self) {
        if self.edit.take().is_some() {
            log::debug!("edit cancelled");
        }
    }
}
