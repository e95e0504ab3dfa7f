//! Selection model: click select, toggle select, and paint select.
//!
//! Hit resolution is delegated to [`takeoff_core::resolve_topmost`], always
//! against the selection that is visible at that moment, so a shape that
//! is already selected keeps winning under the cursor.

use crate::events::EngineEvent;
use kurbo::Point;
use smallvec::SmallVec;
use takeoff_core::{Detection, DetectionId, HitTolerance, Shape, resolve_topmost};

/// Selected ids in selection order, plus the primary one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: SmallVec<[DetectionId; 4]>,
    primary: Option<DetectionId>,
}

impl Selection {
    pub fn ids(&self) -> &[DetectionId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<DetectionId> {
        self.primary
    }

    pub fn contains(&self, id: DetectionId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The id when exactly one shape is selected.
    pub fn single(&self) -> Option<DetectionId> {
        match self.ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Add `id` (if absent) and make it primary.
    fn insert(&mut self, id: DetectionId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
        self.primary = Some(id);
    }

    fn remove(&mut self, id: DetectionId) {
        self.ids.retain(|s| *s != id);
        if self.primary == Some(id) {
            self.primary = self.ids.last().copied();
        }
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    /// Click semantics: add mode toggles the hit, replace mode replaces
    /// with it. Empty space clears in replace mode and does nothing in add
    /// mode.
    fn apply_click(&mut self, hit: Option<DetectionId>, add: bool) {
        match (hit, add) {
            (Some(id), true) if self.contains(id) => self.remove(id),
            (Some(id), true) => self.insert(id),
            (Some(id), false) => {
                self.clear();
                self.insert(id);
            }
            (None, true) => {}
            (None, false) => self.clear(),
        }
    }

    pub fn to_event(&self) -> EngineEvent {
        EngineEvent::SelectionChanged {
            selected_ids: self.ids.to_vec(),
            primary_id: self.primary,
        }
    }
}

struct PaintSession {
    provisional: Selection,
    add_mode: bool,
}

#[derive(Default)]
pub struct SelectionManager {
    selection: Selection,
    paint: Option<PaintSession>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// What the renderer should highlight: the provisional set while
    /// painting, otherwise the committed selection.
    pub fn visible(&self) -> &Selection {
        match &self.paint {
            Some(paint) => &paint.provisional,
            None => &self.selection,
        }
    }

    pub fn is_painting(&self) -> bool {
        self.paint.is_some()
    }

    /// Topmost live detection at `point`, given the visible selection.
    pub fn topmost(
        &self,
        point: Point,
        detections: &[Detection],
        tolerance: HitTolerance,
    ) -> Option<DetectionId> {
        let visible = self.visible();
        resolve_topmost(point, detections, tolerance, visible.ids(), visible.primary())
    }

    /// Click-select at `point`. Emits `SelectionChanged` only on change.
    pub fn select_at(
        &mut self,
        point: Point,
        detections: &[Detection],
        tolerance: HitTolerance,
        add: bool,
    ) -> Vec<EngineEvent> {
        let hit = self.topmost(point, detections, tolerance);
        let mut next = self.selection.clone();
        next.apply_click(hit, add);
        self.commit(next)
    }

    // ─── Paint select ───────────────────────────────────────────────────

    /// Start a paint stroke, seeded the same way a click would be.
    pub fn begin_paint(
        &mut self,
        point: Point,
        detections: &[Detection],
        tolerance: HitTolerance,
        add: bool,
    ) {
        let hit = self.topmost(point, detections, tolerance);
        let mut provisional = self.selection.clone();
        provisional.apply_click(hit, add);
        log::debug!("paint select started ({} seeded)", provisional.len());
        self.paint = Some(PaintSession {
            provisional,
            add_mode: add,
        });
    }

    /// Add whatever is topmost under `point`. Never removes. Returns whether
    /// the provisional set grew.
    pub fn paint_move(
        &mut self,
        point: Point,
        detections: &[Detection],
        tolerance: HitTolerance,
    ) -> bool {
        let Some(paint) = self.paint.as_mut() else {
            return false;
        };
        let hit = resolve_topmost(
            point,
            detections,
            tolerance,
            paint.provisional.ids(),
            paint.provisional.primary(),
        );
        match hit {
            Some(id) if !paint.provisional.contains(id) => {
                log::trace!("paint select added {id:?}");
                paint.provisional.insert(id);
                true
            }
            _ => false,
        }
    }

    /// Commit the stroke. An empty stroke clears the selection only if it
    /// began in add mode; otherwise the selection is left alone.
    pub fn end_paint(&mut self) -> Vec<EngineEvent> {
        let Some(paint) = self.paint.take() else {
            return Vec::new();
        };
        if paint.provisional.is_empty() && !paint.add_mode {
            return Vec::new();
        }
        self.commit(paint.provisional)
    }

    pub fn cancel_paint(&mut self) {
        if self.paint.take().is_some() {
            log::debug!("paint select cancelled");
        }
    }

    // ─── Bulk operations ────────────────────────────────────────────────

    /// Select every live detection, the last one primary.
    pub fn select_all(&mut self, detections: &[Detection]) -> Vec<EngineEvent> {
        let mut next = Selection::default();
        for d in detections.iter().filter(|d| !d.is_deleted()) {
            next.insert(d.id);
        }
        self.commit(next)
    }

    pub fn clear(&mut self) -> Vec<EngineEvent> {
        self.commit(Selection::default())
    }

    /// Replace the selection with `ids`, ignoring ids that are not live.
    pub fn set(&mut self, ids: &[DetectionId], detections: &[Detection]) -> Vec<EngineEvent> {
        let mut next = Selection::default();
        for id in ids {
            if detections.iter().any(|d| d.id == *id && !d.is_deleted()) {
                next.insert(*id);
            }
        }
        self.commit(next)
    }

    /// Drop ids that vanished or were deleted from the detection list.
    pub fn retain_existing(&mut self, detections: &[Detection]) -> Vec<EngineEvent> {
        let live = |id: &DetectionId| detections.iter().any(|d| d.id == *id && !d.is_deleted());
        if let Some(paint) = self.paint.as_mut() {
            let stale: Vec<DetectionId> =
                paint.provisional.ids().iter().copied().filter(|id| !live(id)).collect();
            for id in stale {
                paint.provisional.remove(id);
            }
        }

        let mut next = self.selection.clone();
        let stale: Vec<DetectionId> = next.ids().iter().copied().filter(|id| !live(id)).collect();
        for id in stale {
            next.remove(id);
        }
        self.commit(next)
    }

    /// The single selected detection, if it is a live polygon.
    pub fn split_target<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        split_target(&self.selection, detections)
    }

    fn commit(&mut self, next: Selection) -> Vec<EngineEvent> {
        if next == self.selection {
            return Vec::new();
        }
        self.selection = next;
        log::debug!(
            "selection changed: {} selected, primary {:?}",
            self.selection.len(),
            self.selection.primary()
        );
        vec![self.selection.to_event()]
    }
}

/// Free form of [`SelectionManager::split_target`], usable while other
/// engine fields are mutably borrowed.
pub fn split_target<'a>(selection: &Selection, detections: &'a [Detection]) -> Option<&'a Detection> {
    let id = selection.single()?;
    detections
        .iter()
        .find(|d| d.id == id && !d.is_deleted() && matches!(d.shape, Shape::Polygon { .. }))
}
