//! Errors raised when host-supplied geometry cannot become a `Shape`.
//!
//! Interactive gestures never surface these: a malformed gesture is simply
//! ignored. They exist for the data boundary (detections loaded from the
//! persistence layer, candidate polygons from region detection).

use crate::model::MarkupType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{markup} needs at least {expected} point(s), got {found}")]
    TooFewPoints {
        markup: MarkupType,
        expected: usize,
        found: usize,
    },

    #[error("geometry contains a non-finite coordinate")]
    NonFinite,

    #[error("legacy box must have non-negative width and height (got {width} x {height})")]
    InvalidLegacyBox { width: f64, height: f64 },
}
