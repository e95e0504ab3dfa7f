//! Engine configuration.
//!
//! Every field has a default, so a host may pass `{}` or only the values it
//! wants to override. Screen-space values are converted to content space
//! at the current zoom when used.

use serde::{Deserialize, Serialize};
use takeoff_core::{HitTolerance, ScaleLimits};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tunables for drawing, hit testing, auto-pan, and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Screen-px radius around the first vertex that closes a polygon.
    pub close_threshold: f64,
    /// Content-px movement that turns a press into a drag.
    pub drag_threshold: f64,
    /// Shift-snap angle step, in degrees.
    pub snap_increment_deg: f64,
    /// Below this content distance from the last vertex, Shift does not snap.
    pub snap_min_distance: f64,
    /// Screen-px half-size of a point marker's hit square.
    pub point_hit_radius: f64,
    /// Screen-px distance from a line that still hits it.
    pub line_hit_tolerance: f64,
    /// Screen-px radius of vertex handles on selected shapes.
    pub handle_radius: f64,
    /// Screen-px band along the container edges that triggers auto-pan.
    pub edge_threshold: f64,
    /// Auto-pan speed (px/frame) at the inner edge of the band.
    pub pan_speed_base: f64,
    /// Auto-pan speed (px/frame) at the container edge.
    pub pan_speed_max: f64,
    /// Screen-px margin kept around the image on fit-to-container.
    pub fit_padding: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Per-step wheel zoom factor.
    pub zoom_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            close_threshold: 15.0,
            drag_threshold: 5.0,
            snap_increment_deg: 45.0,
            snap_min_distance: 5.0,
            point_hit_radius: 8.0,
            line_hit_tolerance: 6.0,
            handle_radius: 8.0,
            edge_threshold: 50.0,
            pan_speed_base: 2.0,
            pan_speed_max: 20.0,
            fit_padding: 20.0,
            min_scale: 0.1,
            max_scale: 10.0,
            zoom_factor: 1.1,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("closeThreshold", self.close_threshold),
            ("snapIncrementDeg", self.snap_increment_deg),
            ("pointHitRadius", self.point_hit_radius),
            ("lineHitTolerance", self.line_hit_tolerance),
            ("handleRadius", self.handle_radius),
            ("edgeThreshold", self.edge_threshold),
            ("minScale", self.min_scale),
            ("maxScale", self.max_scale),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive number",
                });
            }
        }

        let non_negative = [
            ("dragThreshold", self.drag_threshold),
            ("snapMinDistance", self.snap_min_distance),
            ("panSpeedBase", self.pan_speed_base),
            ("panSpeedMax", self.pan_speed_max),
            ("fitPadding", self.fit_padding),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be zero or positive",
                });
            }
        }

        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid {
                field: "minScale",
                reason: "must not exceed maxScale",
            });
        }
        if self.pan_speed_base > self.pan_speed_max {
            return Err(ConfigError::Invalid {
                field: "panSpeedBase",
                reason: "must not exceed panSpeedMax",
            });
        }
        if !(self.zoom_factor.is_finite() && self.zoom_factor > 1.0) {
            return Err(ConfigError::Invalid {
                field: "zoomFactor",
                reason: "must be greater than 1",
            });
        }
        Ok(())
    }

    pub fn scale_limits(&self) -> ScaleLimits {
        ScaleLimits {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            zoom_factor: self.zoom_factor,
        }
    }

    /// Hit tolerances in content space at viewport `scale`.
    pub fn hit_tolerance(&self, scale: f64) -> HitTolerance {
        HitTolerance {
            point_radius: self.point_hit_radius / scale,
            line_tolerance: self.line_hit_tolerance / scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = EngineConfig::from_json(r#"{"closeThreshold": 20, "maxScale": 4}"#).unwrap();
        assert_eq!(config.close_threshold, 20.0);
        assert_eq!(config.max_scale, 4.0);
        assert_eq!(config.drag_threshold, 5.0);
    }

    #[test]
    fn rejects_inverted_scale_limits() {
        let err = EngineConfig::from_json(r#"{"minScale": 5, "maxScale": 2}"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid config: minScale must not exceed maxScale");
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let err = EngineConfig::from_json(r#"{"edgeThreshold": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "edgeThreshold",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            EngineConfig::from_json("{nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn hit_tolerance_shrinks_when_zoomed_in() {
        let tol = EngineConfig::default().hit_tolerance(2.0);
        assert_eq!(tol.point_radius, 4.0);
        assert_eq!(tol.line_tolerance, 3.0);
    }
}
