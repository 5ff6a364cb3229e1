//! Tunable constants for the canvas engine.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::Point;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Snap grid cell size for drag-moves.
    pub grid_size: f64,
    /// Max distance from an entity center that still counts as a hit.
    pub hit_radius: f64,
    /// Max distance from an anchor circle that starts a connection drag.
    pub anchor_radius: f64,
    /// Distance from a node center to each of its anchors.
    pub anchor_offset: f64,
    /// Pointer travel on empty canvas before a drag becomes a pan.
    pub pan_threshold: f64,
    pub undo_capacity: usize,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
    /// Where the first default-placed milestone goes.
    pub milestone_origin: Point,
    /// Vertical gap between default-placed milestones.
    pub milestone_row_height: f64,
    /// Horizontal distance from a milestone to its first laid-out node.
    pub layout_offset_x: f64,
    /// Horizontal distance between laid-out nodes.
    pub layout_spacing_x: f64,
    pub autosave_delay_ms: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_size: 8.0,
            hit_radius: 50.0,
            anchor_radius: 12.0,
            anchor_offset: 50.0,
            pan_threshold: 5.0,
            undo_capacity: 50,
            zoom_min: 0.5,
            zoom_max: 3.0,
            zoom_step: 0.1,
            milestone_origin: Point::new(200.0, 200.0),
            milestone_row_height: 300.0,
            layout_offset_x: 350.0,
            layout_spacing_x: 220.0,
            autosave_delay_ms: 2000,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON object; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: CanvasConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.zoom_min > self.zoom_max {
            return Err(ConfigError::Invalid(format!(
                "zoomMin ({}) is greater than zoomMax ({})",
                self.zoom_min, self.zoom_max
            )));
        }
        // The zoom scale is kept to two decimals, so smaller steps round away.
        if !self.zoom_step.is_finite() || self.zoom_step < 0.01 {
            return Err(ConfigError::Invalid(format!(
                "zoomStep ({}) must be at least 0.01",
                self.zoom_step
            )));
        }
        if self.undo_capacity == 0 {
            return Err(ConfigError::Invalid("undoCapacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Default spot for the `index`-th milestone: stacked vertically.
    pub fn default_milestone_position(&self, index: usize) -> Point {
        Point::new(
            self.milestone_origin.x,
            self.milestone_origin.y + index as f64 * self.milestone_row_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = CanvasConfig::from_json(r#"{"gridSize": 16, "undoCapacity": 5}"#).unwrap();
        assert_eq!(cfg.grid_size, 16.0);
        assert_eq!(cfg.undo_capacity, 5);
        assert_eq!(cfg.hit_radius, 50.0);
        assert_eq!(cfg.milestone_origin, Point::new(200.0, 200.0));
    }

    #[test]
    fn test_rejects_inverted_zoom_bounds() {
        let err = CanvasConfig::from_json(r#"{"zoomMin": 4.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zoom_step_below_rounding() {
        let err = CanvasConfig::from_json(r#"{"zoomStep": 0.001}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(CanvasConfig::from_json(r#"{"zoomStep": 0.01}"#).is_ok());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(CanvasConfig::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_default_milestone_positions() {
        let cfg = CanvasConfig::default();
        assert_eq!(cfg.default_milestone_position(0), Point::new(200.0, 200.0));
        assert_eq!(cfg.default_milestone_position(1), Point::new(200.0, 500.0));
    }
}
