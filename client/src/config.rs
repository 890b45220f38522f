use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COLS: i32 = 100;
pub const DEFAULT_ROWS: i32 = 100;
pub const DEFAULT_BASE_CELL_PX: f64 = 8.0;
pub const DEFAULT_ZOOM_MIN: f64 = 0.1;
pub const DEFAULT_ZOOM_MAX: f64 = 6.0;
pub const DEFAULT_INITIAL_ZOOM: f64 = 1.0;
pub const DEFAULT_WHEEL_ZOOM_SENSITIVITY: f64 = 0.001;
pub const DEFAULT_KEY_ZOOM_STEP: f64 = 0.25;
pub const DEFAULT_CLICK_THRESHOLD_MOUSE_PX: f64 = 5.0;
pub const DEFAULT_CLICK_THRESHOLD_TOUCH_PX: f64 = 12.0;
pub const DEFAULT_PREFETCH_BUFFER_CELLS: i32 = 2;
pub const DEFAULT_LOD_THRESHOLD_PX: f64 = 6.0;
pub const DEFAULT_LABEL_MIN_PX: f64 = 28.0;
pub const DEFAULT_AVATAR_MIN_PX: f64 = 10.0;
pub const DEFAULT_MINIMAP_CELL_PX: f64 = 2.0;
pub const DEFAULT_FIT_PADDING: f64 = 0.05;
/// Upper bound on `cols * rows`; the block index keeps one slot per coordinate.
pub const MAX_GRID_CELLS: i64 = 2048 * 2048;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("grid size {cols}x{rows} is out of range (1 to {max} cells, at least one per axis)", max = MAX_GRID_CELLS)]
    InvalidGrid { cols: i32, rows: i32 },

    #[error("zoom range is invalid: min={min}, max={max}")]
    InvalidZoomRange { min: f64, max: f64 },

    #[error("{name} must be a positive number (got {value})")]
    InvalidCellSize { name: &'static str, value: f64 },

    #[error("{name} must be a non-negative number (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Tunables shared by the gesture, render and minimap code paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cols: i32,
    pub rows: i32,
    /// Cell edge in screen pixels at zoom 1.0.
    pub base_cell_px: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub initial_zoom: f64,
    /// Zoom change per unit of wheel delta.
    pub wheel_zoom_sensitivity: f64,
    pub key_zoom_step: f64,
    pub click_threshold_mouse_px: f64,
    pub click_threshold_touch_px: f64,
    /// Extra cells drawn around the visible range so images start loading early.
    pub prefetch_buffer_cells: i32,
    /// Below this many pixels per cell: no grid lines, labels or images.
    pub lod_threshold_px: f64,
    /// Minimum footprint width for title labels and price tags.
    pub label_min_px: f64,
    /// Minimum footprint size for the full avatar pattern; smaller draws a flat swatch.
    pub avatar_min_px: f64,
    pub minimap_cell_px: f64,
    pub fit_padding: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            base_cell_px: DEFAULT_BASE_CELL_PX,
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            initial_zoom: DEFAULT_INITIAL_ZOOM,
            wheel_zoom_sensitivity: DEFAULT_WHEEL_ZOOM_SENSITIVITY,
            key_zoom_step: DEFAULT_KEY_ZOOM_STEP,
            click_threshold_mouse_px: DEFAULT_CLICK_THRESHOLD_MOUSE_PX,
            click_threshold_touch_px: DEFAULT_CLICK_THRESHOLD_TOUCH_PX,
            prefetch_buffer_cells: DEFAULT_PREFETCH_BUFFER_CELLS,
            lod_threshold_px: DEFAULT_LOD_THRESHOLD_PX,
            label_min_px: DEFAULT_LABEL_MIN_PX,
            avatar_min_px: DEFAULT_AVATAR_MIN_PX,
            minimap_cell_px: DEFAULT_MINIMAP_CELL_PX,
            fit_padding: DEFAULT_FIT_PADDING,
        }
    }
}

impl GridConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols <= 0 || self.rows <= 0 || self.cols as i64 * self.rows as i64 > MAX_GRID_CELLS {
            return Err(ConfigError::InvalidGrid {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max && self.zoom_max.is_finite()) {
            return Err(ConfigError::InvalidZoomRange {
                min: self.zoom_min,
                max: self.zoom_max,
            });
        }
        for (name, value) in [
            ("base_cell_px", self.base_cell_px),
            ("minimap_cell_px", self.minimap_cell_px),
            ("initial_zoom", self.initial_zoom),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidCellSize { name, value });
            }
        }
        for (name, value) in [
            ("wheel_zoom_sensitivity", self.wheel_zoom_sensitivity),
            ("key_zoom_step", self.key_zoom_step),
            ("click_threshold_mouse_px", self.click_threshold_mouse_px),
            ("click_threshold_touch_px", self.click_threshold_touch_px),
            ("prefetch_buffer_cells", self.prefetch_buffer_cells as f64),
            ("lod_threshold_px", self.lod_threshold_px),
            ("label_min_px", self.label_min_px),
            ("avatar_min_px", self.avatar_min_px),
            ("fit_padding", self.fit_padding),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}
