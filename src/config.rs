//! Dashboard configuration.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! classifier layout: 2×16 grids for every layer except layer index 2, which is
//! a labeled 1×10 grid.

use std::path::Path;

use serde::Deserialize;

use crate::error::{DashboardError, DashboardResult};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8888";

/// Grid shape used to lay out one layer's activations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    /// Caption each cell with its class name (or index).
    pub labeled: bool,
    /// Optional names for labeled cells; cell `i` falls back to `i`.
    pub class_names: Vec<String>,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, labeled: bool) -> Self {
        Self {
            rows,
            cols,
            labeled,
            class_names: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Label for cell `idx`, only for labeled grids.
    pub fn label_for(&self, idx: usize) -> Option<String> {
        if !self.labeled {
            return None;
        }
        Some(
            self.class_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string()),
        )
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new(2, 16, false)
    }
}

/// A per-layer override in the grid policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerGrid {
    /// Zero-based layer index in the response.
    pub layer: usize,
    #[serde(flatten)]
    pub grid: GridSpec,
}

/// Maps a layer index to the grid it is drawn in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridPolicy {
    pub default: GridSpec,
    pub layers: Vec<LayerGrid>,
}

impl GridPolicy {
    pub fn for_layer(&self, layer: usize) -> &GridSpec {
        self.layers
            .iter()
            .find(|l| l.layer == layer)
            .map(|l| &l.grid)
            .unwrap_or(&self.default)
    }
}

impl Default for GridPolicy {
    fn default() -> Self {
        Self {
            default: GridSpec::default(),
            layers: vec![LayerGrid {
                layer: 2,
                grid: GridSpec::new(1, 10, true),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoint: String,
    /// Display width of the input image in points; height keeps the aspect.
    pub image_width: f32,
    /// Side of one uniform tile on screen.
    pub cell_size: f32,
    /// Gap between neighbouring tiles.
    pub cell_spacing: f32,
    pub log_level: String,
    pub grid: GridPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            image_width: 150.0,
            cell_size: 40.0,
            cell_spacing: 2.0,
            log_level: "info".to_string(),
            grid: GridPolicy::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> DashboardResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> DashboardResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DashboardError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(DashboardError::config("endpoint must not be empty"));
        }
        if !self.image_width.is_finite() || self.image_width <= 0.0 {
            return Err(DashboardError::config("image_width must be finite and positive"));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(DashboardError::config("cell_size must be finite and positive"));
        }
        if !self.cell_spacing.is_finite() || self.cell_spacing < 0.0 {
            return Err(DashboardError::config("cell_spacing must be finite and non-negative"));
        }
        let grids = std::iter::once(&self.grid.default)
            .chain(self.grid.layers.iter().map(|l| &l.grid));
        for grid in grids {
            if grid.rows == 0 || grid.cols == 0 {
                return Err(DashboardError::config(format!(
                    "grid {}x{} must have at least one row and one column",
                    grid.rows, grid.cols
                )));
            }
        }
        Ok(())
    }
}
