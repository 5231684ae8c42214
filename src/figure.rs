//! Turns a prediction into what the dashboard draws: the input image and one
//! grid figure per layer. Nothing here touches the UI, so the layout rules can
//! be checked without a window.

use egui::{Color32, ColorImage};
use tracing::debug;

use crate::config::{DashboardConfig, GridSpec};
use crate::error::{DashboardError, DashboardResult};
use crate::model::PredictionResponse;
use crate::tensor::Tensor;

/// One activation in a layer grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub value: f32,
    pub color: Color32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerFigure {
    /// Zero-based position in the response.
    pub layer: usize,
    pub caption: String,
    pub rows: usize,
    pub cols: usize,
    pub labeled: bool,
    pub cells: Vec<Cell>,
    /// Strongest activation, tracked for labeled grids only.
    pub argmax: Option<usize>,
}

/// The decoded input image plus the size it is shown at.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub pixels: ColorImage,
    pub display_size: [f32; 2],
}

/// Everything one render cycle puts on screen.
#[derive(Debug, Clone)]
pub struct RenderedPrediction {
    pub image: InputImage,
    pub figures: Vec<LayerFigure>,
}

/// Gray level of a tile: the activation clamped to `[0, 1]` on every channel.
/// NaN is drawn black.
pub fn tile_color(value: f32) -> Color32 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let level = (v * 255.0).round() as u8;
    Color32::from_rgb(level, level, level)
}

pub fn layer_caption(layer: usize) -> String {
    format!("Layer {}", layer + 1)
}

/// Lays out one layer. The grid comes from the policy alone; the number of
/// activations only has to fit in it.
pub fn layer_figure(
    layer: usize,
    activations: Tensor,
    grid: &GridSpec,
) -> DashboardResult<LayerFigure> {
    let values = activations.squeeze();
    if values.len() > grid.capacity() {
        return Err(DashboardError::render(format!(
            "layer {} has {} activations but its {}x{} grid holds {}",
            layer + 1,
            values.len(),
            grid.rows,
            grid.cols,
            grid.capacity()
        )));
    }
    debug!(layer, rows = grid.rows, cols = grid.cols, units = values.len(), "layer grid");

    let cells = values
        .data()
        .iter()
        .enumerate()
        .map(|(index, &value)| Cell {
            index,
            row: index / grid.cols,
            col: index % grid.cols,
            value,
            color: tile_color(value),
            label: grid.label_for(index),
        })
        .collect();

    let argmax = if grid.labeled { argmax(values.data()) } else { None };

    Ok(LayerFigure {
        layer,
        caption: layer_caption(layer),
        rows: grid.rows,
        cols: grid.cols,
        labeled: grid.labeled,
        cells,
        argmax,
    })
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Converts an H×W, H×W×1, H×W×3 or H×W×4 array into an image.
///
/// Integer arrays are in 0..255, float arrays in 0..1; both are clamped.
pub fn input_image(image: &Tensor, width: f32) -> DashboardResult<InputImage> {
    let (h, w, channels) = match *image.shape() {
        [h, w] => (h, w, 1),
        [h, w, c @ (1 | 3 | 4)] => (h, w, c),
        _ => {
            return Err(DashboardError::render(format!(
                "image shape {:?} is not HxW, HxWx1, HxWx3 or HxWx4",
                image.shape()
            )));
        }
    };
    if h == 0 || w == 0 {
        return Err(DashboardError::render("image has no pixels"));
    }

    let scale = if image.is_integral() { 1.0 } else { 255.0 };
    let to_byte = |v: f32| {
        let v = if v.is_nan() { 0.0 } else { v };
        (v * scale).round().clamp(0.0, 255.0) as u8
    };

    let mut rgba = Vec::with_capacity(h * w * 4);
    for px in image.data().chunks_exact(channels) {
        match *px {
            [g] => {
                let g = to_byte(g);
                rgba.extend_from_slice(&[g, g, g, 255]);
            }
            [r, g, b] => rgba.extend_from_slice(&[to_byte(r), to_byte(g), to_byte(b), 255]),
            [r, g, b, a] => {
                rgba.extend_from_slice(&[to_byte(r), to_byte(g), to_byte(b), to_byte(a)]);
            }
            _ => unreachable!("chunks_exact yields 1, 3 or 4 channels"),
        }
    }

    Ok(InputImage {
        pixels: ColorImage::from_rgba_unmultiplied([w, h], &rgba),
        display_size: [width, width * h as f32 / w as f32],
    })
}

/// Height reserved under each tile row of a labeled grid.
pub const LABEL_HEIGHT: f32 = 22.0;

/// Screen geometry of one layer grid, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub cell: f32,
    pub gap: f32,
    pub label_height: f32,
}

impl GridGeometry {
    pub fn new(config: &DashboardConfig, labeled: bool) -> Self {
        Self {
            cell: config.cell_size,
            gap: config.cell_spacing,
            label_height: if labeled { LABEL_HEIGHT } else { 0.0 },
        }
    }

    pub fn row_height(&self) -> f32 {
        self.cell + self.label_height
    }

    /// Width and height of a `rows`×`cols` grid, gaps only between cells.
    pub fn size(&self, rows: usize, cols: usize) -> [f32; 2] {
        [
            cols as f32 * self.cell + cols.saturating_sub(1) as f32 * self.gap,
            rows as f32 * self.row_height() + rows.saturating_sub(1) as f32 * self.gap,
        ]
    }

    /// Top-left corner of the tile at (`row`, `col`) relative to the grid.
    pub fn cell_offset(&self, row: usize, col: usize) -> [f32; 2] {
        [
            col as f32 * (self.cell + self.gap),
            row as f32 * (self.row_height() + self.gap),
        ]
    }
}

/// Builds every figure for a response. Any malformed part fails the whole
/// cycle so that nothing is drawn half-way.
pub fn build_figures(
    resp: PredictionResponse,
    config: &DashboardConfig,
) -> DashboardResult<RenderedPrediction> {
    let image = input_image(&resp.image, config.image_width)?;
    let figures = resp
        .prediction
        .into_iter()
        .enumerate()
        .map(|(layer, activations)| {
            layer_figure(layer, activations, config.grid.for_layer(layer))
        })
        .collect::<DashboardResult<Vec<_>>>()?;
    Ok(RenderedPrediction { image, figures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> PredictionResponse {
        serde_json::from_value(value).unwrap()
    }

    fn ramp(n: usize, start: f32) -> Vec<f32> {
        (0..n).map(|i| start + i as f32 / 100.0).collect()
    }

    #[test]
    fn classifier_response_yields_one_figure_per_layer() {
        let mut last = vec![0.0; 10];
        last[0] = 0.9;
        last[1] = 0.1;
        let resp = response(json!({
            "image": [[0, 0, 0]],
            "prediction": [ramp(32, 0.1), ramp(32, 0.3), last],
        }));
        let rendered = build_figures(resp, &DashboardConfig::default()).unwrap();

        assert_eq!(rendered.figures.len(), 3);
        let shapes: Vec<_> = rendered
            .figures
            .iter()
            .map(|f| (f.rows, f.cols, f.labeled))
            .collect();
        assert_eq!(shapes, vec![(2, 16, false), (2, 16, false), (1, 10, true)]);
        let captions: Vec<_> = rendered.figures.iter().map(|f| f.caption.as_str()).collect();
        assert_eq!(captions, vec!["Layer 1", "Layer 2", "Layer 3"]);

        let final_labels: Vec<_> = rendered.figures[2]
            .cells
            .iter()
            .map(|c| c.label.clone().unwrap())
            .collect();
        assert_eq!(final_labels, (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
        let unlabeled = &rendered.figures[..2];
        assert!(unlabeled.iter().all(|f| f.cells.iter().all(|c| c.label.is_none())));
        assert_eq!(rendered.figures[2].argmax, Some(0));

        assert_eq!(rendered.image.display_size[0], 150.0);
    }

    #[test]
    fn third_layer_grid_ignores_element_count() {
        let grid = GridSpec::new(1, 10, true);
        let figure = layer_figure(2, Tensor::from_vec(vec![0.5; 4]), &grid).unwrap();
        assert_eq!((figure.rows, figure.cols), (1, 10));
        assert_eq!(figure.cells.len(), 4);
    }

    #[test]
    fn cells_fill_row_major() {
        let grid = GridSpec::default();
        let figure = layer_figure(0, Tensor::from_vec(ramp(32, 0.0)), &grid).unwrap();
        let c = &figure.cells[17];
        assert_eq!((c.row, c.col), (1, 1));
        assert_eq!(figure.argmax, None);
    }

    #[test]
    fn squeezes_batch_dimension() {
        let t = Tensor::from_json(&json!([[[0.2], [0.4]]])).unwrap();
        let figure = layer_figure(0, t, &GridSpec::default()).unwrap();
        assert_eq!(figure.cells.len(), 2);
        assert_eq!(figure.cells[1].value, 0.4);
    }

    #[test]
    fn overflowing_grid_is_render_error() {
        let grid = GridSpec::new(1, 10, true);
        let err = layer_figure(2, Tensor::from_vec(vec![0.0; 11]), &grid).unwrap_err();
        assert!(matches!(err, DashboardError::Render { .. }));
        assert!(err.to_string().contains("Layer 3") || err.to_string().contains("layer 3"));
    }

    #[test]
    fn one_bad_layer_fails_the_whole_cycle() {
        let resp = response(json!({
            "image": [[0.5]],
            "prediction": [ramp(32, 0.0), ramp(40, 0.0)],
        }));
        assert!(build_figures(resp, &DashboardConfig::default()).is_err());
    }

    #[test]
    fn tile_color_is_a_function_of_value() {
        assert_eq!(tile_color(0.25), tile_color(0.25));
        assert_eq!(tile_color(0.0), Color32::from_rgb(0, 0, 0));
        assert_eq!(tile_color(1.0), Color32::from_rgb(255, 255, 255));
        assert_eq!(tile_color(3.0), tile_color(1.0));
        assert_eq!(tile_color(-2.0), tile_color(0.0));
        assert_eq!(tile_color(f32::NAN), tile_color(0.0));
        let c = tile_color(0.5);
        assert_eq!((c.r(), c.g(), c.b()), (128, 128, 128));
    }

    #[test]
    fn grayscale_image_keeps_aspect() {
        let data = vec![0.0, 1.0, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0];
        let image = Tensor::new(vec![2, 4], data).unwrap();
        let img = input_image(&image, 150.0).unwrap();
        assert_eq!(img.pixels.size, [4, 2]);
        assert_eq!(img.display_size, [150.0, 75.0]);
        assert_eq!(img.pixels.pixels[1], Color32::from_rgb(255, 255, 255));
    }

    #[test]
    fn integer_image_is_byte_range() {
        let image = Tensor::from_json(&json!([[[255, 128, 0]]])).unwrap();
        let img = input_image(&image, 150.0).unwrap();
        assert_eq!(img.pixels.pixels[0], Color32::from_rgb(255, 128, 0));
    }

    #[test]
    fn integer_mask_stays_dark() {
        let image = Tensor::from_json(&json!([[0, 1], [1, 0]])).unwrap();
        let img = input_image(&image, 150.0).unwrap();
        assert_eq!(img.pixels.pixels[0], Color32::from_rgb(0, 0, 0));
        assert_eq!(img.pixels.pixels[1], Color32::from_rgb(1, 1, 1));
    }

    #[test]
    fn float_image_is_unit_range_and_clamped() {
        let image = Tensor::from_json(&json!([[0.0, 1.0, 2.5, -1.0]])).unwrap();
        let img = input_image(&image, 150.0).unwrap();
        let levels: Vec<u8> = img.pixels.pixels.iter().map(|p| p.r()).collect();
        assert_eq!(levels, vec![0, 255, 255, 0]);
    }

    #[test]
    fn unlabeled_grid_has_no_label_band() {
        let config = DashboardConfig::default();
        let geometry = GridGeometry::new(&config, false);
        // 16 cells of 40 and 15 gaps of 2; 2 rows of 40 and one gap.
        assert_eq!(geometry.size(2, 16), [670.0, 82.0]);
        assert_eq!(geometry.cell_offset(1, 1), [42.0, 42.0]);
    }

    #[test]
    fn labeled_grid_reserves_label_band() {
        let config = DashboardConfig::default();
        let geometry = GridGeometry::new(&config, true);
        assert_eq!(geometry.size(1, 10), [418.0, 40.0 + LABEL_HEIGHT]);
        assert_eq!(geometry.cell_offset(1, 0), [0.0, 40.0 + LABEL_HEIGHT + 2.0]);
    }

    #[test]
    fn spacing_only_between_cells() {
        let config = DashboardConfig {
            cell_size: 10.0,
            cell_spacing: 5.0,
            ..DashboardConfig::default()
        };
        let geometry = GridGeometry::new(&config, false);
        assert_eq!(geometry.size(1, 1), [10.0, 10.0]);
        assert_eq!(geometry.size(3, 2), [25.0, 40.0]);
        let [x, _] = geometry.cell_offset(0, 1);
        assert_eq!(x, 15.0);
    }

    #[test]
    fn rejects_unsupported_image_shapes() {
        assert!(input_image(&Tensor::from_vec(vec![0.0; 3]), 150.0).is_err());
        let two_channel = Tensor::new(vec![1, 1, 2], vec![0.0, 0.0]).unwrap();
        assert!(input_image(&two_channel, 150.0).is_err());
        let empty = Tensor::new(vec![0, 3], vec![]).unwrap();
        assert!(input_image(&empty, 150.0).is_err());
    }
}
