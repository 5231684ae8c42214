use eframe::egui;
use tracing::{error, info};

use crate::config::DashboardConfig;
use crate::error::DashboardResult;
use crate::figure::{self, GridGeometry, LayerFigure, RenderedPrediction};
use crate::source::PredictionSource;

pub const TITLE: &str = "Neural Network Visualizer";

pub struct DashboardApp {
    config: DashboardConfig,
    source: Box<dyn PredictionSource>,
    status: String,
    last_error: Option<String>,
    rendered: Option<RenderedPrediction>,
    // Uploaded lazily from `rendered` on the next frame.
    image_texture: Option<egui::TextureHandle>,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig, source: Box<dyn PredictionSource>) -> Self {
        let status = format!("Prediction source: {}", source.describe());
        Self {
            config,
            source,
            status,
            last_error: None,
            rendered: None,
            image_texture: None,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn figures(&self) -> &[LayerFigure] {
        self.rendered.as_ref().map(|r| r.figures.as_slice()).unwrap_or(&[])
    }

    pub fn rendered(&self) -> Option<&RenderedPrediction> {
        self.rendered.as_ref()
    }

    /// Runs one fetch-and-render cycle. The previous result is dropped first;
    /// on failure nothing is shown except the error.
    pub fn request_prediction(&mut self) {
        self.rendered = None;
        self.image_texture = None;
        match self.fetch_and_build() {
            Ok(rendered) => {
                info!(layers = rendered.figures.len(), "prediction rendered");
                self.status = format!(
                    "Received {} layers from {}",
                    rendered.figures.len(),
                    self.source.describe()
                );
                self.last_error = None;
                self.rendered = Some(rendered);
            }
            Err(e) => {
                error!(error = %e, "prediction cycle failed");
                self.status = "Prediction failed".to_string();
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn fetch_and_build(&mut self) -> DashboardResult<RenderedPrediction> {
        let resp = self.source.fetch()?;
        figure::build_figures(resp, &self.config)
    }

    /// Draws one frame.
    pub fn show(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("input_image")
            .resizable(false)
            .min_width(self.config.image_width + 16.0)
            .show(ctx, |ui| {
                ui.label("Input image");
                ui.separator();
                self.draw_input_image(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(TITLE);
            if ui.button("Get a random prediction").clicked() {
                self.request_prediction();
            }
            ui.label(&self.status);
            if let Some(err) = &self.last_error {
                ui.colored_label(egui::Color32::LIGHT_RED, err);
            }
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                if let Some(rendered) = &self.rendered {
                    for fig in &rendered.figures {
                        self.draw_figure(ui, fig);
                        ui.add_space(12.0);
                    }
                }
            });
        });
    }

    fn draw_input_image(&mut self, ui: &mut egui::Ui) {
        let Some(rendered) = &self.rendered else {
            return;
        };
        let texture = self.image_texture.get_or_insert_with(|| {
            ui.ctx().load_texture(
                "input-image",
                rendered.image.pixels.clone(),
                egui::TextureOptions::NEAREST,
            )
        });
        let [w, h] = rendered.image.display_size;
        ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(
            texture.id(),
            egui::vec2(w, h),
        )));
    }

    fn draw_figure(&self, ui: &mut egui::Ui, fig: &LayerFigure) {
        ui.label(&fig.caption);

        let geometry = GridGeometry::new(&self.config, fig.labeled);
        let size = egui::Vec2::from(geometry.size(fig.rows, fig.cols));
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter_at(rect);

        for c in &fig.cells {
            let min = rect.left_top() + egui::Vec2::from(geometry.cell_offset(c.row, c.col));
            let tile = egui::Rect::from_min_size(min, egui::Vec2::splat(geometry.cell));
            painter.rect_filled(tile, 0.0, c.color);

            if fig.argmax == Some(c.index) {
                // Predicted class.
                let stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 200, 0));
                let (lt, rt) = (tile.left_top(), tile.right_top());
                let (lb, rb) = (tile.left_bottom(), tile.right_bottom());
                painter.line_segment([lt, rt], stroke);
                painter.line_segment([rt, rb], stroke);
                painter.line_segment([rb, lb], stroke);
                painter.line_segment([lb, lt], stroke);
            }

            if let Some(label) = &c.label {
                painter.text(
                    egui::pos2(tile.center().x, tile.bottom() + 2.0),
                    egui::Align2::CENTER_TOP,
                    label,
                    egui::FontId::proportional(16.0),
                    ui.visuals().text_color(),
                );
            }

            let id = egui::Id::new(("cell", fig.layer, c.index));
            ui.interact(tile, id, egui::Sense::hover())
                .on_hover_text(format!("#{}: {:.4}", c.index, c.value));
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }
}
