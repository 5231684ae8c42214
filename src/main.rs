use std::path::PathBuf;

use activation_dashboard::app::TITLE;
use activation_dashboard::logging::init_tracing;
use activation_dashboard::{
    DashboardApp, DashboardConfig, DemoPredictionSource, HttpPredictionSource, PredictionSource,
};
use anyhow::Context;
use clap::Parser;
use eframe::egui;
use tracing::info;

/// Shows a neural network's input image and per-layer activations.
#[derive(Parser, Debug)]
#[command(name = "activation-dashboard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Prediction endpoint (overrides config file)
    #[arg(
        short = 'e',
        long = "endpoint",
        value_name = "URL",
        env = "ACTIVATION_DASHBOARD_ENDPOINT"
    )]
    endpoint: Option<String>,

    /// Generate random predictions locally instead of calling the endpoint
    #[arg(long = "demo")]
    demo: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
        config.validate()?;
    }

    init_tracing(&config.log_level);

    let source: Box<dyn PredictionSource> = if cli.demo {
        Box::new(DemoPredictionSource::new())
    } else {
        Box::new(HttpPredictionSource::new(config.endpoint.clone())?)
    };
    info!(source = %source.describe(), "starting dashboard");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    let app = DashboardApp::new(config, source);
    eframe::run_native(TITLE, options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}
