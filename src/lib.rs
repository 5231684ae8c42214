//! Desktop dashboard that asks a prediction service for one sample and draws
//! the input image next to a heat-map grid of every layer's activations.

pub mod app;
pub mod config;
pub mod error;
pub mod figure;
pub mod logging;
pub mod model;
pub mod source;
pub mod tensor;

pub use app::DashboardApp;
pub use config::{DashboardConfig, GridPolicy, GridSpec};
pub use error::{DashboardError, DashboardResult};
pub use model::PredictionResponse;
pub use source::{DemoPredictionSource, HttpPredictionSource, PredictionSource};
