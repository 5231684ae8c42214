use serde::Deserialize;

use crate::error::DashboardResult;
use crate::tensor::Tensor;

/// Body returned by the prediction endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct PredictionResponse {
    /// Input pixels, H×W or H×W×C.
    pub image: Tensor,
    /// Per-layer activations in network order.
    pub prediction: Vec<Tensor>,
}

impl PredictionResponse {
    pub fn from_json(body: &str) -> DashboardResult<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
