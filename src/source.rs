//! Where predictions come from: the HTTP endpoint, or an offline generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::{DashboardError, DashboardResult};
use crate::model::PredictionResponse;
use crate::tensor::Tensor;

pub trait PredictionSource {
    /// Short human-readable description shown in the status line.
    fn describe(&self) -> String;

    /// Produces one prediction. Called once per user request.
    fn fetch(&mut self) -> DashboardResult<PredictionResponse>;
}

/// Issues a single unauthenticated POST with an empty body and decodes the
/// JSON reply. No retries.
#[derive(Debug)]
pub struct HttpPredictionSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpPredictionSource {
    pub fn new(endpoint: impl Into<String>) -> DashboardResult<Self> {
        let endpoint = endpoint.into();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| DashboardError::config(format!("invalid endpoint {endpoint:?}: {e}")))?;
        let mut builder = reqwest::blocking::Client::builder();
        // A proxy cannot reach the caller's own loopback service.
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { endpoint, client })
    }
}

impl PredictionSource for HttpPredictionSource {
    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    fn fetch(&mut self) -> DashboardResult<PredictionResponse> {
        info!(endpoint = %self.endpoint, "requesting prediction");
        let resp = self.client.post(&self.endpoint).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(bytes = body.len(), "prediction body received");
        PredictionResponse::from_json(&body)
    }
}

fn is_loopback(url: &reqwest::Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost")
        || host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

/// Layer sizes of the classifier the dashboard layout is drawn for.
const DEMO_LAYERS: [usize; 3] = [32, 32, 10];
const DEMO_IMAGE_SIDE: usize = 28;

/// Generates random predictions without a server.
pub struct DemoPredictionSource {
    rng: StdRng,
}

impl DemoPredictionSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for DemoPredictionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionSource for DemoPredictionSource {
    fn describe(&self) -> String {
        "demo (offline)".to_string()
    }

    fn fetch(&mut self) -> DashboardResult<PredictionResponse> {
        let pixels = (0..DEMO_IMAGE_SIDE * DEMO_IMAGE_SIDE)
            .map(|_| self.rng.r#gen::<f32>())
            .collect();
        let image = Tensor::new(vec![DEMO_IMAGE_SIDE, DEMO_IMAGE_SIDE], pixels)?;

        let mut prediction = Vec::with_capacity(DEMO_LAYERS.len());
        for (i, &units) in DEMO_LAYERS.iter().enumerate() {
            let mut values: Vec<f32> = (0..units).map(|_| self.rng.r#gen::<f32>()).collect();
            if i == DEMO_LAYERS.len() - 1 {
                softmax(&mut values);
            }
            // Keras-style batch dimension, squeezed away at render time.
            prediction.push(Tensor::new(vec![1, units], values)?);
        }
        debug!(layers = prediction.len(), "generated demo prediction");
        Ok(PredictionResponse { image, prediction })
    }
}

fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v * 8.0 - max * 8.0).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}
