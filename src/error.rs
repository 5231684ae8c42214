/// Failures of one fetch-and-render cycle. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    #[error("render error: {reason}")]
    Render { reason: String },

    #[error("config error: {reason}")]
    Config { reason: String },
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol { reason: reason.into() }
    }

    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render { reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport { reason: e.to_string() }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        Self::protocol(e.to_string())
    }
}
