//! Error taxonomy shared by every DevMemory crate.

use std::time::Duration;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, DevMemoryError>;

#[derive(Debug, thiserror::Error)]
pub enum DevMemoryError {
    /// Missing credentials or invalid settings. Terminal for delivery only.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report generation failed. Terminal for the run; state is not advanced.
    #[error("Report production failed: {0}")]
    Production(String),

    /// Network error or 5xx from the notification endpoint.
    #[error("Transient delivery error: {0}")]
    TransientDelivery(String),

    /// 429 from the notification endpoint.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Duration },

    /// Non-retryable 4xx from the notification endpoint.
    #[error("Delivery rejected (HTTP {status}): {body}")]
    DeliveryRejected { status: u16, body: String },

    /// Markdown artifact is absent on disk.
    #[error("Report artifact not found: {0}")]
    ArtifactMissing(String),

    /// Markdown artifact exists but holds no bytes.
    #[error("Report artifact is empty: {0}")]
    ArtifactEmpty(String),

    /// Unreadable state file. Recovered by treating state as empty.
    #[error("State file corrupted: {0}")]
    StateCorruption(String),

    /// Rejected date range for a range summary.
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DevMemoryError {
    /// Whether the delivery client may spend its transient retry on this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientDelivery(_) | Self::Http(_))
    }
}
