//! Error types for Pagepulse

use thiserror::Error;

/// Errors that can occur while instrumenting a reading session
#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("Failed to parse reading session: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid reading session: {0}")]
    InvalidSession(String),

    #[error("Viewport intersection observation is not available on this surface")]
    ObservationUnsupported,

    #[error("Article container is missing or detached")]
    MissingContainer,

    #[error("Failed to place sentinel marker: {0}")]
    MarkerPlacement(String),

    #[error("Telemetry sink rejected event: {0}")]
    SinkDelivery(String),
}
