//! Error types for pairlink-core operations.
//!
//! Only two conditions reach callers as values: a generation attempt while
//! one is already outstanding, and a failed artifact render. Storage
//! corruption and stale confirmations are handled internally and logged.

/// Errors surfaced by [`crate::lifecycle::ConnectionManager::generate`].
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    /// A second `generate()` arrived while one was outstanding. Recoverable:
    /// the original attempt keeps running, no new session id is minted.
    #[error("pairing generation already in progress")]
    GenerationInProgress,

    /// The rendering service failed or returned an unusable artifact.
    /// The session returns to disconnected.
    #[error("pairing artifact could not be rendered: {0}")]
    ArtifactRender(#[from] RenderError),
}

/// Failure reported by an [`crate::pairing::ArtifactRenderer`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        RenderError {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results using PairingError.
pub type Result<T> = std::result::Result<T, PairingError>;
