//! Error types for kubedeck-assist

use thiserror::Error;

/// Result type for kubedeck-assist operations
pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("No API key configured for the drafting assistant (set {env})")]
    MissingApiKey { env: &'static str },

    #[error("Request to the drafting assistant failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drafting assistant answered with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Drafting assistant returned no content")]
    EmptyResponse,
}
