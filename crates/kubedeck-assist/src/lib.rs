//! kubedeck Assist - drafts manifests from a plain-language request
//!
//! Talks to any OpenAI-compatible chat completions endpoint. It has no access to
//! cluster state; the draft is returned as text for the caller to review.

pub mod client;
pub mod config;
pub mod error;

pub use client::DraftClient;
pub use config::{API_KEY_ENV, AssistConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{AssistError, Result};
