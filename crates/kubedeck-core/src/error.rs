//! Core error types

use thiserror::Error;

use crate::kind::{Operation, ResourceKind};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse manifest: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Manifest must be a mapping at the top level")]
    NotAMapping,

    #[error("Expected a {expected} manifest, found kind '{found}'")]
    KindMismatch { expected: ResourceKind, found: String },

    #[error("Expected apiVersion '{expected}' for {kind}, found '{found}'")]
    ApiVersionMismatch {
        kind: ResourceKind,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid {kind} manifest: {message}")]
    Schema { kind: ResourceKind, message: String },

    #[error("Unknown field '{path}' in {kind} manifest")]
    UnknownField { kind: ResourceKind, path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Manifest {field} '{found}' does not match '{expected}' from the request")]
    FieldMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("Missing required parameter: {parameter}")]
    MissingParameter { parameter: &'static str },

    #[error("Invalid {parameter} '{value}': surrounding whitespace is not allowed")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
    },

    #[error("Parameter '{parameter}' is not allowed for {kind}")]
    UnexpectedParameter {
        parameter: &'static str,
        kind: ResourceKind,
    },

    #[error("{kind} does not support the {operation} operation")]
    Unsupported {
        kind: ResourceKind,
        operation: Operation,
    },

    #[error("Failed to encode manifest: {0}")]
    Encode(String),
}

impl CoreError {
    /// Check if the error is caused by a manifest the caller can fix
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::YamlParse(_)
                | CoreError::NotAMapping
                | CoreError::KindMismatch { .. }
                | CoreError::ApiVersionMismatch { .. }
                | CoreError::Schema { .. }
                | CoreError::UnknownField { .. }
                | CoreError::MissingField { .. }
                | CoreError::FieldMismatch { .. }
        )
    }

    /// Check if the error comes from a malformed request rather than its body
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            CoreError::MissingParameter { .. }
                | CoreError::InvalidParameter { .. }
                | CoreError::UnexpectedParameter { .. }
                | CoreError::Unsupported { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
