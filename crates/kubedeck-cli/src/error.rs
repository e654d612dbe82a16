//! CLI error types with exit code handling

use kubedeck_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Kubeconfig could not be resolved
    #[error("Cluster configuration error: {message}")]
    #[diagnostic(code(kubedeck::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid arguments that clap could not catch
    #[error("Invalid argument: {message}")]
    #[diagnostic(code(kubedeck::cli::usage))]
    Usage { message: String },

    /// IO error (bind failure, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kubedeck::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(kubedeck::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::InvalidInput {
            return CliError::Usage {
                message: err.to_string(),
            };
        }
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let help = match &err {
            KubeError::ConfigNotFound { .. } => {
                Some("Pass --kubeconfig or set KUBECONFIG to point at a kubeconfig file".to_string())
            }
            KubeError::NoActiveContext { .. } => {
                Some("Select a context with `kubectl config use-context <name>`".to_string())
            }
            _ => None,
        };

        match err {
            KubeError::ConfigNotFound { .. }
            | KubeError::ConfigParse { .. }
            | KubeError::NoActiveContext { .. } => CliError::Config {
                message: err.to_string(),
                help,
            },
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
