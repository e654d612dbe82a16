//! Error types for kubedeck-kube

use std::path::PathBuf;
use std::time::Duration;

use kubedeck_core::{CoreError, Operation, ResourceKind, ResourceRef};
use thiserror::Error;

/// Result type for kubedeck-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the control plane
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// No kubeconfig file at the resolved location
    #[error("kubeconfig not found at '{}'", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Kubeconfig could not be read or does not describe a usable cluster
    #[error("failed to load kubeconfig: {message}")]
    ConfigParse { message: String },

    /// Kubeconfig has no usable current context
    #[error("no active context in kubeconfig{}", undefined_context(.context))]
    NoActiveContext { context: Option<String> },

    /// Object does not exist
    #[error("{target} not found")]
    NotFound { target: String },

    /// Object name is already taken
    #[error("{target} already exists")]
    AlreadyExists { target: String },

    /// Request rejected as invalid, either locally or by the control plane
    #[error("invalid request: {message}")]
    Validation { message: String },

    /// Operation is not exposed for this kind
    #[error("{kind} does not support the {operation} operation")]
    Unsupported {
        kind: ResourceKind,
        operation: Operation,
    },

    /// Required request parameter was empty
    #[error("missing required parameter: {parameter}")]
    MissingParameter { parameter: &'static str },

    /// Object did not disappear within the settle timeout
    #[error("{target} was still present after {timeout:?}")]
    SettleTimeout { target: String, timeout: Duration },

    /// Any other control-plane failure
    #[error("Kubernetes API error: {message}")]
    Upstream { message: String, code: Option<u16> },
}

fn undefined_context(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" (current-context '{}' is not defined)", c))
        .unwrap_or_default()
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MissingParameter { parameter } => KubeError::MissingParameter { parameter },
            CoreError::Unsupported { kind, operation } => KubeError::Unsupported { kind, operation },
            CoreError::Encode(message) => KubeError::Upstream {
                message,
                code: None,
            },
            other => KubeError::Validation {
                message: other.to_string(),
            },
        }
    }
}

impl KubeError {
    /// Classify a `kube` client error for `target` by its API status
    pub fn from_api(err: kube::Error, target: &ResourceRef) -> Self {
        match err {
            kube::Error::Api(resp) => match (resp.code, resp.reason.as_str()) {
                (404, _) | (_, "NotFound") => KubeError::NotFound {
                    target: target.to_string(),
                },
                (409, _) | (_, "AlreadyExists") => KubeError::AlreadyExists {
                    target: target.to_string(),
                },
                (400 | 422, _) | (_, "Invalid" | "BadRequest") => KubeError::Validation {
                    message: resp.message,
                },
                (code, _) => KubeError::Upstream {
                    message: resp.message,
                    code: Some(code),
                },
            },
            other => KubeError::Upstream {
                message: other.to_string(),
                code: None,
            },
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::NotFound { .. })
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::AlreadyExists { .. })
    }

    /// Check if the caller sent something that can never succeed as-is
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            KubeError::Validation { .. }
                | KubeError::ConfigParse { .. }
                | KubeError::Unsupported { .. }
                | KubeError::MissingParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("rejected with {}", reason),
            reason: reason.to_string(),
            code,
        })
    }

    fn pod() -> ResourceRef {
        ResourceRef::pod("default", "web-1").unwrap()
    }

    #[test]
    fn test_classify_by_status() {
        assert!(KubeError::from_api(api_error(404, "NotFound"), &pod()).is_not_found());
        assert!(KubeError::from_api(api_error(409, "AlreadyExists"), &pod()).is_conflict());
        assert!(KubeError::from_api(api_error(409, "Conflict"), &pod()).is_conflict());
        assert!(matches!(
            KubeError::from_api(api_error(422, "Invalid"), &pod()),
            KubeError::Validation { .. }
        ));
        assert!(matches!(
            KubeError::from_api(api_error(400, "BadRequest"), &pod()),
            KubeError::Validation { .. }
        ));
        assert!(matches!(
            KubeError::from_api(api_error(500, "InternalError"), &pod()),
            KubeError::Upstream { code: Some(500), .. }
        ));
        assert!(matches!(
            KubeError::from_api(api_error(403, "Forbidden"), &pod()),
            KubeError::Upstream { code: Some(403), .. }
        ));
    }

    #[test]
    fn test_not_found_names_target() {
        let err = KubeError::from_api(api_error(404, "NotFound"), &pod());
        assert_eq!(err.to_string(), "Pod default/web-1 not found");
    }

    #[test]
    fn test_from_core_error() {
        let err: KubeError = CoreError::MissingParameter {
            parameter: "namespace",
        }
        .into();
        assert!(matches!(
            err,
            KubeError::MissingParameter {
                parameter: "namespace"
            }
        ));
        assert!(err.is_bad_request());

        let err: KubeError = CoreError::NotAMapping.into();
        assert!(matches!(err, KubeError::Validation { .. }));
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_no_active_context_message() {
        let err = KubeError::NoActiveContext { context: None };
        assert_eq!(err.to_string(), "no active context in kubeconfig");

        let err = KubeError::NoActiveContext {
            context: Some("prod".to_string()),
        };
        assert!(err.to_string().contains("'prod' is not defined"));
    }
}
