use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use kubedeck_assist::AssistError;
use kubedeck_core::CoreError;
use kubedeck_kube::{KubeError, ReplaceError, ReplaceStep};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<ReplaceStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_deleted: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kube(#[from] KubeError),

    #[error(transparent)]
    Manifest(#[from] CoreError),

    #[error(transparent)]
    Replace(#[from] ReplaceError),

    #[error(transparent)]
    Assist(#[from] AssistError),

    #[error("Manifest drafting is not configured (set {env})")]
    AssistantDisabled { env: &'static str },
}

fn kube_status(e: &KubeError) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if e.is_conflict() {
        StatusCode::CONFLICT
    } else if e.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Kube(e) => kube_status(e),
            ApiError::Replace(e) => kube_status(&e.source),
            ApiError::Manifest(e) if e.is_validation() || e.is_bad_request() => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Manifest(_) | ApiError::Assist(_) | ApiError::AssistantDisabled { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }

        let (step, original_deleted) = match self {
            ApiError::Replace(e) => (Some(e.step), Some(e.original_deleted)),
            _ => (None, None),
        };
        HttpResponse::build(status).json(ErrorMessage {
            error: self.to_string(),
            step,
            original_deleted,
        })
    }
}
