use actix_web::{
    HttpResponse, Responder, delete, get, post,
    web::{Bytes, Data, Json, Path},
};
use kubedeck_core::{ResourceKind, ResourceRef, decode};
use serde::Serialize;

use super::{SUCCESS, names};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub status: &'static str,
    pub deployment_name: String,
}

#[get("/resources/deployments/{namespace}")]
pub async fn read_all_deployments(
    state: Data<AppState>,
    namespace: Path<String>,
) -> Result<impl Responder, ApiError> {
    let deployments = state
        .gateway
        .list(ResourceKind::Deployment, Some(namespace.as_str()))
        .await?;
    Ok(Json(DeploymentsResponse {
        deployments: names(deployments),
    }))
}

#[post("/resources/deployment/{namespace}/{name}")]
pub async fn create_deployment(
    state: Data<AppState>,
    path: Path<(String, String)>,
    body: Bytes,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::deployment(&namespace, &name)?;
    let manifest = decode(ResourceKind::Deployment, &body)?;
    state.gateway.create(&target, manifest).await?;

    Ok(HttpResponse::Created().json(DeploymentResponse {
        status: SUCCESS,
        deployment_name: name,
    }))
}

#[delete("/resources/deployment/{namespace}/{name}")]
pub async fn delete_deployment(
    state: Data<AppState>,
    path: Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::deployment(&namespace, &name)?;
    state.gateway.delete(&target).await?;

    Ok(Json(DeploymentResponse {
        status: SUCCESS,
        deployment_name: name,
    }))
}
