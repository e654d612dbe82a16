use actix_web::{
    HttpResponse, Responder, delete, get, post, put,
    web::{Bytes, Data, Json, Path},
};
use kubedeck_core::{ResourceKind, ResourceRef, ResourceSummary, decode};
use kubedeck_kube::PhaseTransition;
use serde::Serialize;

use super::SUCCESS;
use crate::error::ApiError;
use crate::state::AppState;

pub const YAML_CONTENT_TYPE: &str = "application/x-yaml";

#[derive(Debug, Serialize)]
pub struct PodsResponse {
    pub pods: Vec<ResourceSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodResponse {
    pub status: &'static str,
    pub pod_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacePodResponse {
    pub status: &'static str,
    pub pod_name: String,
    /// Whether an existing pod was deleted before the create
    pub recreated: bool,
    pub phases: Vec<PhaseTransition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePodResponse {
    pub status: &'static str,
    pub deleted_pod: String,
}

#[derive(Debug, Serialize)]
pub struct PodLogsResponse {
    pub logs: String,
}

#[get("/resources/pods/{namespace}")]
pub async fn read_all_pods(
    state: Data<AppState>,
    namespace: Path<String>,
) -> Result<impl Responder, ApiError> {
    let pods = state.gateway.list(ResourceKind::Pod, Some(namespace.as_str())).await?;
    Ok(Json(PodsResponse { pods }))
}

#[post("/resources/pod/{namespace}/{name}")]
pub async fn create_pod(
    state: Data<AppState>,
    path: Path<(String, String)>,
    body: Bytes,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::pod(&namespace, &name)?;
    let manifest = decode(ResourceKind::Pod, &body)?;
    state.gateway.create(&target, manifest).await?;

    Ok(HttpResponse::Created().json(CreatePodResponse {
        status: SUCCESS,
        pod_name: name,
    }))
}

#[put("/resources/pod/{namespace}/{name}")]
pub async fn replace_pod(
    state: Data<AppState>,
    path: Path<(String, String)>,
    body: Bytes,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let manifest = decode(ResourceKind::Pod, &body)?;
    let outcome = state.orchestrator.replace(&namespace, &name, manifest).await?;

    Ok(Json(ReplacePodResponse {
        status: SUCCESS,
        pod_name: outcome.pod_name,
        recreated: outcome.previous_existed,
        phases: outcome.history,
    }))
}

#[delete("/resources/pod/{namespace}/{name}")]
pub async fn delete_pod(
    state: Data<AppState>,
    path: Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::pod(&namespace, &name)?;
    state.gateway.delete(&target).await?;

    Ok(Json(DeletePodResponse {
        status: SUCCESS,
        deleted_pod: name,
    }))
}

#[get("/resources/pod/{namespace}/{name}/yaml")]
pub async fn read_pod_manifest(
    state: Data<AppState>,
    path: Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::pod(&namespace, &name)?;
    let yaml = state.gateway.manifest(&target).await?;

    Ok(HttpResponse::Ok().content_type(YAML_CONTENT_TYPE).body(yaml))
}

#[get("/resources/pod/{namespace}/{name}/logs")]
pub async fn read_pod_logs(
    state: Data<AppState>,
    path: Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (namespace, name) = path.into_inner();
    let target = ResourceRef::pod(&namespace, &name)?;
    let logs = state.gateway.logs(&target).await?;

    Ok(Json(PodLogsResponse { logs }))
}
