use actix_web::{Responder, get, web::Data, web::Json};
use kubedeck_core::{ResourceKind, ResourceSummary};
use serde::Serialize;

use super::names;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNameResponse {
    pub cluster_name: String,
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<ResourceSummary>,
}

#[derive(Debug, Serialize)]
pub struct NamespacesResponse {
    pub namespaces: Vec<String>,
}

#[get("/resources/cluster-name")]
pub async fn read_cluster_name(state: Data<AppState>) -> Result<impl Responder, ApiError> {
    let handle = state.provider.handle().await?;
    Ok(Json(ClusterNameResponse {
        cluster_name: handle.cluster_name().to_string(),
        context: handle.context().to_string(),
    }))
}

#[get("/resources/nodes")]
pub async fn read_all_nodes(state: Data<AppState>) -> Result<impl Responder, ApiError> {
    let nodes = state.gateway.list(ResourceKind::Node, None).await?;
    Ok(Json(NodesResponse { nodes }))
}

#[get("/resources/namespaces")]
pub async fn read_all_namespaces(state: Data<AppState>) -> Result<impl Responder, ApiError> {
    let namespaces = state.gateway.list(ResourceKind::Namespace, None).await?;
    Ok(Json(NamespacesResponse {
        namespaces: names(namespaces),
    }))
}
