use actix_web::{
    Responder, post,
    web::{Data, Json},
};
use kubedeck_assist::API_KEY_ENV;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftManifestRequest {
    pub yaml_type: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct DraftManifestResponse {
    pub manifest: String,
}

#[post("/assistant/draft")]
pub async fn draft_manifest(
    state: Data<AppState>,
    request: Json<DraftManifestRequest>,
) -> Result<impl Responder, ApiError> {
    let assistant = state
        .assistant
        .as_ref()
        .ok_or(ApiError::AssistantDisabled { env: API_KEY_ENV })?;

    let request = request.into_inner();
    let manifest = assistant.draft(&request.yaml_type, &request.query).await?;
    Ok(Json(DraftManifestResponse { manifest }))
}
