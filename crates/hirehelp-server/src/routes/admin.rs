use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use hirehelp_core::{import_document, AdoptRequest, AdoptionReport, ImportedDocument};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBody {
    pub file_name: String,
    pub contents: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adopt", post(adopt_company))
        .route("/import", post(import_handbook))
}

async fn adopt_company(
    State(state): State<AppState>,
    Json(body): Json<AdoptRequest>,
) -> Result<Json<AdoptionReport>, StatusCode> {
    let report = state
        .assistant
        .adopt(&body)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(report))
}

async fn import_handbook(Json(body): Json<ImportBody>) -> Result<Json<ImportedDocument>, StatusCode> {
    import_document(&body.file_name, &body.contents)
        .map(Json)
        .map_err(|e| {
            tracing::warn!(error = %e, "rejected handbook import");
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        })
}
