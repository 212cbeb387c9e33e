use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use hirehelp_core::{SpeechClip, SpeechError, SpeechTarget};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechBody {
    pub message_id: Option<Uuid>,
    pub text: Option<String>,
}

/// `clip` is absent when there is nothing to play.
#[derive(Serialize)]
pub struct SpeechResponse {
    pub clip: Option<SpeechClip>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(speak))
}

async fn speak(
    State(state): State<AppState>,
    Json(body): Json<SpeechBody>,
) -> Result<Json<SpeechResponse>, StatusCode> {
    let target = match (body.message_id, body.text) {
        (Some(id), _) => SpeechTarget::Message(id),
        (None, Some(text)) if !text.trim().is_empty() => SpeechTarget::Text(text),
        _ => return Err(StatusCode::BAD_REQUEST),
    };

    match state.assistant.speak(target).await {
        Ok(clip) => Ok(Json(SpeechResponse { clip })),
        Err(SpeechError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(SpeechError::Busy) => Err(StatusCode::CONFLICT),
    }
}
