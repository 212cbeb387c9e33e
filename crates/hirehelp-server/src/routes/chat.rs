use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hirehelp_core::{Exchange, SUGGESTIONS};
use hirehelp_schema::Message;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatBody {
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/chat", post(send_chat))
        .route("/suggestions", get(list_suggestions))
}

async fn list_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.assistant.messages().await)
}

async fn send_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<Exchange>, StatusCode> {
    state
        .assistant
        .send(&body.text)
        .await
        .map(Json)
        .map_err(super::send_status)
}

async fn list_suggestions() -> Json<Vec<&'static str>> {
    Json(SUGGESTIONS.to_vec())
}
