use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hirehelp_core::{quick_actions, ChatCommand, Exchange, QuickAction, QuickActionView};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quick_actions))
        .route("/{id}", post(run_quick_action))
}

async fn list_quick_actions(State(state): State<AppState>) -> Json<Vec<QuickActionView>> {
    Json(quick_actions(&state.assistant.company()))
}

async fn run_quick_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Exchange>, StatusCode> {
    let action = QuickAction::from_id(&id).ok_or(StatusCode::NOT_FOUND)?;
    state
        .assistant
        .dispatch(ChatCommand::Quick(action))
        .await
        .map(Json)
        .map_err(super::send_status)
}
