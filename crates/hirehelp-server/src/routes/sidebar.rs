use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hirehelp_core::{handbook_cards, holiday_entries, ChatCommand, Exchange, HandbookCard, HolidayEntry};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/handbook", get(list_handbook))
        .route("/handbook/{index}/ask", post(ask_handbook))
        .route("/holidays", get(list_holidays))
}

async fn list_handbook(State(state): State<AppState>) -> Json<Vec<HandbookCard>> {
    Json(handbook_cards(&state.assistant.company()))
}

async fn list_holidays(State(state): State<AppState>) -> Json<Vec<HolidayEntry>> {
    Json(holiday_entries(&state.assistant.company()))
}

async fn ask_handbook(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Exchange>, StatusCode> {
    state
        .assistant
        .dispatch(ChatCommand::AskHandbook { index })
        .await
        .map(Json)
        .map_err(super::send_status)
}
