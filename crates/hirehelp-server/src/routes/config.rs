use axum::{extract::State, routing::get, Json, Router};
use hirehelp_schema::CompanyConfig;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_config))
}

async fn get_config(State(state): State<AppState>) -> Json<CompanyConfig> {
    Json(state.assistant.company().as_ref().clone())
}
