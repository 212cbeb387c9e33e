pub mod admin;
pub mod chat;
pub mod config;
pub mod events;
pub mod live;
pub mod quick_actions;
pub mod sidebar;
pub mod speech;

use axum::http::StatusCode;
use axum::Router;
use hirehelp_core::SendError;

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(chat::router())
        .nest("/config", config::router())
        .nest("/speech", speech::router())
        .nest("/sidebar", sidebar::router())
        .nest("/quick-actions", quick_actions::router())
        .nest("/admin", admin::router())
        .nest("/events", events::router())
        .nest("/live", live::router())
}

pub(crate) fn send_status(err: SendError) -> StatusCode {
    match err {
        SendError::Empty => StatusCode::BAD_REQUEST,
        SendError::Busy => StatusCode::CONFLICT,
        SendError::NoSuchSection(_) => StatusCode::NOT_FOUND,
    }
}
