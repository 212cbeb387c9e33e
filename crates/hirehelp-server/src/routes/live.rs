use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use hirehelp_audio::{pcm::f32_samples_from_le_bytes, MonotonicClock};
use hirehelp_core::{run_voice_session, ClientFrame, VoiceOutput, VoiceSlotGuard};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::AppState;

/// Text frames the browser may send alongside binary audio.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    Stop,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(live_socket))
}

async fn live_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    let guard = state
        .voice_slot
        .try_acquire()
        .map_err(|_| StatusCode::CONFLICT)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, guard)))
}

async fn handle_socket(socket: WebSocket, state: AppState, _guard: VoiceSlotGuard) {
    let (mut sender, mut receiver) = socket.split();
    let (client_tx, client_rx) = mpsc::channel::<ClientFrame>(64);
    let (out_tx, mut out_rx) = mpsc::channel::<VoiceOutput>(256);

    let send_task = tokio::spawn(async move {
        while let Some(out) = out_rx.recv().await {
            let json = match serde_json::to_string(&out) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode voice output");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let frame = match msg {
                WsMessage::Binary(bytes) => match f32_samples_from_le_bytes(&bytes) {
                    Ok(samples) => ClientFrame::Samples(samples),
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring malformed capture frame");
                        continue;
                    }
                },
                WsMessage::Text(text) => match serde_json::from_str::<ClientCommand>(text.as_str()) {
                    Ok(ClientCommand::Stop) => ClientFrame::Stop,
                    Err(_) => continue,
                },
                WsMessage::Close(_) => break,
                _ => continue,
            };
            let stop = frame == ClientFrame::Stop;
            if client_tx.send(frame).await.is_err() || stop {
                break;
            }
        }
    });

    let setup = state.assistant.live_setup();
    let clock = MonotonicClock::start();
    if let Err(e) = run_voice_session(
        state.connector.as_ref(),
        setup,
        client_rx,
        out_tx,
        &clock,
        state.assistant.bus(),
    )
    .await
    {
        tracing::warn!(error = %e, "voice session ended with error");
    }

    recv_task.abort();
    let _ = send_task.await;
}
