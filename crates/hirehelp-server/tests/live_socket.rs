use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use hirehelp_bus::EventBus;
use hirehelp_core::{Assistant, CompanyStore, HireHelpConfig};
use hirehelp_provider::{LiveChannel, LiveConnector, LiveEvent, LiveInput, LiveSetup, StubProvider};
use hirehelp_server::{create_router, AppState};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Confirms setup, answers the first audio frame with one chunk, and
/// acknowledges close.
struct EchoService;

#[async_trait]
impl LiveConnector for EchoService {
    async fn connect(&self, setup: LiveSetup) -> Result<LiveChannel> {
        assert!(setup.system_instruction.contains("real-time voice conversation"));
        let (channel, mut remote) = LiveChannel::pair(16);
        tokio::spawn(async move {
            let _ = remote.events.send(LiveEvent::SetupComplete).await;
            while let Some(input) = remote.input.recv().await {
                match input {
                    LiveInput::Audio { .. } => {
                        let _ = remote
                            .events
                            .send(LiveEvent::Audio {
                                mime_type: "audio/pcm;rate=24000".into(),
                                data: B64.encode(vec![0u8; 4800]),
                            })
                            .await;
                    }
                    LiveInput::Close => {
                        let _ = remote.events.send(LiveEvent::Closed { reason: None }).await;
                        break;
                    }
                }
            }
        });
        Ok(channel)
    }
}

async fn spawn_server() -> String {
    let bus = Arc::new(EventBus::new(64));
    let assistant = Arc::new(Assistant::new(
        Arc::new(StubProvider),
        Arc::new(CompanyStore::default()),
        HireHelpConfig::default().assistant_settings(),
        bus.publisher(),
    ));
    let app = create_router(AppState::new(assistant, bus, Arc::new(EchoService)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/api/live")
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {other:?}"),
        }
    }
}

#[tokio::test]
async fn live_socket_relays_audio_and_stops() {
    let url = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    assert_eq!(next_json(&mut ws).await["state"], "connecting");
    assert_eq!(next_json(&mut ws).await["state"], "open");

    let frame: Vec<u8> = std::iter::repeat(0.25f32.to_le_bytes())
        .take(4096)
        .flatten()
        .collect();
    ws.send(Message::Binary(frame.into())).await.unwrap();

    let play = next_json(&mut ws).await;
    assert_eq!(play["type"], "play");
    assert_eq!(play["sampleRate"], 24000);
    assert!((play["duration"].as_f64().unwrap() - 0.1).abs() < 1e-9);

    ws.send(Message::text(r#"{"type":"stop"}"#)).await.unwrap();

    let mut states = Vec::new();
    loop {
        let msg = next_json(&mut ws).await;
        if msg["type"] == "state" {
            states.push(msg["state"].as_str().unwrap().to_string());
            if msg["state"] == "idle" {
                break;
            }
        }
    }
    assert_eq!(states, vec!["closed", "idle"]);
}
