//! Gemini Live (BidiGenerateContent) streaming session.
//!
//! https://ai.google.dev/api/live

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::gemini::{GeminiContent, GeminiPart, SpeechConfig};

pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

const CHANNEL_CAPACITY: usize = 64;

/// Everything the service needs before the first audio frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSetup {
    pub model: String,
    pub system_instruction: String,
    pub voice: String,
}

/// Client → service.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveInput {
    Audio { mime_type: String, data: String },
    Close,
}

/// Service → client.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    SetupComplete,
    Audio { mime_type: String, data: String },
    Interrupted,
    TurnComplete,
    Error(String),
    Closed { reason: Option<String> },
}

/// The client's half of an open session.
pub struct LiveChannel {
    pub input: mpsc::Sender<LiveInput>,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// The far half of an in-process session, used to drive a [`LiveChannel`]
/// without a network.
pub struct LiveRemote {
    pub input: mpsc::Receiver<LiveInput>,
    pub events: mpsc::Sender<LiveEvent>,
}

impl LiveChannel {
    pub fn pair(capacity: usize) -> (LiveChannel, LiveRemote) {
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);
        (
            LiveChannel {
                input: input_tx,
                events: events_rx,
            },
            LiveRemote {
                input: input_rx,
                events: events_tx,
            },
        )
    }
}

#[async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, setup: LiveSetup) -> Result<LiveChannel>;
}

#[derive(Debug, Clone)]
pub struct GeminiLiveConnector {
    api_key: String,
    url: String,
}

impl GeminiLiveConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: GEMINI_LIVE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn endpoint(&self) -> Result<url::Url> {
        url::Url::parse_with_params(&self.url, &[("key", self.api_key.as_str())])
            .with_context(|| format!("invalid live url: {}", self.url))
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, setup: LiveSetup) -> Result<LiveChannel> {
        let endpoint = self.endpoint()?;
        let (ws, _) = tokio_tungstenite::connect_async(endpoint.as_str())
            .await
            .map_err(|e| anyhow!("gemini live error (connect): {e}"))?;
        let (mut sink, mut stream) = ws.split();

        sink.send(Message::text(setup_message(&setup).to_string()))
            .await
            .map_err(|e| anyhow!("gemini live error (setup): {e}"))?;
        tracing::info!(model = %setup.model, "gemini live session requested");

        let (channel, mut remote) = LiveChannel::pair(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    input = remote.input.recv() => {
                        match input {
                            Some(LiveInput::Audio { mime_type, data }) => {
                                let frame = realtime_input_message(&mime_type, &data).to_string();
                                if let Err(e) = sink.send(Message::text(frame)).await {
                                    let _ = remote.events.send(LiveEvent::Error(e.to_string())).await;
                                    break;
                                }
                            }
                            Some(LiveInput::Close) | None => {
                                let _ = sink.send(Message::Close(None)).await;
                                let _ = remote.events.send(LiveEvent::Closed { reason: None }).await;
                                break;
                            }
                        }
                    }
                    frame = stream.next() => {
                        let events = match frame {
                            Some(Ok(Message::Text(text))) => parse_server_message(text.as_str()),
                            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                                Ok(text) => parse_server_message(text),
                                Err(_) => vec![LiveEvent::Error("non-utf8 binary frame".into())],
                            },
                            Some(Ok(Message::Close(frame))) => {
                                let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                                let _ = remote.events.send(LiveEvent::Closed { reason }).await;
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                let _ = remote.events.send(LiveEvent::Error(e.to_string())).await;
                                break;
                            }
                            None => {
                                let _ = remote.events.send(LiveEvent::Closed { reason: None }).await;
                                break;
                            }
                        };
                        for event in events {
                            if remote.events.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            tracing::debug!("gemini live pump finished");
        });

        Ok(channel)
    }
}

pub(crate) fn setup_message(setup: &LiveSetup) -> serde_json::Value {
    let model = if setup.model.starts_with("models/") {
        setup.model.clone()
    } else {
        format!("models/{}", setup.model)
    };
    let system = GeminiContent {
        role: None,
        parts: vec![GeminiPart::text(&setup.system_instruction)],
    };
    serde_json::json!({
        "setup": {
            "model": model,
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": SpeechConfig::prebuilt(&setup.voice),
            },
            "systemInstruction": system,
        }
    })
}

pub(crate) fn realtime_input_message(mime_type: &str, data: &str) -> serde_json::Value {
    serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [{ "mimeType": mime_type, "data": data }]
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveServerMessage {
    #[serde(default)]
    setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    server_content: Option<ServerContent>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default)]
    model_turn: Option<GeminiContent>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

/// One service frame may carry several events; audio comes before the
/// interruption flag so the flag cancels it too.
pub fn parse_server_message(text: &str) -> Vec<LiveEvent> {
    let msg: LiveServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => return vec![LiveEvent::Error(format!("invalid live payload: {e}"))],
    };

    let mut events = Vec::new();
    if msg.setup_complete.is_some() {
        events.push(LiveEvent::SetupComplete);
    }
    if let Some(content) = msg.server_content {
        for part in content.model_turn.map(|t| t.parts).unwrap_or_default() {
            if let Some(inline) = part.inline_data {
                events.push(LiveEvent::Audio {
                    mime_type: inline.mime_type,
                    data: inline.data,
                });
            }
        }
        if content.interrupted {
            events.push(LiveEvent::Interrupted);
        }
        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }
    }
    if let Some(err) = msg.error {
        events.push(LiveEvent::Error(err.to_string()));
    }
    events
}
