pub mod gemini;
pub mod live;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;

pub use gemini::{GeminiProvider, GEMINI_API_BASE};
pub use live::{
    parse_server_message, GeminiLiveConnector, LiveChannel, LiveConnector, LiveEvent, LiveInput,
    LiveRemote, LiveSetup, GEMINI_LIVE_URL,
};
pub use types::*;

/// A hosted model that answers one prompt at a time.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;
}

/// Offline stand-in that echoes the prompt back.
pub struct StubProvider;

/// 0.1 s of 24 kHz mono 16-bit silence.
const STUB_AUDIO_BYTES: usize = 4800;

#[async_trait]
impl GenerativeModel for StubProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let response = match &request.format {
            ResponseFormat::Text => GenerateResponse {
                text: format!("[stub:{}] {}", request.model, request.prompt),
                finish_reason: Some("STOP".into()),
                ..Default::default()
            },
            ResponseFormat::Json { .. } => GenerateResponse {
                text: "[]".into(),
                finish_reason: Some("STOP".into()),
                ..Default::default()
            },
            ResponseFormat::Audio { .. } => GenerateResponse {
                audio: Some(InlineAudio {
                    mime_type: "audio/pcm;rate=24000".into(),
                    data: B64.encode(vec![0u8; STUB_AUDIO_BYTES]),
                }),
                finish_reason: Some("STOP".into()),
                ..Default::default()
            },
        };
        Ok(response)
    }
}
