use hirehelp_schema::GroundingLink;
use serde::{Deserialize, Serialize};

/// What modality and shape the model should answer in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    /// JSON constrained by an OpenAPI-style schema.
    Json { schema: serde_json::Value },
    /// Spoken audio with a prebuilt voice.
    Audio { voice: String },
}

/// A single-turn generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Let the model ground its answer with web search.
    #[serde(default)]
    pub google_search: bool,
    pub format: ResponseFormat,
}

impl GenerateRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: None,
            google_search: false,
            format: ResponseFormat::Text,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_google_search(mut self) -> Self {
        self.google_search = true;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }
}

/// Base64 payload returned inline by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineAudio {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerateResponse {
    pub text: String,
    #[serde(default)]
    pub grounding_links: Vec<GroundingLink>,
    #[serde(default)]
    pub audio: Option<InlineAudio>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}
