use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use hirehelp_provider::{GEMINI_API_BASE, GEMINI_LIVE_URL};

use crate::AssistantSettings;

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_base_url() -> String {
    GEMINI_API_BASE.to_string()
}

fn default_live_url() -> String {
    GEMINI_LIVE_URL.to_string()
}

fn default_chat_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_live_model() -> String {
    "gemini-2.5-flash-native-audio-preview-09-2025".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_speech_voice() -> String {
    "Kore".to_string()
}

fn default_live_voice() -> String {
    "Zephyr".to_string()
}

fn default_speech_max_chars() -> usize {
    500
}

fn default_holiday_year() -> i32 {
    2025
}

fn default_max_knowledge_chars() -> usize {
    120_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Literal key or `${VAR}` placeholder. Falls back to `GEMINI_API_KEY`,
    /// then `API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_live_url")]
    pub live_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    #[serde(default = "default_chat_model")]
    pub structuring_model: String,
    #[serde(default = "default_live_model")]
    pub live_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            live_url: default_live_url(),
            chat_model: default_chat_model(),
            speech_model: default_speech_model(),
            structuring_model: default_chat_model(),
            live_model: default_live_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_speech_voice")]
    pub speech_voice: String,
    #[serde(default = "default_live_voice")]
    pub live_voice: String,
    #[serde(default = "default_speech_max_chars")]
    pub speech_max_chars: usize,
    #[serde(default = "default_holiday_year")]
    pub default_holiday_year: i32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            speech_voice: default_speech_voice(),
            live_voice: default_live_voice(),
            speech_max_chars: default_speech_max_chars(),
            default_holiday_year: default_holiday_year(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_max_knowledge_chars")]
    pub max_knowledge_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_knowledge_chars: default_max_knowledge_chars(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HireHelpConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl HireHelpConfig {
    /// The configured key after placeholder expansion, or the environment
    /// fallbacks.
    pub fn api_key(&self) -> Option<String> {
        self.gemini
            .api_key
            .as_deref()
            .map(resolve_env_var)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()))
            .or_else(|| std::env::var("API_KEY").ok().filter(|k| !k.is_empty()))
    }

    pub fn assistant_settings(&self) -> AssistantSettings {
        AssistantSettings {
            chat_model: self.gemini.chat_model.clone(),
            speech_model: self.gemini.speech_model.clone(),
            structuring_model: self.gemini.structuring_model.clone(),
            live_model: self.gemini.live_model.clone(),
            temperature: self.assistant.temperature,
            speech_voice: self.assistant.speech_voice.clone(),
            live_voice: self.assistant.live_voice.clone(),
            speech_max_chars: self.assistant.speech_max_chars,
            default_holiday_year: self.assistant.default_holiday_year,
            max_knowledge_chars: self.prompt.max_knowledge_chars,
        }
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Loads `<config_dir>/main.yaml`. A missing file yields the defaults.
pub fn load_config(config_dir: &Path) -> Result<HireHelpConfig> {
    let path = config_dir.join("main.yaml");
    let config = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        if content.trim().is_empty() {
            HireHelpConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse yaml file: {}", path.display()))?
        }
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        HireHelpConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &HireHelpConfig) -> Result<()> {
    let models = [
        ("chat_model", &config.gemini.chat_model),
        ("speech_model", &config.gemini.speech_model),
        ("structuring_model", &config.gemini.structuring_model),
        ("live_model", &config.gemini.live_model),
    ];
    for (field, value) in models {
        if value.trim().is_empty() {
            return Err(anyhow!("gemini.{field} must not be empty"));
        }
    }

    let temperature = config.assistant.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(anyhow!(
            "assistant.temperature must be within 0.0..=2.0, got {temperature}"
        ));
    }

    if config.assistant.speech_max_chars == 0 {
        return Err(anyhow!("assistant.speech_max_chars must be positive"));
    }

    if config.server.bind.trim().is_empty() {
        return Err(anyhow!("server.bind must not be empty"));
    }

    Ok(())
}

/// Writes a commented default `main.yaml` unless one exists.
pub fn ensure_skeleton_config(config_dir: &Path) -> Result<bool> {
    let path = config_dir.join("main.yaml");
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(config_dir)
        .with_context(|| format!("failed to create {}", config_dir.display()))?;
    let yaml = serde_yaml::to_string(&HireHelpConfig {
        gemini: GeminiConfig {
            api_key: Some("${GEMINI_API_KEY}".to_string()),
            ..Default::default()
        },
        ..Default::default()
    })?;
    fs::write(&path, format!("# hirehelp configuration\n{yaml}"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
