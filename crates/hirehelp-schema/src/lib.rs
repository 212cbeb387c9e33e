pub mod defaults;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use defaults::{default_company, DEFAULT_COMPANY_NAME};

/// The active tenant: everything the assistant knows about one company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyConfig {
    pub name: String,
    #[serde(default)]
    pub handbook_sections: Vec<HandbookSection>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

impl CompanyConfig {
    /// Same knowledge base under a different display name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandbookSection {
    pub title: String,
    pub content: String,
}

impl HandbookSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holiday {
    /// ISO calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub name: String,
}

impl Holiday {
    pub fn new(date: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

/// Citation attached by the model when it used web search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_links: Vec<GroundingLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), Vec::new())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), Vec::new())
    }

    pub fn assistant_with_links(content: impl Into<String>, links: Vec<GroundingLink>) -> Self {
        Self::new(Role::Assistant, content.into(), links)
    }

    fn new(role: Role, content: String, grounding_links: Vec<GroundingLink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            grounding_links,
            feedback: None,
        }
    }
}

/// Lifecycle of a live voice session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoiceState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Events published on the bus and streamed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    MessageAppended {
        message: Message,
    },
    ConversationReset {
        greeting: Message,
    },
    ConfigReplaced {
        name: String,
        handbook_sections: usize,
        holidays: usize,
    },
    VoiceStateChanged {
        session_id: Uuid,
        state: VoiceState,
    },
}
