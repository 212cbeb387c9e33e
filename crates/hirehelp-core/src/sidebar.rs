//! View models for the sidebar, suggestion chips and quick actions.

use chrono::NaiveDate;
use hirehelp_schema::{CompanyConfig, Holiday};
use serde::{Deserialize, Serialize};

pub const SUGGESTIONS: [&str; 4] = [
    "How many leave days do I get?",
    "What's the Friday dress code?",
    "Upcoming office holidays",
    "How do I contact IT helpdesk?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuickAction {
    ItAssets,
    Mentors,
    Security,
    Benefits,
}

impl QuickAction {
    pub const ALL: [QuickAction; 4] = [
        QuickAction::ItAssets,
        QuickAction::Mentors,
        QuickAction::Security,
        QuickAction::Benefits,
    ];

    pub fn id(self) -> &'static str {
        match self {
            QuickAction::ItAssets => "it-assets",
            QuickAction::Mentors => "mentors",
            QuickAction::Security => "security",
            QuickAction::Benefits => "benefits",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            QuickAction::ItAssets => "IT Assets",
            QuickAction::Mentors => "Mentors",
            QuickAction::Security => "Security",
            QuickAction::Benefits => "Benefits",
        }
    }

    pub fn prompt(self, company_name: &str) -> String {
        match self {
            QuickAction::ItAssets => format!("How do I request IT equipment at {company_name}?"),
            QuickAction::Mentors => format!("Who are the mentors for new hires at {company_name}?"),
            QuickAction::Security => {
                format!("What are the security and firewall policies at {company_name}?")
            }
            QuickAction::Benefits => {
                format!("Summarize the employee benefits and healthcare for {company_name}.")
            }
        }
    }
}

/// Something the sidebar asks the chat pipeline to do on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Suggestion(String),
    AskHandbook { index: usize },
    Quick(QuickAction),
}

impl ChatCommand {
    /// The utterance to send, or `None` when the command refers to content
    /// that no longer exists.
    pub fn utterance(&self, config: &CompanyConfig) -> Option<String> {
        match self {
            ChatCommand::Suggestion(text) => Some(text.clone()),
            ChatCommand::AskHandbook { index } => config
                .handbook_sections
                .get(*index)
                .map(|s| handbook_prompt(&s.title, &config.name)),
            ChatCommand::Quick(action) => Some(action.prompt(&config.name)),
        }
    }
}

fn handbook_prompt(title: &str, company_name: &str) -> String {
    format!("Tell me about {title} in {company_name}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandbookCard {
    pub index: usize,
    pub title: String,
    pub content: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayEntry {
    pub name: String,
    pub date: String,
    /// e.g. "Jan 1"; the raw date when it does not parse.
    pub day_month: String,
    /// e.g. "Monday"; empty when the date does not parse.
    pub weekday: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionView {
    pub id: String,
    pub label: String,
    pub prompt: String,
}

pub fn handbook_cards(config: &CompanyConfig) -> Vec<HandbookCard> {
    config
        .handbook_sections
        .iter()
        .enumerate()
        .map(|(index, s)| HandbookCard {
            index,
            title: s.title.clone(),
            content: s.content.clone(),
            prompt: handbook_prompt(&s.title, &config.name),
        })
        .collect()
}

pub fn holiday_entries(config: &CompanyConfig) -> Vec<HolidayEntry> {
    config.holidays.iter().map(holiday_entry).collect()
}

fn holiday_entry(holiday: &Holiday) -> HolidayEntry {
    match NaiveDate::parse_from_str(holiday.date.trim(), "%Y-%m-%d") {
        Ok(date) => HolidayEntry {
            name: holiday.name.clone(),
            date: holiday.date.clone(),
            day_month: date.format("%b %-d").to_string(),
            weekday: date.format("%A").to_string(),
        },
        Err(_) => HolidayEntry {
            name: holiday.name.clone(),
            date: holiday.date.clone(),
            day_month: holiday.date.clone(),
            weekday: String::new(),
        },
    }
}

pub fn quick_actions(config: &CompanyConfig) -> Vec<QuickActionView> {
    QuickAction::ALL
        .into_iter()
        .map(|a| QuickActionView {
            id: a.id().to_string(),
            label: a.label().to_string(),
            prompt: a.prompt(&config.name),
        })
        .collect()
}
