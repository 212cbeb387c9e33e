//! Admin reconfiguration: turns pasted handbook and holiday text into a new
//! [`CompanyConfig`] with the help of the structuring model.

use anyhow::Result;
use hirehelp_provider::{GenerateRequest, GenerativeModel, ResponseFormat};
use hirehelp_schema::{CompanyConfig, HandbookSection, Holiday};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::AssistantSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptRequest {
    pub name: String,
    #[serde(default)]
    pub handbook_text: Option<String>,
    #[serde(default)]
    pub holidays_text: Option<String>,
}

impl AdoptRequest {
    fn handbook_blob(&self) -> Option<&str> {
        self.handbook_text.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn holidays_blob(&self) -> Option<&str> {
        self.holidays_text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdoptError {
    #[error("company name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Updated { count: usize },
    Retained { reason: String },
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionReport {
    pub config: CompanyConfig,
    pub handbook: FieldOutcome,
    pub holidays: FieldOutcome,
}

impl AdoptionReport {
    pub fn is_partial(&self) -> bool {
        matches!(self.handbook, FieldOutcome::Retained { .. })
            || matches!(self.holidays, FieldOutcome::Retained { .. })
    }
}

pub fn holidays_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "date": { "type": "STRING", "description": "ISO date string YYYY-MM-DD" },
                "name": { "type": "STRING", "description": "The holiday name" }
            },
            "required": ["date", "name"]
        }
    })
}

pub fn handbook_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "content": { "type": "STRING" }
            },
            "required": ["title", "content"]
        }
    })
}

fn holidays_prompt(text: &str, default_year: i32) -> String {
    format!(
        "Extract holidays from the following text and return them as a JSON array of objects with 'date' (format YYYY-MM-DD) and 'name'.\n\
         If the year is not specified, assume {default_year}. Text to parse:\n---\n{text}\n---"
    )
}

fn handbook_prompt(text: &str) -> String {
    format!(
        "Split the following company handbook text into 4-6 logical, well-organized sections.\n\
         Return a JSON array of objects with 'title' (short, uppercase) and 'content' (full paragraph). Text to parse:\n---\n{text}\n---"
    )
}

/// Result of one structuring call. `Err` is a transport failure; a reply
/// that does not parse is `Ok(Err(reason))`.
type Parsed<T> = Result<std::result::Result<Vec<T>, String>>;

async fn structure<T: DeserializeOwned>(
    model: &dyn GenerativeModel,
    model_name: &str,
    prompt: String,
    schema: serde_json::Value,
) -> Parsed<T> {
    let request = GenerateRequest::text(model_name, prompt)
        .with_format(ResponseFormat::Json { schema });
    let response = model.generate(request).await?;
    let raw = if response.text.trim().is_empty() {
        "[]"
    } else {
        response.text.as_str()
    };
    Ok(serde_json::from_str::<Vec<T>>(raw).map_err(|e| format!("invalid structured reply: {e}")))
}

async fn maybe<T, F>(blob: Option<&str>, call: F) -> Option<Parsed<T>>
where
    F: std::future::Future<Output = Parsed<T>>,
{
    match blob {
        Some(_) => Some(call.await),
        None => None,
    }
}

/// Builds the replacement config. Both structuring calls run concurrently;
/// a reply that does not parse leaves only its own field untouched, while a
/// transport failure on either call keeps both fields and changes only the
/// name.
pub async fn build_adoption(
    model: &dyn GenerativeModel,
    settings: &AssistantSettings,
    current: &CompanyConfig,
    request: &AdoptRequest,
) -> std::result::Result<AdoptionReport, AdoptError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AdoptError::EmptyName);
    }

    let handbook_blob = request.handbook_blob();
    let holidays_blob = request.holidays_blob();

    let (handbook, holidays) = tokio::join!(
        maybe(
            handbook_blob,
            structure::<HandbookSection>(
                model,
                &settings.structuring_model,
                handbook_prompt(handbook_blob.unwrap_or_default()),
                handbook_schema(),
            )
        ),
        maybe(
            holidays_blob,
            structure::<Holiday>(
                model,
                &settings.structuring_model,
                holidays_prompt(
                    holidays_blob.unwrap_or_default(),
                    settings.default_holiday_year
                ),
                holidays_schema(),
            )
        ),
    );

    let transport_error = [
        handbook.as_ref().and_then(|r| r.as_ref().err()),
        holidays.as_ref().and_then(|r| r.as_ref().err()),
    ]
    .into_iter()
    .flatten()
    .next()
    .map(|e| e.to_string());

    if let Some(err) = transport_error {
        tracing::error!(error = %err, company = %name, "structuring failed, updating name only");
        let reason = format!("structuring call failed: {err}");
        let retained = |blob: Option<&str>| match blob {
            Some(_) => FieldOutcome::Retained {
                reason: reason.clone(),
            },
            None => FieldOutcome::Unchanged,
        };
        return Ok(AdoptionReport {
            config: current.renamed(name),
            handbook: retained(handbook_blob),
            holidays: retained(holidays_blob),
        });
    }

    let mut config = current.renamed(name);
    let handbook = apply(handbook, &mut config.handbook_sections, "handbook");
    let holidays = apply(holidays, &mut config.holidays, "holidays");

    let report = AdoptionReport {
        config,
        handbook,
        holidays,
    };
    if report.is_partial() {
        tracing::warn!(
            company = %name,
            handbook = ?report.handbook,
            holidays = ?report.holidays,
            "company adopted with retained fields"
        );
    }
    Ok(report)
}

fn apply<T>(parsed: Option<Parsed<T>>, slot: &mut Vec<T>, field: &str) -> FieldOutcome {
    match parsed {
        None => FieldOutcome::Unchanged,
        Some(Ok(Ok(items))) => {
            let count = items.len();
            *slot = items;
            FieldOutcome::Updated { count }
        }
        Some(Ok(Err(reason))) => {
            tracing::error!(field, %reason, "failed to parse structured reply");
            FieldOutcome::Retained { reason }
        }
        // Transport failures are handled before any field is applied.
        Some(Err(e)) => FieldOutcome::Retained {
            reason: e.to_string(),
        },
    }
}
