//! System instruction assembly.
//!
//! The knowledge base is rendered verbatim and in order. When it would grow
//! past the configured character cap, whole entries are dropped from the end
//! and a single marker line records how many were left out.

use hirehelp_schema::{CompanyConfig, HandbookSection, Holiday};

/// Appended to the chat instruction for live voice sessions.
pub const LIVE_VOICE_SUFFIX: &str =
    "You are now in a real-time voice conversation. Keep answers extremely short.";

pub fn build_system_instruction(config: &CompanyConfig, max_knowledge_chars: usize) -> String {
    let knowledge = KnowledgeBase::fit(config, max_knowledge_chars);
    if knowledge.omitted_sections > 0 || knowledge.omitted_holidays > 0 {
        tracing::warn!(
            company = %config.name,
            omitted_sections = knowledge.omitted_sections,
            omitted_holidays = knowledge.omitted_holidays,
            "knowledge base truncated to fit prompt"
        );
    }

    let name = &config.name;
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!(
        "You are HireHelp AI, a premium, professional smart onboarding assistant for employees at {name}.\n"
    ));
    out.push_str(&format!(
        "Your objective is to provide immediate, accurate answers based EXCLUSIVELY on the provided internal knowledge base for {name}.\n\n"
    ));
    out.push_str("INTERNAL DATA SOURCES:\n1. HANDBOOK SECTIONS:\n---\n");
    out.push_str(&knowledge.sections);
    out.push_str("\n---\n\n2. OFFICE HOLIDAYS:\n---\n");
    out.push_str(&knowledge.holidays);
    out.push_str("\n---\n");
    if let Some(marker) = knowledge.marker() {
        out.push_str(&marker);
        out.push('\n');
    }
    out.push_str("\nBEHAVIORAL RULES:\n");
    out.push_str(&format!("- Identify yourself as the assistant for {name}.\n"));
    out.push_str(
        "- If information is in the handbook, start with \"According to our company handbook...\".\n",
    );
    out.push_str(
        "- If information is in the holiday schedule, start with \"Based on our office calendar...\".\n",
    );
    out.push_str("- Use professional, warm, and encouraging language.\n");
    out.push_str("- Format responses with Markdown for clarity.\n");
    out.push_str("- If information is NOT available in the sources above, use the 'googleSearch' tool to find external help but prioritize internal data.\n");
    out.push_str("- Keep responses concise yet comprehensive.\n");
    out
}

pub fn build_live_instruction(config: &CompanyConfig, max_knowledge_chars: usize) -> String {
    format!(
        "{}\n{LIVE_VOICE_SUFFIX}",
        build_system_instruction(config, max_knowledge_chars)
    )
}

fn render_section(section: &HandbookSection) -> String {
    format!("SECTION: {}\nCONTENT: {}", section.title, section.content)
}

fn render_holiday(holiday: &Holiday) -> String {
    format!("- {}: {}", holiday.date, holiday.name)
}

struct KnowledgeBase {
    sections: String,
    holidays: String,
    omitted_sections: usize,
    omitted_holidays: usize,
}

impl KnowledgeBase {
    fn fit(config: &CompanyConfig, cap: usize) -> Self {
        let mut used = 0usize;
        let mut full = false;

        let mut admit = |rendered: String, sep: &str, buf: &mut String| -> bool {
            if full {
                return false;
            }
            let extra = if buf.is_empty() { 0 } else { sep.chars().count() };
            let cost = extra + rendered.chars().count();
            if used + cost > cap {
                full = true;
                return false;
            }
            used += cost;
            if !buf.is_empty() {
                buf.push_str(sep);
            }
            buf.push_str(&rendered);
            true
        };

        let mut sections = String::new();
        let mut omitted_sections = 0;
        for section in &config.handbook_sections {
            if !admit(render_section(section), "\n\n", &mut sections) {
                omitted_sections += 1;
            }
        }

        let mut holidays = String::new();
        let mut omitted_holidays = 0;
        for holiday in &config.holidays {
            if !admit(render_holiday(holiday), "\n", &mut holidays) {
                omitted_holidays += 1;
            }
        }

        Self {
            sections,
            holidays,
            omitted_sections,
            omitted_holidays,
        }
    }

    fn marker(&self) -> Option<String> {
        if self.omitted_sections == 0 && self.omitted_holidays == 0 {
            return None;
        }
        Some(format!(
            "[knowledge base truncated: {} handbook sections and {} holidays omitted]",
            self.omitted_sections, self.omitted_holidays
        ))
    }
}
