use crate::{CompanyConfig, HandbookSection, Holiday};

pub const DEFAULT_COMPANY_NAME: &str = "HireHelp";

/// A handbook entry baked into the binary.
struct SectionPreset {
    title: &'static str,
    content: &'static str,
}

const HANDBOOK_PRESETS: &[SectionPreset] = &[
    SectionPreset {
        title: "Leave Policy",
        content: "Employees are entitled to 20 days of paid leave per year. Application for leave should be submitted via the HR Portal and approved by the direct manager at least two weeks in advance. Unused leave balance does not carry over to the next calendar year. For emergency leave, notify your supervisor immediately.",
    },
    SectionPreset {
        title: "Office Timing",
        content: "Standard operating hours are 9:00 AM to 6:00 PM, Monday through Friday. Core hours for meetings are 10:00 AM to 4:00 PM. A mandatory 1-hour lunch break is scheduled between 12:30 PM and 1:30 PM. Flexible start times between 8:00 AM and 10:00 AM are available with manager approval.",
    },
    SectionPreset {
        title: "Dress Code",
        content: "The company maintains a professional image. Business casual is required from Monday to Thursday (e.g., chinos, slacks, blouses, collared shirts). On 'Casual Fridays', employees may wear jeans and sneakers, provided they are clean and in good repair. Logo-branded company apparel is always encouraged.",
    },
    SectionPreset {
        title: "Remote Work & Hybrid Model",
        content: "We operate on a hybrid model. Staff are required to be in the physical office at least 3 days per week. Mondays and Wednesdays are 'anchor days' where the entire team is present for synchronization and collaboration. Remote work days must be logged in the team calendar.",
    },
    SectionPreset {
        title: "Equipment & IT Support",
        content: "New hires receive a high-spec laptop, external monitor, and ergonomic peripheral kit. For technical issues, contact the IT Helpdesk at ext. 404 or raise a ticket on the internal ServiceDesk portal.",
    },
];

const HOLIDAY_PRESETS: &[(&str, &str)] = &[
    ("2024-01-01", "New Year's Day"),
    ("2024-01-15", "Martin Luther King Jr. Day"),
    ("2024-05-27", "Memorial Day"),
    ("2024-06-19", "Juneteenth"),
    ("2024-07-04", "Independence Day"),
    ("2024-09-02", "Labor Day"),
    ("2024-11-11", "Veterans Day"),
    ("2024-11-28", "Thanksgiving Day"),
    ("2024-11-29", "Day after Thanksgiving"),
    ("2024-12-25", "Christmas Day"),
];

/// The knowledge base every process starts with.
pub fn default_company() -> CompanyConfig {
    CompanyConfig {
        name: DEFAULT_COMPANY_NAME.to_string(),
        handbook_sections: HANDBOOK_PRESETS
            .iter()
            .map(|p| HandbookSection::new(p.title, p.content))
            .collect(),
        holidays: HOLIDAY_PRESETS
            .iter()
            .map(|(date, name)| Holiday::new(*date, *name))
            .collect(),
    }
}
