use serde::{Deserialize, Serialize};

/// Marker the extraction model writes when a field was not mentioned.
pub const NOT_AVAILABLE: &str = "N/A";

const DEFAULT_TITLE: &str = "Untitled Reminder";
const DEFAULT_DESCRIPTION: &str = "No description provided.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "not_available")]
    pub date: String,

    #[serde(default = "not_available")]
    pub time: String,
}

impl Reminder {
    pub fn new(id: u64, title: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            date: NOT_AVAILABLE.to_string(),
            time: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn has_date(&self) -> bool {
        !is_not_available(&self.date)
    }

    pub fn has_time(&self) -> bool {
        !is_not_available(&self.time)
    }
}

/// Structured output of the transcript extraction step. Every field may be
/// missing or blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl ReminderDraft {
    pub fn into_reminder(self, id: u64) -> Reminder {
        Reminder {
            id,
            title: or_default(self.title, DEFAULT_TITLE),
            description: or_default(self.description, DEFAULT_DESCRIPTION),
            date: or_default(self.date, NOT_AVAILABLE),
            time: or_default(self.time, NOT_AVAILABLE),
        }
    }

    /// Merges this draft over an existing reminder. Only fields the draft
    /// actually carries replace the old values; an explicit "N/A" clears a
    /// date or time.
    pub fn apply_to(self, reminder: &mut Reminder) {
        if let Some(title) = non_blank(self.title) {
            reminder.title = title;
        }
        if let Some(description) = non_blank(self.description) {
            reminder.description = description;
        }
        if let Some(date) = non_blank(self.date) {
            reminder.date = date;
        }
        if let Some(time) = non_blank(self.time) {
            reminder.time = time;
        }
    }
}

pub fn is_not_available(value: &str) -> bool {
    value.trim() == NOT_AVAILABLE
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    non_blank(value).unwrap_or_else(|| fallback.to_string())
}
