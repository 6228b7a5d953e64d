//! Calendar export and share links for a single reminder.

use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;
use url::Url;

use crate::category::Locale;
use crate::datetime::{format_compact_utc, parse_date_time};
use crate::reminder::Reminder;

const CALENDAR_BASE_URL: &str = "https://calendar.google.com/calendar/render";
const SHARE_BASE_URL: &str = "https://api.whatsapp.com/send";

pub const DEFAULT_EVENT_MINUTES: i64 = 60;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot create calendar event for invalid date/time (date: {date}, time: {time})")]
    Unresolved { date: String, time: String },

    #[error("invalid event duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("failed to build link: {0}")]
    Url(#[from] url::ParseError),
}

/// Builds a calendar "add event" link. Refuses reminders whose date does
/// not resolve to a real day rather than exporting a placeholder.
#[tracing::instrument(skip(reminder, tz), fields(id = reminder.id))]
pub fn calendar_url(reminder: &Reminder, tz: &Tz, duration: Duration) -> Result<Url, ExportError> {
    if duration <= Duration::zero() {
        return Err(ExportError::InvalidDuration(duration.num_minutes()));
    }

    let parsed = parse_date_time(&reminder.date, &reminder.time, tz);
    let start = match parsed.instant {
        Some(instant) if parsed.is_resolved() => instant,
        _ => {
            return Err(ExportError::Unresolved {
                date: reminder.date.clone(),
                time: reminder.time.clone(),
            });
        }
    };
    let end = start + duration;

    let dates = format!("{}/{}", format_compact_utc(start), format_compact_utc(end));
    let url = Url::parse_with_params(
        CALENDAR_BASE_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", reminder.title.as_str()),
            ("details", reminder.description.as_str()),
            ("dates", dates.as_str()),
        ],
    )?;

    tracing::debug!(%url, "built calendar link");
    Ok(url)
}

pub fn share_text(reminder: &Reminder, locale: Locale) -> String {
    let (heading, date, time, details) = match locale {
        Locale::It => ("Promemoria", "Data", "Ora", "Dettagli"),
        Locale::En => ("Reminder", "Date", "Time", "Details"),
    };
    format!(
        "{heading}: {}\n{date}: {}\n{time}: {}\n{details}: {}",
        reminder.title, reminder.date, reminder.time, reminder.description
    )
}

pub fn share_url(reminder: &Reminder, locale: Locale) -> Result<Url, ExportError> {
    let text = share_text(reminder, locale);
    Ok(Url::parse_with_params(SHARE_BASE_URL, &[("text", text.as_str())])?)
}
