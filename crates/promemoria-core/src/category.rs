use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::datetime::{dated_instant, parse_reminder_date};
use crate::reminder::Reminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    It,
    En,
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "it" | "it-it" | "italian" => Ok(Self::It),
            "en" | "en-us" | "en-gb" | "english" => Ok(Self::En),
            other => Err(anyhow!("unsupported locale: {other}")),
        }
    }
}

/// Urgency buckets. Variant order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Upcoming,
    Undated,
    InvalidDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Past,
    Urgent,
    Soon,
    Upcoming,
}

impl Priority {
    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::It, Priority::Past) => "passato",
            (Locale::It, Priority::Urgent) => "urgente",
            (Locale::It, Priority::Soon) => "a breve",
            (Locale::It, Priority::Upcoming) => "in arrivo",
            (Locale::En, Priority::Past) => "past",
            (Locale::En, Priority::Urgent) => "urgent",
            (Locale::En, Priority::Soon) => "soon",
            (Locale::En, Priority::Upcoming) => "upcoming",
        }
    }
}

impl Bucket {
    /// Slots shown to the user, in order. Invalid dates share the
    /// undated slot.
    pub const DISPLAY_ORDER: [Bucket; 6] = [
        Bucket::Overdue,
        Bucket::Today,
        Bucket::Tomorrow,
        Bucket::ThisWeek,
        Bucket::Upcoming,
        Bucket::Undated,
    ];

    pub fn display_slot(self) -> Bucket {
        match self {
            Bucket::InvalidDate => Bucket::Undated,
            other => other,
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::It, Bucket::Overdue) => "Scaduto",
            (Locale::It, Bucket::Today) => "Oggi",
            (Locale::It, Bucket::Tomorrow) => "Domani",
            (Locale::It, Bucket::ThisWeek) => "Questa settimana",
            (Locale::It, Bucket::Upcoming) => "Prossimi",
            (Locale::It, Bucket::Undated) => "Senza data",
            (Locale::It, Bucket::InvalidDate) => "Data non valida",
            (Locale::En, Bucket::Overdue) => "Overdue",
            (Locale::En, Bucket::Today) => "Today",
            (Locale::En, Bucket::Tomorrow) => "Tomorrow",
            (Locale::En, Bucket::ThisWeek) => "This week",
            (Locale::En, Bucket::Upcoming) => "Upcoming",
            (Locale::En, Bucket::Undated) => "No date",
            (Locale::En, Bucket::InvalidDate) => "Invalid date",
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            Bucket::Overdue => Priority::Past,
            Bucket::Today => Priority::Urgent,
            Bucket::Tomorrow | Bucket::ThisWeek => Priority::Soon,
            Bucket::Upcoming | Bucket::Undated | Bucket::InvalidDate => Priority::Upcoming,
        }
    }

    /// SGR color code used when painting this bucket on a terminal.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Bucket::Overdue => "1;31",
            Bucket::Today => "31",
            Bucket::Tomorrow => "38;5;208",
            Bucket::ThisWeek => "33",
            Bucket::Upcoming => "32",
            Bucket::Undated | Bucket::InvalidDate => "90",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

/// One consistent view of "now". Capture it once per batch so every
/// reminder is judged against the same instant.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub now: DateTime<Utc>,
    pub tz: Tz,
    pub locale: Locale,
}

impl Snapshot {
    pub fn new(now: DateTime<Utc>, tz: Tz, locale: Locale) -> Self {
        Self { now, tz, locale }
    }

    pub fn capture(tz: Tz, locale: Locale) -> Self {
        Self::new(Utc::now(), tz, locale)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized {
    pub bucket: Bucket,
    pub relative: String,
    pub overdue: bool,
}

impl Categorized {
    fn without_instant(bucket: Bucket) -> Self {
        Self {
            bucket,
            relative: String::new(),
            overdue: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedReminder<'a> {
    pub reminder: &'a Reminder,
    pub info: Categorized,
}

pub type Grouping<'a> = BTreeMap<Bucket, Vec<CategorizedReminder<'a>>>;

pub fn categorize(reminder: &Reminder, snapshot: &Snapshot) -> Categorized {
    if !reminder.has_date() || !reminder.has_time() {
        return Categorized::without_instant(Bucket::Undated);
    }

    let instant = parse_reminder_date(&reminder.date)
        .and_then(|day| dated_instant(day, &reminder.time, &snapshot.tz));
    let Some(instant) = instant else {
        tracing::debug!(id = reminder.id, date = %reminder.date, "reminder date is invalid");
        return Categorized::without_instant(Bucket::InvalidDate);
    };

    let bucket = bucket_for(instant, snapshot);
    Categorized {
        bucket,
        relative: relative_label(instant, snapshot.now, snapshot.locale),
        overdue: bucket == Bucket::Overdue,
    }
}

fn bucket_for(instant: DateTime<Utc>, snapshot: &Snapshot) -> Bucket {
    if instant < snapshot.now {
        return Bucket::Overdue;
    }

    let today = snapshot.now.with_timezone(&snapshot.tz).date_naive();
    let day = instant.with_timezone(&snapshot.tz).date_naive();

    if day == today {
        Bucket::Today
    } else if Some(day) == today.succ_opt() {
        Bucket::Tomorrow
    } else if today
        .checked_add_signed(Duration::days(7))
        .is_some_and(|week_end| day <= week_end)
    {
        Bucket::ThisWeek
    } else {
        Bucket::Upcoming
    }
}

/// Human readable distance from `now`, using only the largest whole unit.
pub fn relative_label(instant: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> String {
    let diff = instant - now;

    if diff < Duration::zero() {
        let past = -diff;
        let days = past.num_days();
        let hours = past.num_hours();
        return match locale {
            Locale::It if days > 0 => format!("{days} {} fa", plural(days, "giorno", "giorni")),
            Locale::It if hours > 0 => format!("{hours} {} fa", plural(hours, "ora", "ore")),
            Locale::It => "Appena scaduto".to_string(),
            Locale::En if days > 0 => format!("{days} {} ago", plural(days, "day", "days")),
            Locale::En if hours > 0 => format!("{hours} {} ago", plural(hours, "hour", "hours")),
            Locale::En => "Just expired".to_string(),
        };
    }

    let days = diff.num_days();
    let hours = diff.num_hours();
    let minutes = diff.num_minutes();
    match locale {
        Locale::It if days > 0 => format!("Fra {days} {}", plural(days, "giorno", "giorni")),
        Locale::It if hours > 0 => format!("Fra {hours} {}", plural(hours, "ora", "ore")),
        Locale::It if minutes > 0 => {
            format!("Fra {minutes} {}", plural(minutes, "minuto", "minuti"))
        }
        Locale::It => "Adesso!".to_string(),
        Locale::En if days > 0 => format!("in {days} {}", plural(days, "day", "days")),
        Locale::En if hours > 0 => format!("in {hours} {}", plural(hours, "hour", "hours")),
        Locale::En if minutes > 0 => {
            format!("in {minutes} {}", plural(minutes, "minute", "minutes"))
        }
        Locale::En => "Now!".to_string(),
    }
}

fn plural(n: i64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

/// Partitions reminders into the display slots, keeping input order
/// inside each slot. Sort chronologically before calling.
#[tracing::instrument(skip_all, fields(count = reminders.len()))]
pub fn group_by_urgency<'a>(reminders: &'a [Reminder], snapshot: &Snapshot) -> Grouping<'a> {
    let mut groups: Grouping<'a> = Bucket::DISPLAY_ORDER
        .iter()
        .map(|bucket| (*bucket, Vec::new()))
        .collect();

    for reminder in reminders {
        let info = categorize(reminder, snapshot);
        groups
            .entry(info.bucket.display_slot())
            .or_default()
            .push(CategorizedReminder { reminder, info });
    }

    groups
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use chrono_tz::Europe::Rome;

    use super::{
        Bucket, Locale, Priority, Snapshot, categorize, group_by_urgency, relative_label,
    };
    use crate::datetime::sort_reminders;
    use crate::reminder::Reminder;

    fn rome(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Rome.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid local time")
            .with_timezone(&Utc)
    }

    fn snapshot_at(now: DateTime<Utc>) -> Snapshot {
        Snapshot::new(now, Rome, Locale::It)
    }

    fn reminder(id: u64, date: &str, time: &str) -> Reminder {
        let mut r = Reminder::new(id, format!("r{id}"));
        r.date = date.to_string();
        r.time = time.to_string();
        r
    }

    #[test]
    fn same_day_later_is_today_with_hours_label() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let info = categorize(&reminder(1, "Tuesday, July 16, 2024", "10:30 AM"), &snap);
        assert_eq!(info.bucket, Bucket::Today);
        assert_eq!(info.relative, "Fra 2 ore");
        assert!(!info.overdue);

        let en = Snapshot::new(snap.now, Rome, Locale::En);
        let info = categorize(&reminder(1, "Tuesday, July 16, 2024", "10:30 AM"), &en);
        assert_eq!(info.relative, "in 2 hours");
    }

    #[test]
    fn missing_fields_are_undated() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        for (date, time) in [
            ("N/A", "N/A"),
            ("N/A", "5:00 PM"),
            ("Tuesday, July 16, 2024", "N/A"),
        ] {
            let info = categorize(&reminder(1, date, time), &snap);
            assert_eq!(info.bucket, Bucket::Undated, "{date} / {time}");
            assert_eq!(info.relative, "");
            assert!(!info.overdue);
        }
    }

    #[test]
    fn unparseable_date_is_invalid_not_undated() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let info = categorize(&reminder(1, "next tuesday", "10:30 AM"), &snap);
        assert_eq!(info.bucket, Bucket::InvalidDate);
        assert_eq!(info.relative, "");
        assert!(!info.overdue);
    }

    #[test]
    fn skipped_local_time_is_invalid() {
        let snap = snapshot_at(rome(2024, 3, 30, 12, 0));
        let info = categorize(&reminder(1, "Sunday, March 31, 2024", "2:30 AM"), &snap);
        assert_eq!(info.bucket, Bucket::InvalidDate);
        assert_eq!(info.relative, "");
        assert!(!info.overdue);
    }

    #[test]
    fn priority_tiers_follow_urgency() {
        let tiers: Vec<Priority> = [
            Bucket::Overdue,
            Bucket::Today,
            Bucket::Tomorrow,
            Bucket::ThisWeek,
            Bucket::Upcoming,
            Bucket::Undated,
            Bucket::InvalidDate,
        ]
        .into_iter()
        .map(Bucket::priority)
        .collect();
        assert_eq!(
            tiers,
            vec![
                Priority::Past,
                Priority::Urgent,
                Priority::Soon,
                Priority::Soon,
                Priority::Upcoming,
                Priority::Upcoming,
                Priority::Upcoming,
            ]
        );
        assert_eq!(Priority::Urgent.label(Locale::It), "urgente");
    }

    #[test]
    fn earlier_days_are_overdue() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let info = categorize(&reminder(1, "Monday, July 15, 2024", "11:00 PM"), &snap);
        assert_eq!(info.bucket, Bucket::Overdue);
        assert!(info.overdue);
        assert_eq!(info.relative, "9 ore fa");

        let info = categorize(&reminder(2, "Friday, July 12, 2024", "9:00 AM"), &snap);
        assert_eq!(info.relative, "3 giorni fa");
    }

    #[test]
    fn earlier_today_is_overdue() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let info = categorize(&reminder(1, "Tuesday, July 16, 2024", "7:40 AM"), &snap);
        assert_eq!(info.bucket, Bucket::Overdue);
        assert_eq!(info.relative, "Appena scaduto");
    }

    #[test]
    fn day_boundaries_use_local_midnight() {
        let snap = snapshot_at(rome(2024, 7, 16, 23, 30));
        let info = categorize(&reminder(1, "Wednesday, July 17, 2024", "1:00 AM"), &snap);
        assert_eq!(info.bucket, Bucket::Tomorrow);
        assert_eq!(info.relative, "Fra 1 ora");
    }

    #[test]
    fn week_window_is_inclusive() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let cases = [
            ("Thursday, July 18, 2024", Bucket::ThisWeek),
            ("Tuesday, July 23, 2024", Bucket::ThisWeek),
            ("Wednesday, July 24, 2024", Bucket::Upcoming),
        ];
        for (date, expected) in cases {
            let info = categorize(&reminder(1, date, "9:00 AM"), &snap);
            assert_eq!(info.bucket, expected, "{date}");
        }
    }

    #[test]
    fn categorize_is_idempotent_for_fixed_snapshot() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let r = reminder(1, "Thursday, July 18, 2024", "9:00 AM");
        assert_eq!(categorize(&r, &snap), categorize(&r, &snap));
    }

    #[test]
    fn relative_label_uses_largest_unit() {
        let now = rome(2024, 7, 16, 8, 0);
        let cases = [
            (Duration::days(1) + Duration::hours(5), "Fra 1 giorno"),
            (Duration::days(3), "Fra 3 giorni"),
            (Duration::minutes(61), "Fra 1 ora"),
            (Duration::minutes(1), "Fra 1 minuto"),
            (Duration::minutes(45), "Fra 45 minuti"),
            (Duration::seconds(30), "Adesso!"),
            (Duration::zero(), "Adesso!"),
            (-Duration::minutes(90), "1 ora fa"),
            (-Duration::days(2), "2 giorni fa"),
        ];
        for (offset, expected) in cases {
            assert_eq!(relative_label(now + offset, now, Locale::It), expected);
        }
        assert_eq!(
            relative_label(now - Duration::seconds(10), now, Locale::En),
            "Just expired"
        );
        assert_eq!(relative_label(now, now, Locale::En), "Now!");
    }

    #[test]
    fn grouping_keeps_every_slot_and_chronology() {
        let snap = snapshot_at(rome(2024, 7, 16, 8, 0));
        let mut rows = vec![
            reminder(1, "N/A", "N/A"),
            reminder(2, "Monday, July 15, 2024", "6:00 PM"),
            reminder(3, "garbage", "1:00 PM"),
            reminder(4, "Monday, July 15, 2024", "9:00 AM"),
            reminder(5, "Tuesday, July 16, 2024", "10:30 AM"),
        ];
        sort_reminders(&mut rows, &snap.tz);
        let groups = group_by_urgency(&rows, &snap);

        let slots: Vec<Bucket> = groups.keys().copied().collect();
        assert_eq!(slots, Bucket::DISPLAY_ORDER.to_vec());

        let overdue: Vec<u64> = groups[&Bucket::Overdue]
            .iter()
            .map(|e| e.reminder.id)
            .collect();
        assert_eq!(overdue, vec![4, 2]);
        assert!(groups[&Bucket::Overdue].iter().all(|e| e.info.overdue));

        assert_eq!(groups[&Bucket::Today].len(), 1);
        assert!(groups[&Bucket::Tomorrow].is_empty());

        let undated: Vec<(u64, Bucket)> = groups[&Bucket::Undated]
            .iter()
            .map(|e| (e.reminder.id, e.info.bucket))
            .collect();
        assert_eq!(undated, vec![(1, Bucket::Undated), (3, Bucket::InvalidDate)]);
    }

    #[test]
    fn parses_locales() {
        assert_eq!("IT".parse::<Locale>().expect("it"), Locale::It);
        assert_eq!("en-US".parse::<Locale>().expect("en"), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}
