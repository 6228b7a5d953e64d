use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::reminder::{
  Reminder,
  is_not_available
};

pub const TIMEZONE_ENV_VAR: &str =
  "PROMEMORIA_TIMEZONE";
pub const DEFAULT_TIMEZONE: &str =
  "Europe/Rome";

const COMPACT_UTC_FORMAT: &str =
  "%Y%m%dT%H%M%SZ";

/// Date layouts accepted after the
/// leading weekday token is dropped.
const DATE_FORMATS: [&str; 4] = [
  "%B %d, %Y",
  "%B %d %Y",
  "%d %B %Y",
  "%Y-%m-%d"
];

/// How much of a reminder's date/time
/// pair could be turned into an
/// instant.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Resolution {
  /// Date and clock time both parsed.
  Full,
  /// Only the date parsed; the instant
  /// sits at end of day (time missing)
  /// or midnight (time unreadable).
  DateOnly,
  /// Date missing but a time was given.
  /// The instant is a far-future pin
  /// used for ordering only.
  Placeholder,
  Unresolved
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ParsedInstant {
  pub instant:    Option<DateTime<Utc>>,
  pub resolution: Resolution
}

impl ParsedInstant {
  fn unresolved() -> Self {
    Self {
      instant:    None,
      resolution: Resolution::Unresolved
    }
  }

  #[must_use]
  pub fn is_fully_resolved(
    &self
  ) -> bool {
    self.resolution == Resolution::Full
  }

  /// True when the instant reflects a
  /// real calendar date.
  #[must_use]
  pub fn is_resolved(&self) -> bool {
    matches!(
      self.resolution,
      Resolution::Full
        | Resolution::DateOnly
    )
  }
}

/// Picks the zone reminders are read
/// in: the environment variable first,
/// then the configured id, then the
/// built-in default.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  let from_env =
    std::env::var(TIMEZONE_ENV_VAR).ok();
  pick_timezone(
    from_env.as_deref(),
    configured
  )
}

fn pick_timezone(
  from_env: Option<&str>,
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = from_env
    && let Some(tz) = parse_timezone(
      raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "DEFAULT_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Converts a wall-clock time in `tz`
/// to UTC. Times skipped by a DST
/// transition have no instant.
pub fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Some(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Some(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      tracing::debug!(
        local = %local_naive,
        "local datetime does not exist in timezone"
      );
      None
    }
  }
}

/// Parses `"<Weekday>, <Month> <Day>,
/// <Year>"`. The weekday token is
/// dropped without being checked.
pub fn parse_reminder_date(
  raw: &str
) -> Option<NaiveDate> {
  let (_weekday, rest) =
    raw.trim().split_once(", ")?;
  let rest = rest.trim();

  DATE_FORMATS.iter().find_map(|fmt| {
    NaiveDate::parse_from_str(rest, fmt)
      .ok()
  })
}

fn clock_regex() -> Option<&'static Regex>
{
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)$",
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "internal regex compile failure"
        );
      })
      .ok()
    })
    .as_ref()
}

/// Parses `"H:MM AM"` / `"HH:MM pm"`
/// into 24-hour `(hour, minute)`.
pub fn parse_clock_time(
  raw: &str
) -> Option<(u32, u32)> {
  let captures =
    clock_regex()?.captures(raw.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59
    || raw_hour == 0
    || raw_hour > 12
  {
    return None;
  }

  let ampm = captures
    .name("ampm")?
    .as_str()
    .to_ascii_lowercase();
  let hour = match ampm.as_str() {
    | "am" => {
      if raw_hour == 12 {
        0
      } else {
        raw_hour
      }
    }
    | "pm" => {
      if raw_hour == 12 {
        12
      } else {
        raw_hour + 12
      }
    }
    | _ => return None
  };

  Some((hour, minute))
}

/// The instant a dated reminder points
/// at: its date at the given clock
/// time, or local midnight when the
/// time string is not a clock time.
pub(crate) fn dated_instant(
  date: NaiveDate,
  time: &str,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let time_of_day =
    match parse_clock_time(time) {
      | Some((hour, minute)) => {
        NaiveTime::from_hms_opt(
          hour, minute, 0
        )?
      }
      | None => {
        NaiveTime::from_hms_opt(0, 0, 0)?
      }
    };
  to_utc_from_local(
    date.and_time(time_of_day),
    tz
  )
}

fn placeholder_instant()
-> Option<DateTime<Utc>> {
  Utc
    .with_ymd_and_hms(
      2099, 12, 31, 0, 0, 0
    )
    .single()
}

/// Turns a reminder's date and time
/// strings into something sortable.
/// Never fails: malformed input yields
/// [`Resolution::Unresolved`].
pub fn parse_date_time(
  date: &str,
  time: &str,
  tz: &Tz
) -> ParsedInstant {
  let date_missing =
    is_not_available(date);
  let time_missing =
    is_not_available(time);

  if date_missing && time_missing {
    return ParsedInstant::unresolved();
  }

  if date_missing {
    return ParsedInstant {
      instant:    placeholder_instant(),
      resolution: Resolution::Placeholder
    };
  }

  let Some(day) =
    parse_reminder_date(date)
  else {
    tracing::debug!(
      date,
      "unparseable reminder date"
    );
    return ParsedInstant::unresolved();
  };

  if time_missing {
    let instant = day
      .and_hms_milli_opt(
        23, 59, 59, 999
      )
      .and_then(|end_of_day| {
        to_utc_from_local(
          end_of_day, tz
        )
      });
    return match instant {
      | Some(instant) => {
        ParsedInstant {
          instant:    Some(instant),
          resolution:
            Resolution::DateOnly
        }
      }
      | None => {
        ParsedInstant::unresolved()
      }
    };
  }

  let resolution =
    if parse_clock_time(time).is_some()
    {
      Resolution::Full
    } else {
      tracing::debug!(
        time,
        "time is not a clock time; \
         using midnight"
      );
      Resolution::DateOnly
    };

  match dated_instant(day, time, tz) {
    | Some(instant) => {
      ParsedInstant {
        instant: Some(instant),
        resolution
      }
    }
    | None => {
      ParsedInstant::unresolved()
    }
  }
}

/// Sort key: reminders with an instant
/// come first, in chronological order.
pub fn sort_key(
  reminder: &Reminder,
  tz: &Tz
) -> (bool, Option<DateTime<Utc>>) {
  let parsed = parse_date_time(
    &reminder.date,
    &reminder.time,
    tz
  );
  (parsed.instant.is_none(), parsed.instant)
}

pub fn compare_reminders(
  a: &Reminder,
  b: &Reminder,
  tz: &Tz
) -> Ordering {
  sort_key(a, tz).cmp(&sort_key(b, tz))
}

/// Stable chronological sort; reminders
/// without an instant keep their
/// relative order at the end.
pub fn sort_reminders(
  reminders: &mut [Reminder],
  tz: &Tz
) {
  reminders.sort_by_cached_key(|r| {
    sort_key(r, tz)
  });
}

#[must_use]
pub fn format_compact_utc(
  dt: DateTime<Utc>
) -> String {
  dt.format(COMPACT_UTC_FORMAT)
    .to_string()
}

#[cfg(test)]
mod tests {
  use std::cmp::Ordering;

  use chrono::{
    NaiveDate,
    TimeZone,
    Timelike,
    Utc
  };
  use chrono_tz::Europe::Rome;

  use super::{
    Resolution,
    compare_reminders,
    format_compact_utc,
    parse_clock_time,
    parse_date_time,
    parse_reminder_date,
    pick_timezone,
    sort_reminders,
    to_utc_from_local
  };
  use crate::reminder::Reminder;

  fn reminder(
    id: u64,
    date: &str,
    time: &str
  ) -> Reminder {
    let mut r = Reminder::new(
      id,
      format!("r{id}")
    );
    r.date = date.to_string();
    r.time = time.to_string();
    r
  }

  #[test]
  fn parses_noon_and_midnight() {
    assert_eq!(
      parse_clock_time("12:00 PM"),
      Some((12, 0))
    );
    assert_eq!(
      parse_clock_time("12:00 AM"),
      Some((0, 0))
    );
    assert_eq!(
      parse_clock_time("5:07pm"),
      Some((17, 7))
    );
    assert_eq!(
      parse_clock_time("9:15 am"),
      Some((9, 15))
    );
  }

  #[test]
  fn rejects_malformed_clock_times() {
    for raw in [
      "13:00 PM", "0:30 AM", "10:60 AM",
      "10:30", "ten thirty", ""
    ] {
      assert_eq!(
        parse_clock_time(raw),
        None,
        "{raw}"
      );
    }
  }

  #[test]
  fn drops_weekday_without_checking_it()
  {
    let expected =
      NaiveDate::from_ymd_opt(
        2024, 7, 16
      );
    assert_eq!(
      parse_reminder_date(
        "Tuesday, July 16, 2024"
      ),
      expected
    );
    assert_eq!(
      parse_reminder_date(
        "Sunday, Jul 16, 2024"
      ),
      expected
    );
    assert_eq!(
      parse_reminder_date(
        "July 16 2024"
      ),
      None
    );
    assert_eq!(
      parse_reminder_date(
        "Tuesday, Juvember 16, 2024"
      ),
      None
    );
  }

  #[test]
  fn both_missing_is_unresolved() {
    let parsed =
      parse_date_time("N/A", "N/A", &Rome);
    assert_eq!(parsed.instant, None);
    assert_eq!(
      parsed.resolution,
      Resolution::Unresolved
    );
  }

  #[test]
  fn missing_date_pins_far_future() {
    let parsed = parse_date_time(
      "N/A", "5:00 PM", &Rome
    );
    assert_eq!(
      parsed.resolution,
      Resolution::Placeholder
    );
    assert!(!parsed.is_resolved());
    assert_eq!(
      parsed.instant,
      Utc
        .with_ymd_and_hms(
          2099, 12, 31, 0, 0, 0
        )
        .single()
    );
  }

  #[test]
  fn missing_time_uses_end_of_day() {
    let parsed = parse_date_time(
      "Tuesday, July 16, 2024",
      "N/A",
      &Rome
    );
    assert_eq!(
      parsed.resolution,
      Resolution::DateOnly
    );
    let local = parsed
      .instant
      .expect("instant")
      .with_timezone(&Rome);
    assert_eq!(
      local.format("%Y-%m-%d %H:%M:%S")
        .to_string(),
      "2024-07-16 23:59:59"
    );
    assert_eq!(
      local.nanosecond(),
      999_000_000
    );
  }

  #[test]
  fn full_date_and_time_resolve_in_zone()
  {
    let parsed = parse_date_time(
      "Tuesday, July 16, 2024",
      "10:30 AM",
      &Rome
    );
    assert!(parsed.is_fully_resolved());
    assert_eq!(
      parsed.instant,
      Utc
        .with_ymd_and_hms(
          2024, 7, 16, 8, 30, 0
        )
        .single()
    );
  }

  #[test]
  fn unreadable_time_falls_back_to_midnight()
  {
    let parsed = parse_date_time(
      "Tuesday, July 16, 2024",
      "dopo pranzo",
      &Rome
    );
    assert_eq!(
      parsed.resolution,
      Resolution::DateOnly
    );
    assert_eq!(
      parsed
        .instant
        .expect("instant")
        .with_timezone(&Rome)
        .format("%H:%M")
        .to_string(),
      "00:00"
    );
  }

  #[test]
  fn garbage_date_is_unresolved() {
    let parsed = parse_date_time(
      "someday", "10:30 AM", &Rome
    );
    assert_eq!(
      parsed.resolution,
      Resolution::Unresolved
    );
  }

  #[test]
  fn unresolved_sorts_after_resolved() {
    let dated = reminder(
      1,
      "Tuesday, July 16, 2024",
      "10:30 AM"
    );
    let undated =
      reminder(2, "N/A", "N/A");
    assert_eq!(
      compare_reminders(
        &dated, &undated, &Rome
      ),
      Ordering::Less
    );
    assert_eq!(
      compare_reminders(
        &undated, &dated, &Rome
      ),
      Ordering::Greater
    );
    assert_eq!(
      compare_reminders(
        &undated,
        &reminder(3, "garbage", "N/A"),
        &Rome
      ),
      Ordering::Equal
    );
  }

  #[test]
  fn sort_is_chronological_and_stable()
  {
    let mut rows = vec![
      reminder(1, "N/A", "N/A"),
      reminder(
        2,
        "Wednesday, July 17, 2024",
        "9:00 AM"
      ),
      reminder(3, "N/A", "5:00 PM"),
      reminder(4, "nonsense", "N/A"),
      reminder(
        5,
        "Tuesday, July 16, 2024",
        "11:00 PM"
      ),
      reminder(
        6,
        "Tuesday, July 16, 2024",
        "8:00 AM"
      ),
    ];
    sort_reminders(&mut rows, &Rome);
    let ids: Vec<u64> =
      rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![6, 5, 2, 3, 1, 4]);
  }

  #[test]
  fn formats_compact_utc() {
    let dt = Utc
      .with_ymd_and_hms(
        2024, 7, 16, 8, 30, 5
      )
      .single()
      .expect("valid dt");
    assert_eq!(
      format_compact_utc(dt),
      "20240716T083005Z"
    );
  }

  #[test]
  fn skipped_local_time_has_no_instant()
  {
    let parsed = parse_date_time(
      "Sunday, March 31, 2024",
      "2:30 AM",
      &Rome
    );
    assert_eq!(parsed.instant, None);
    assert_eq!(
      parsed.resolution,
      Resolution::Unresolved
    );

    let gap = NaiveDate::from_ymd_opt(
      2024, 3, 31
    )
    .and_then(|d| {
      d.and_hms_opt(2, 30, 0)
    })
    .expect("naive");
    assert_eq!(
      to_utc_from_local(gap, &Rome),
      None
    );
  }

  #[test]
  fn repeated_local_time_takes_earliest()
  {
    let parsed = parse_date_time(
      "Sunday, October 27, 2024",
      "2:30 AM",
      &Rome
    );
    let expected = Utc
      .with_ymd_and_hms(
        2024, 10, 27, 0, 30, 0
      )
      .single()
      .expect("valid dt");
    assert_eq!(
      parsed.instant,
      Some(expected)
    );
    assert_eq!(
      parsed.resolution,
      Resolution::Full
    );
  }

  #[test]
  fn timezone_precedence() {
    assert_eq!(
      pick_timezone(
        None,
        Some("America/New_York")
      ),
      chrono_tz::America::New_York
    );
    assert_eq!(
      pick_timezone(
        None,
        Some("Mars/Olympus")
      ),
      Rome
    );
    assert_eq!(
      pick_timezone(None, Some("  ")),
      Rome
    );
    assert_eq!(
      pick_timezone(None, None),
      Rome
    );
    assert_eq!(
      pick_timezone(
        Some("Asia/Tokyo"),
        Some("America/New_York")
      ),
      chrono_tz::Asia::Tokyo
    );
    assert_eq!(
      pick_timezone(
        Some("not/a_zone"),
        Some("America/New_York")
      ),
      chrono_tz::America::New_York
    );
  }
}
