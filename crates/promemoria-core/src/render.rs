use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::category::{Bucket, Categorized, Grouping, Locale, Snapshot};
use crate::config::Config;
use crate::datetime::{ParsedInstant, Resolution};
use crate::reminder::Reminder;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Prints each non-empty slot as a headed table, in display order.
    #[tracing::instrument(skip(self, groups))]
    pub fn print_groups(&mut self, groups: &Grouping<'_>, locale: Locale) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let terminal = io::stdout().is_terminal();

        if groups.values().all(Vec::is_empty) {
            let empty = match locale {
                Locale::It => "Nessun promemoria.",
                Locale::En => "No reminders yet.",
            };
            writeln!(out, "{empty}")?;
            return Ok(());
        }

        let headers = match locale {
            Locale::It => ["ID", "Data", "Ora", "Titolo", "Quando"],
            Locale::En => ["ID", "Date", "Time", "Title", "When"],
        }
        .map(str::to_string)
        .to_vec();

        let mut first = true;
        for (slot, entries) in groups {
            if entries.is_empty() {
                continue;
            }
            if !first {
                writeln!(out)?;
            }
            first = false;

            let heading = format!("{} ({})", slot.label(locale), entries.len());
            writeln!(out, "{}", self.paint(&heading, slot.ansi_color(), terminal))?;

            let rows = entries
                .iter()
                .map(|entry| {
                    let reminder = entry.reminder;
                    let when = if entry.info.bucket == Bucket::InvalidDate {
                        self.paint(
                            Bucket::InvalidDate.label(locale),
                            Bucket::InvalidDate.ansi_color(),
                            terminal,
                        )
                    } else if entry.info.overdue {
                        self.paint(&entry.info.relative, Bucket::Overdue.ansi_color(), terminal)
                    } else {
                        entry.info.relative.clone()
                    };
                    vec![
                        self.paint(&reminder.id.to_string(), "33", terminal),
                        display_field(&reminder.date),
                        display_field(&reminder.time),
                        reminder.title.clone(),
                        when,
                    ]
                })
                .collect();

            write_table(&mut out, headers.clone(), rows)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(id = reminder.id))]
    pub fn print_reminder_info(
        &mut self,
        reminder: &Reminder,
        parsed: &ParsedInstant,
        categorized: &Categorized,
        snapshot: &Snapshot,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let terminal = io::stdout().is_terminal();

        writeln!(out, "id          {}", reminder.id)?;
        writeln!(out, "title       {}", reminder.title)?;
        writeln!(out, "description {}", reminder.description)?;
        writeln!(out, "date        {}", reminder.date)?;
        writeln!(out, "time        {}", reminder.time)?;

        let resolution = match parsed.resolution {
            Resolution::Full => "full",
            Resolution::DateOnly => "date only",
            Resolution::Placeholder => "placeholder",
            Resolution::Unresolved => "unresolved",
        };
        writeln!(out, "resolution  {resolution}")?;
        if let Some(instant) = parsed.instant.filter(|_| parsed.is_resolved()) {
            writeln!(
                out,
                "instant     {}",
                instant.with_timezone(&snapshot.tz).format("%Y-%m-%d %H:%M %Z")
            )?;
        }

        let bucket = categorized.bucket;
        writeln!(
            out,
            "bucket      {}",
            self.paint(bucket.label(snapshot.locale), bucket.ansi_color(), terminal)
        )?;
        writeln!(
            out,
            "priority    {}",
            bucket.priority().label(snapshot.locale)
        )?;
        if !categorized.relative.is_empty() {
            writeln!(out, "when        {}", categorized.relative)?;
        }
        writeln!(out, "overdue     {}", categorized.overdue)?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str, terminal: bool) -> String {
        if !self.color || !terminal {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn display_field(value: &str) -> String {
    if crate::reminder::is_not_available(value) {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    for (header, &width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for &width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, &width) in row.iter().zip(&widths) {
            let padding = width.saturating_sub(visible_width(cell));
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn visible_width(s: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(s).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
