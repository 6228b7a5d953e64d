use std::io::{
  self,
  Read
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  info,
  instrument
};

use super::{
  find_reminder,
  parse_id
};
use crate::calendar::{
  calendar_url,
  share_text,
  share_url
};
use crate::category::Snapshot;
use crate::config::Config;
use crate::datastore::{
  ReminderStore,
  next_id
};
use crate::datetime::sort_reminders;
use crate::reminder::{
  Reminder,
  ReminderDraft
};

#[instrument(skip(
  store, cfg, args, snapshot
))]
pub(super) fn cmd_calendar<
  S: ReminderStore + ?Sized
>(
  store: &S,
  cfg: &Config,
  args: &[String],
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command calendar");

  let id =
    parse_id(args, "calendar")?;
  let reminders = store.load()?;
  let reminder =
    find_reminder(&reminders, id)?;
  let url = calendar_url(
    reminder,
    &snapshot.tz,
    cfg.event_duration()?
  )?;

  println!("{url}");
  Ok(())
}

#[instrument(skip(
  store, args, snapshot
))]
pub(super) fn cmd_share<
  S: ReminderStore + ?Sized
>(
  store: &S,
  args: &[String],
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command share");

  let id = parse_id(args, "share")?;
  let reminders = store.load()?;
  let reminder =
    find_reminder(&reminders, id)?;

  println!(
    "{}",
    share_text(
      reminder,
      snapshot.locale
    )
  );
  println!();
  println!(
    "{}",
    share_url(
      reminder,
      snapshot.locale
    )?
  );
  Ok(())
}

#[instrument(skip(store, snapshot))]
pub(super) fn cmd_import<
  S: ReminderStore + ?Sized
>(
  store: &S,
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command import");

  let mut stdin = String::new();
  io::stdin()
    .read_to_string(&mut stdin)
    .context("failed reading stdin")?;

  let drafts =
    parse_import_items(&stdin)?;
  let count = import_drafts(
    store, drafts, snapshot
  )?;

  println!(
    "Imported {count} reminder(s)."
  );
  Ok(())
}

/// Adds extracted drafts in input
/// order, newest on top.
fn import_drafts<
  S: ReminderStore + ?Sized
>(
  store: &S,
  drafts: Vec<ReminderDraft>,
  snapshot: &Snapshot
) -> anyhow::Result<usize> {
  let mut reminders = store.load()?;
  let count = drafts.len();

  for draft in drafts {
    let id = next_id(
      &reminders,
      snapshot.now
    )?;
    reminders
      .insert(0, draft.into_reminder(id));
  }

  if count > 0 {
    store.save(&reminders)?;
  }
  Ok(count)
}

/// Accepts one extraction object, an
/// array of them, or one object per
/// line.
fn parse_import_items(
  raw: &str
) -> anyhow::Result<Vec<ReminderDraft>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(anyhow!(
      "import: empty input"
    ));
  }

  if trimmed.starts_with('[') {
    return serde_json::from_str(trimmed)
      .context(
        "import: invalid JSON array"
      );
  }

  if let Ok(single) =
    serde_json::from_str::<ReminderDraft>(
      trimmed
    )
  {
    return Ok(vec![single]);
  }

  trimmed
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .enumerate()
    .map(|(idx, line)| {
      serde_json::from_str(line)
        .with_context(|| {
          format!(
            "import: invalid JSON on \
             line {}",
            idx + 1
          )
        })
    })
    .collect()
}

#[instrument(skip(store, snapshot))]
pub(super) fn cmd_export<
  S: ReminderStore + ?Sized
>(
  store: &S,
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command export");

  let mut reminders: Vec<Reminder> =
    store.load()?;
  sort_reminders(
    &mut reminders,
    &snapshot.tz
  );

  let out = serde_json::to_string(
    &reminders
  )?;
  println!("{out}");
  Ok(())
}

pub(super) fn cmd_show(
  cfg: &Config
) -> anyhow::Result<()> {
  let mut rows: Vec<_> =
    cfg.iter().collect();
  rows.sort();
  for (key, value) in rows {
    println!("{key}={value}");
  }
  for file in &cfg.loaded_files {
    println!(
      "# loaded {}",
      file.display()
    );
  }
  Ok(())
}

pub(super) fn cmd_help()
-> anyhow::Result<()> {
  println!(
    "Commands: add <title> \
     [date:..] [time:..] [desc:..], \
     list, info <id>, modify <id> \
     [title:..] [date:..] [time:..] \
     [desc:..], delete <id>, \
     calendar <id>, share <id>, \
     import, export, show, version"
  );
  Ok(())
}
