use anyhow::anyhow;
use tracing::{
  debug,
  info,
  instrument
};

use super::modifiers::{
  parse_mods,
  parse_title_and_mods
};
use super::{
  find_reminder,
  parse_id
};
use crate::category::{
  Snapshot,
  categorize,
  group_by_urgency
};
use crate::datastore::{
  ReminderStore,
  next_id
};
use crate::datetime::{
  parse_date_time,
  sort_reminders
};
use crate::reminder::Reminder;
use crate::render::Renderer;

#[instrument(skip(store, args, snapshot))]
pub(super) fn cmd_add<
  S: ReminderStore + ?Sized
>(
  store: &S,
  args: &[String],
  snapshot: &Snapshot
) -> anyhow::Result<Reminder> {
  info!("command add");

  let draft =
    parse_title_and_mods(args)?;
  let mut reminders = store.load()?;
  let id =
    next_id(&reminders, snapshot.now)?;
  let reminder =
    draft.into_reminder(id);

  reminders.insert(0, reminder.clone());
  store.save(&reminders)?;

  debug!(
    count = reminders.len(),
    "reminder added"
  );
  println!(
    "Created reminder {id}."
  );
  Ok(reminder)
}

#[instrument(skip(
  store, renderer, snapshot
))]
pub(super) fn cmd_list<
  S: ReminderStore + ?Sized
>(
  store: &S,
  renderer: &mut Renderer,
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command list");

  let mut reminders = store.load()?;
  sort_reminders(
    &mut reminders,
    &snapshot.tz
  );
  let groups =
    group_by_urgency(&reminders, snapshot);
  renderer.print_groups(
    &groups,
    snapshot.locale
  )?;
  Ok(())
}

#[instrument(skip(
  store, renderer, args, snapshot
))]
pub(super) fn cmd_info<
  S: ReminderStore + ?Sized
>(
  store: &S,
  renderer: &mut Renderer,
  args: &[String],
  snapshot: &Snapshot
) -> anyhow::Result<()> {
  info!("command info");

  let id = parse_id(args, "info")?;
  let reminders = store.load()?;
  let reminder =
    find_reminder(&reminders, id)?;

  let parsed = parse_date_time(
    &reminder.date,
    &reminder.time,
    &snapshot.tz
  );
  let categorized =
    categorize(reminder, snapshot);
  renderer.print_reminder_info(
    reminder,
    &parsed,
    &categorized,
    snapshot
  )?;
  Ok(())
}

#[instrument(skip(store, args))]
pub(super) fn cmd_modify<
  S: ReminderStore + ?Sized
>(
  store: &S,
  args: &[String]
) -> anyhow::Result<()> {
  info!("command modify");

  let id = parse_id(args, "modify")?;
  let draft = parse_mods(&args[1..])?;

  let mut reminders = store.load()?;
  let reminder = reminders
    .iter_mut()
    .find(|r| r.id == id)
    .ok_or_else(|| {
      anyhow!(
        "reminder not found: {id}"
      )
    })?;
  draft.apply_to(reminder);
  debug!(?reminder, "reminder updated");

  store.save(&reminders)?;
  println!("Modified reminder {id}.");
  Ok(())
}

#[instrument(skip(store, args))]
pub(super) fn cmd_delete<
  S: ReminderStore + ?Sized
>(
  store: &S,
  args: &[String]
) -> anyhow::Result<()> {
  info!("command delete");

  let id = parse_id(args, "delete")?;
  let mut reminders = store.load()?;
  let before = reminders.len();
  reminders.retain(|r| r.id != id);
  if reminders.len() == before {
    return Err(anyhow!(
      "reminder not found: {id}"
    ));
  }

  store.save(&reminders)?;
  println!("Deleted reminder {id}.");
  Ok(())
}
