mod io_and_views;
mod modifiers;
mod reminder_ops;

use anyhow::anyhow;
use tracing::{debug, instrument};

use crate::category::Snapshot;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::ReminderStore;
use crate::reminder::Reminder;
use crate::render::Renderer;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "info", "modify", "delete", "calendar", "share", "import", "export",
        "show", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, snapshot, inv), fields(command = %inv.command))]
pub fn dispatch<S: ReminderStore + ?Sized>(
    store: &S,
    cfg: &Config,
    renderer: &mut Renderer,
    snapshot: &Snapshot,
    inv: Invocation,
) -> anyhow::Result<()> {
    debug!(args = ?inv.command_args, now = %snapshot.now, tz = snapshot.tz.name(), "dispatching command");
    let args = inv.command_args.as_slice();

    match inv.command.as_str() {
        "add" => reminder_ops::cmd_add(store, args, snapshot).map(|_| ()),
        "list" => reminder_ops::cmd_list(store, renderer, snapshot),
        "info" => reminder_ops::cmd_info(store, renderer, args, snapshot),
        "modify" => reminder_ops::cmd_modify(store, args),
        "delete" => reminder_ops::cmd_delete(store, args),
        "calendar" => io_and_views::cmd_calendar(store, cfg, args, snapshot),
        "share" => io_and_views::cmd_share(store, args, snapshot),
        "import" => io_and_views::cmd_import(store, snapshot),
        "export" => io_and_views::cmd_export(store, snapshot),
        "show" => io_and_views::cmd_show(cfg),
        "help" => io_and_views::cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn parse_id(args: &[String], command: &str) -> anyhow::Result<u64> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{command}: reminder id is required"))?;
    raw.parse::<u64>()
        .map_err(|_| anyhow!("{command}: invalid reminder id: {raw}"))
}

fn find_reminder<'a>(reminders: &'a [Reminder], id: u64) -> anyhow::Result<&'a Reminder> {
    reminders
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("reminder not found: {id}"))
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names};

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("del", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("sh", &known), None);
        assert_eq!(expand_command_abbrev("sha", &known), Some("share"));
        assert_eq!(expand_command_abbrev("i", &known), None);
        assert_eq!(expand_command_abbrev("list", &known), Some("list"));
    }
}
