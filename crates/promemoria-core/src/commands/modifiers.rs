use anyhow::anyhow;
use tracing::{
  instrument,
  warn
};

use crate::reminder::ReminderDraft;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
  Title(String),
  Date(String),
  Time(String),
  Description(String)
}

/// Splits `add` arguments into title
/// words and `key:value` field
/// modifiers. Everything after `--` is
/// title text.
#[instrument(skip(args))]
pub(super) fn parse_title_and_mods(
  args: &[String]
) -> anyhow::Result<ReminderDraft> {
  let mut title_parts = Vec::new();
  let mut mods = Vec::new();

  let mut literal = false;
  for arg in args {
    if arg == "--" {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg)
    {
      mods.push(one_mod);
      continue;
    }

    title_parts.push(arg.clone());
  }

  if title_parts.is_empty()
    && mods.is_empty()
  {
    return Err(anyhow!(
      "add: a title or at least one \
       field is required"
    ));
  }

  let mut draft = ReminderDraft {
    title: Some(title_parts.join(" ")),
    ..ReminderDraft::default()
  };
  fold_mods(&mut draft, mods);
  Ok(draft)
}

/// Parses `modify` arguments; every
/// token must be a field modifier.
#[instrument(skip(args))]
pub(super) fn parse_mods(
  args: &[String]
) -> anyhow::Result<ReminderDraft> {
  let mut mods = Vec::new();
  for arg in args {
    if let Some(one_mod) =
      parse_one_mod(arg)
    {
      mods.push(one_mod);
    } else {
      warn!(arg = %arg, "unrecognized modifier token ignored");
    }
  }

  if mods.is_empty() {
    return Err(anyhow!(
      "modify: no field modifiers \
       given (title:, date:, time:, \
       desc:)"
    ));
  }

  let mut draft =
    ReminderDraft::default();
  fold_mods(&mut draft, mods);
  Ok(draft)
}

fn parse_one_mod(
  tok: &str
) -> Option<Mod> {
  let sep =
    tok.find([':', '='])?;
  let key = &tok[..sep];
  let value = tok[sep + 1..].to_string();

  match key
    .to_ascii_lowercase()
    .as_str()
  {
    | "title" => Some(Mod::Title(value)),
    | "date" | "day" => {
      Some(Mod::Date(value))
    }
    | "time" | "at" => {
      Some(Mod::Time(value))
    }
    | "desc" | "description" => {
      Some(Mod::Description(value))
    }
    | _ => None
  }
}

fn fold_mods(
  draft: &mut ReminderDraft,
  mods: Vec<Mod>
) {
  for one_mod in mods {
    match one_mod {
      | Mod::Title(v) => {
        draft.title = Some(v)
      }
      | Mod::Date(v) => {
        draft.date = Some(v)
      }
      | Mod::Time(v) => {
        draft.time = Some(v)
      }
      | Mod::Description(v) => {
        draft.description = Some(v)
      }
    }
  }
}
