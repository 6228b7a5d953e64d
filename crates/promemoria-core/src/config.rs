use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Duration;
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::calendar::DEFAULT_EVENT_MINUTES;
use crate::category::Locale;
use crate::datetime::{
  DEFAULT_TIMEZONE,
  resolve_timezone
};

const RC_ENV_VAR: &str = "PROMEMORIARC";
const RC_FILE_NAME: &str =
  ".promemoriarc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.promemoria"),
      ("default.command", "list"),
      ("color", "on"),
      ("locale", "it"),
      ("timezone", DEFAULT_TIMEZONE)
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    map.insert(
      "calendar.duration".to_string(),
      DEFAULT_EVENT_MINUTES.to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path, &mut vec![])?;
    } else {
      warn!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn locale(
    &self
  ) -> anyhow::Result<Locale> {
    match self.map.get("locale") {
      | Some(raw) => {
        raw.parse().with_context(|| {
          format!(
            "invalid locale setting: \
             {raw}"
          )
        })
      }
      | None => Ok(Locale::default())
    }
  }

  pub fn timezone(&self) -> Tz {
    resolve_timezone(
      self
        .map
        .get("timezone")
        .map(String::as_str)
    )
  }

  pub fn event_duration(
    &self
  ) -> anyhow::Result<Duration> {
    let Some(raw) =
      self.map.get("calendar.duration")
    else {
      return Ok(Duration::minutes(
        DEFAULT_EVENT_MINUTES
      ));
    };
    let minutes: i64 =
      raw.trim().parse().with_context(
        || {
          format!(
            "invalid \
             calendar.duration: {raw}"
          )
        }
      )?;
    if minutes <= 0 {
      return Err(anyhow!(
        "calendar.duration must be \
         positive, got {minutes}"
      ));
    }
    Ok(Duration::minutes(minutes))
  }

  /// `chain` holds the canonical paths
  /// of the files currently being read,
  /// outermost first.
  #[tracing::instrument(skip(
    self, chain
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let canonical =
      fs::canonicalize(&path)
        .with_context(|| {
          format!(
            "failed to resolve {}",
            path.display()
          )
        })?;
    if chain.contains(&canonical) {
      return Err(anyhow!(
        "include cycle at {}",
        path.display()
      ));
    }
    chain.push(canonical);
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      match parse_rc_line(raw_line) {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let include_path =
            resolve_include_path(
              &base_dir, target
            )?;
          if !include_path.exists() {
            warn!(include = %include_path.display(), "include file does not exist; skipping");
            continue;
          }
          debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = idx + 1,
            "processing include"
          );
          self.load_file(
            &include_path,
            chain
          )?;
        }
        | RcLine::Setting(key, value) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | RcLine::Malformed => {
          return Err(anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            idx + 1,
            raw_line
          ));
        }
      }
    }

    chain.pop();
    Ok(())
  }
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str),
  Malformed
}

/// One line of an rc file. `#` starts
/// a comment anywhere on the line.
fn parse_rc_line(raw: &str) -> RcLine<'_> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return RcLine::Blank;
  }
  if let Some(target) =
    line.strip_prefix("include ")
  {
    return RcLine::Include(
      target.trim()
    );
  }
  match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      RcLine::Setting(
        key.trim(),
        value.trim()
      )
    }
    | _ => RcLine::Malformed
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping rc lookup"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".promemoria"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
