use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::reminder::Reminder;

const REMINDERS_FILE: &str = "reminders.json";

/// Where the host keeps its reminder list. The core never touches it;
/// commands load before and save after.
pub trait ReminderStore {
    fn load(&self) -> anyhow::Result<Vec<Reminder>>;
    fn save(&self, reminders: &[Reminder]) -> anyhow::Result<()>;
}

/// The whole list as one JSON array in `<data dir>/reminders.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    pub data_dir: PathBuf,
    pub reminders_path: PathBuf,
}

impl JsonFileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let reminders_path = data_dir.join(REMINDERS_FILE);
        if !reminders_path.exists() {
            fs::write(&reminders_path, "[]")
                .with_context(|| format!("failed to create {}", reminders_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            reminders = %reminders_path.display(),
            "opened reminder store"
        );

        Ok(Self {
            data_dir,
            reminders_path,
        })
    }
}

impl ReminderStore for JsonFileStore {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<Vec<Reminder>> {
        debug!(file = %self.reminders_path.display(), "loading reminders");
        let raw = fs::read_to_string(&self.reminders_path)
            .with_context(|| format!("failed reading {}", self.reminders_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let reminders: Vec<Reminder> = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", self.reminders_path.display()))?;
        debug!(count = reminders.len(), "loaded reminders");
        Ok(reminders)
    }

    #[tracing::instrument(skip(self, reminders), fields(count = reminders.len()))]
    fn save(&self, reminders: &[Reminder]) -> anyhow::Result<()> {
        save_json_atomic(&self.reminders_path, reminders)
            .with_context(|| format!("failed to save {}", self.reminders_path.display()))
    }
}

/// Keeps reminders in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reminders: RefCell<Vec<Reminder>>,
}

impl MemoryStore {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: RefCell::new(reminders),
        }
    }
}

impl ReminderStore for MemoryStore {
    fn load(&self) -> anyhow::Result<Vec<Reminder>> {
        Ok(self.reminders.borrow().clone())
    }

    fn save(&self, reminders: &[Reminder]) -> anyhow::Result<()> {
        *self.reminders.borrow_mut() = reminders.to_vec();
        Ok(())
    }
}

/// New ids are creation timestamps in milliseconds, bumped past the
/// current maximum when two reminders land in the same millisecond.
pub fn next_id(existing: &[Reminder], now: DateTime<Utc>) -> anyhow::Result<u64> {
    let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let max = existing.iter().map(|r| r.id).max().unwrap_or(0);
    if stamp > max {
        return Ok(stamp);
    }
    max.checked_add(1)
        .ok_or_else(|| anyhow!("no reminder id left after {max}"))
}

#[tracing::instrument(skip(path, reminders))]
fn save_json_atomic(path: &Path, reminders: &[Reminder]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = reminders.len(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, reminders)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
