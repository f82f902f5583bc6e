//! History persistence adapters.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{domain::HistoryEntry, errors::Error, ports::HistoryStorage, Result};

/// Storage slot the entries live under inside the history file.
pub const HISTORY_SLOT: &str = "quickwa_history";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFileData {
    #[serde(rename = "quickwa_history", default)]
    entries: Vec<HistoryEntry>,
}

/// JSON file with a single namespaced slot, rewritten in full on every save.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let txt = fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(Vec::new());
        }
        let data: HistoryFileData = serde_json::from_str(&txt).map_err(|e| {
            Error::PersistenceRead(format!("{}: {e}", self.path.display()))
        })?;
        Ok(data.entries)
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let data = HistoryFileData {
            entries: entries.to_vec(),
        };
        let txt = serde_json::to_string(&data)?;

        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, txt)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process storage, for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryStorage {
    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<HistoryEntry>> {
        self.entries
            .lock()
            .map(|g| g.clone())
            .map_err(|_| Error::PersistenceRead("memory storage poisoned".to_string()))
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| Error::External("memory storage poisoned".to_string()))?;
        *guard = entries.to_vec();
        Ok(())
    }
}
