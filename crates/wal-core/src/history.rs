//! Bounded, newest-first list of recently used numbers.
//!
//! Invariants after every mutation:
//! - at most `limit` entries
//! - no two entries share a number
//! - ordered by `created_at`, newest first

use chrono::{DateTime, Utc};

use crate::domain::{EntryId, HistoryEntry, NormalizedNumber};

/// Default bound on the number of remembered entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Rebuild from persisted entries, repairing order, duplicates and size.
    pub fn from_entries(mut entries: Vec<HistoryEntry>, limit: usize) -> Self {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut history = Self::new(limit);
        for entry in entries {
            if !history.contains_number(&entry.number) {
                history.entries.push(entry);
            }
        }
        history.entries.truncate(history.limit);
        history
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn get(&self, id: &EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains_number(&self, number: &NormalizedNumber) -> bool {
        self.entries.iter().any(|e| &e.number == number)
    }

    /// Prepend a fresh entry, dropping any older entry with the same number.
    pub fn insert(
        &mut self,
        number: NormalizedNumber,
        raw_text_preview: Option<String>,
        at: DateTime<Utc>,
    ) -> HistoryEntry {
        let entry = HistoryEntry::new(number, raw_text_preview, at);
        self.entries.retain(|e| e.number != entry.number);
        self.entries.insert(0, entry.clone());
        self.entries.truncate(self.limit);
        entry
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<HistoryEntry> {
        let idx = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Put a previously removed entry back at its timestamp position.
    ///
    /// When another entry with the same number exists, the newer of the two is
    /// kept. Returns `false` when the restored entry lost that comparison or
    /// fell off the end of a full list.
    pub fn restore(&mut self, entry: HistoryEntry) -> bool {
        if self.get(&entry.id).is_some() {
            return false;
        }
        if let Some(existing) = self.entries.iter().find(|e| e.number == entry.number) {
            if existing.created_at >= entry.created_at {
                return false;
            }
        }
        self.entries.retain(|e| e.number != entry.number);

        let idx = self
            .entries
            .iter()
            .position(|e| e.created_at < entry.created_at)
            .unwrap_or(self.entries.len());
        if idx >= self.limit {
            return false;
        }
        self.entries.insert(idx, entry);
        self.entries.truncate(self.limit);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
