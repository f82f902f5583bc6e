use chrono::Local;

use wal_core::domain::{EntryId, HistoryEntry};

/// One history line: `1. 972501234567  2025-01-31 14:05  "preview"  [id]`.
pub fn entry_line(index: usize, entry: &HistoryEntry) -> String {
    let when = entry
        .created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M");
    let mut line = format!("{:>2}. +{:<15} {when}", index + 1, entry.number);
    if let Some(preview) = &entry.raw_text_preview {
        line.push_str(&format!("  \"{preview}\""));
    }
    line.push_str(&format!("  [{}]", entry.id));
    line
}

pub fn history_lines(entries: &[HistoryEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No recent numbers.".to_string()];
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| entry_line(i, e))
        .collect()
}

/// Resolve a 1-based list position or an entry id.
pub fn resolve_target(entries: &[HistoryEntry], target: &str) -> Option<EntryId> {
    let target = target.trim();
    if let Ok(pos) = target.parse::<usize>() {
        if let Some(entry) = pos.checked_sub(1).and_then(|i| entries.get(i)) {
            return Some(entry.id.clone());
        }
    }
    entries
        .iter()
        .find(|e| e.id.0 == target)
        .map(|e| e.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wal_core::domain::NormalizedNumber;

    fn entry(number: &str, preview: Option<&str>) -> HistoryEntry {
        HistoryEntry::new(
            NormalizedNumber::parse(number).unwrap(),
            preview.map(str::to_string),
            Utc::now(),
        )
    }

    #[test]
    fn resolves_positions_and_ids() {
        let entries = vec![entry("111111", None), entry("222222", None)];
        assert_eq!(resolve_target(&entries, "2"), Some(entries[1].id.clone()));
        assert_eq!(
            resolve_target(&entries, &entries[0].id.0),
            Some(entries[0].id.clone())
        );
        assert_eq!(resolve_target(&entries, "0"), None);
        assert_eq!(resolve_target(&entries, "3"), None);
        assert_eq!(resolve_target(&entries, "nope"), None);
    }

    #[test]
    fn line_shows_number_preview_and_id() {
        let e = entry("972501234567", Some("Dana | Sales"));
        let line = entry_line(0, &e);
        assert!(line.starts_with(" 1. +972501234567"));
        assert!(line.contains("\"Dana | Sales\""));
        assert!(line.ends_with(&format!("[{}]", e.id)));
    }

    #[test]
    fn empty_history_has_placeholder() {
        assert_eq!(history_lines(&[]), vec!["No recent numbers.".to_string()]);
    }
}
