//! Disk-backed ledger of items held in the bucket.
//!
//! The ledger maps the storage name of each held item to its [`Entry`]. Every
//! mutation rewrites the whole JSON store before returning.

use crate::bucket::report::{EventStatus, Reporter};
use crate::error::BucketError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, BucketError>;

/// Origin recorded for items found in the bucket without a ledger record.
pub const UNKNOWN_ORIGIN: &str = "UNKNOWN";

const TABLE_HEADER: [&str; 5] = ["Status", "Index", "Name", "Origin", "Removed on"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Correct,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "OK",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub status: Status,
    pub index: u64,
    /// Storage name inside the bucket directory.
    pub name: String,
    /// Basename the item had before it was removed.
    pub basename: String,
    pub origin: String,
    pub date: String,
}

#[derive(Debug)]
pub struct History {
    path: PathBuf,
    entries: BTreeMap<String, Entry>,
    reporter: Reporter,
}

impl History {
    /// Load the ledger stored at `path`. A missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>, reporter: Reporter) -> Result<Self> {
        let path = path.into();
        let entries = if path.is_file() {
            let raw = fs::read_to_string(&path)
                .map_err(|err| BucketError::io("read history", &path, err))?;
            serde_json::from_str(&raw).map_err(|source| BucketError::CorruptHistory {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "history loaded");

        Ok(Self {
            path,
            entries,
            reporter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<&Entry> {
        self.entries
            .get(key)
            .ok_or_else(|| BucketError::KeyNotFound(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, entry: Entry) -> Result<()> {
        let key = key.into();
        let message = format!("entry {} recorded as {key}", entry.index);
        self.entries.insert(key, entry);
        self.persist()?;
        self.reporter.event("history-set", EventStatus::Done, &message);
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<Entry> {
        let Some(entry) = self.entries.remove(key) else {
            return Err(BucketError::KeyNotFound(key.to_string()));
        };
        self.persist()?;
        self.reporter.event(
            "history-delete",
            EventStatus::Done,
            &format!("entry {} ({key}) dropped", entry.index),
        );
        Ok(entry)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()?;
        self.reporter
            .event("history-clear", EventStatus::Done, "history cleared");
        Ok(())
    }

    pub fn indices(&self) -> Vec<u64> {
        self.entries.values().map(|e| e.index).collect()
    }

    pub fn next_index(&self) -> u64 {
        self.indices().into_iter().max().unwrap_or(0) + 1
    }

    pub fn find_by_index(&self, index: u64) -> Option<(&str, &Entry)> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.index == index)
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Entries in the order they were recorded.
    ///
    /// Indices are always allocated above the current maximum, so ascending
    /// index order is insertion order.
    pub fn entries(&self) -> Vec<&Entry> {
        let mut out: Vec<&Entry> = self.entries.values().collect();
        out.sort_by_key(|e| e.index);
        out
    }

    /// The `page`-th (1-based) slice of `count` entries.
    pub fn page(&self, count: usize, page: usize) -> Result<Vec<&Entry>> {
        let entries = self.entries();
        if entries.is_empty() {
            return Err(BucketError::EmptyHistory);
        }

        let pages = if count == 0 {
            0
        } else {
            entries.len().div_ceil(count)
        };
        if page == 0 || page > pages {
            return Err(BucketError::PageOutOfRange { page, count, pages });
        }

        let start = (page - 1) * count;
        let end = (start + count).min(entries.len());
        Ok(entries[start..end].to_vec())
    }

    /// Render a page of entries as a plain-text table.
    pub fn show(&self, count: usize, page: usize) -> Result<String> {
        let rows: Vec<[String; 5]> = self
            .page(count, page)?
            .into_iter()
            .map(|e| {
                [
                    e.status.as_str().to_string(),
                    e.index.to_string(),
                    e.basename.clone(),
                    e.origin.clone(),
                    e.date.clone(),
                ]
            })
            .collect();
        Ok(render_table(&rows))
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| BucketError::io("create directory", &dir, err))?;

        let data = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            BucketError::CorruptHistory {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|err| BucketError::io("write history", &self.path, err))?;
        tmp.write_all(format!("{data}\n").as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| BucketError::io("write history", &self.path, err))?;
        tmp.persist(&self.path)
            .map_err(|err| BucketError::io("write history", &self.path, err.error))?;
        Ok(())
    }
}

fn render_table(rows: &[[String; 5]]) -> String {
    let mut widths = TABLE_HEADER.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header = TABLE_HEADER.map(str::to_string);
    push_row(&mut out, &header, &widths);
    let rule = widths.map(|w| "-".repeat(w));
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out.truncate(out.trim_end().len());
    out
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let mut line = String::new();
    for (column, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if column > 0 {
            line.push_str("  ");
        }
        // Index column is numeric.
        if column == 1 {
            let _ = write!(line, "{cell:>width$}");
        } else {
            let _ = write!(line, "{cell:<width$}");
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(index: u64, name: &str) -> Entry {
        Entry {
            status: Status::Correct,
            index,
            name: name.to_string(),
            basename: format!("{name}.txt"),
            origin: format!("/home/user/{name}.txt"),
            date: "2026-01-02 03:04:05 PM".to_string(),
        }
    }

    fn open(path: &Path) -> History {
        History::open(path, Reporter::new()).expect("open history")
    }

    #[test]
    fn missing_store_opens_empty() {
        let tmp = tempdir().expect("tempdir");
        let history = open(&tmp.path().join("history.json"));
        assert!(history.is_empty());
        assert_eq!(history.next_index(), 1);
    }

    #[test]
    fn mutations_are_written_through() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("state/history.json");
        let mut history = open(&path);

        history.set("a", entry(1, "a")).expect("set a");
        history.set("b", entry(2, "b")).expect("set b");
        history.set("c", entry(3, "c")).expect("set c");
        history.delete("b").expect("delete b");

        let reopened = open(&path);
        assert_eq!(reopened.entries, history.entries);
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains("a"));
        assert!(!reopened.contains("b"));
    }

    #[test]
    fn get_and_delete_missing_key_fail() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));

        assert!(matches!(history.get("nope"), Err(BucketError::KeyNotFound(_))));
        assert!(matches!(history.delete("nope"), Err(BucketError::KeyNotFound(_))));
    }

    #[test]
    fn next_index_is_recomputed_from_current_entries() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));

        history.set("a", entry(1, "a")).expect("set a");
        history.set("b", entry(2, "b")).expect("set b");
        assert_eq!(history.next_index(), 3);

        history.delete("b").expect("delete b");
        assert_eq!(history.next_index(), 2);

        history.delete("a").expect("delete a");
        assert_eq!(history.next_index(), 1);
    }

    #[test]
    fn clear_persists_an_empty_store() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("history.json");
        let mut history = open(&path);
        history.set("a", entry(1, "a")).expect("set a");

        history.clear().expect("clear");
        assert!(history.is_empty());
        let raw = fs::read_to_string(&path).expect("read store");
        assert_eq!(raw.trim(), "{}");
    }

    #[test]
    fn corrupt_store_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("history.json");
        fs::write(&path, "not json").expect("write");

        let err = History::open(&path, Reporter::new()).expect_err("corrupt");
        assert!(matches!(err, BucketError::CorruptHistory { .. }));
    }

    #[test]
    fn status_serializes_with_short_names() {
        let raw = serde_json::to_string(&entry(1, "a")).expect("serialize");
        assert!(raw.contains("\"status\":\"OK\""));
    }

    #[test]
    fn find_by_index_returns_key() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));
        history.set("zz", entry(7, "zz")).expect("set");

        let (key, found) = history.find_by_index(7).expect("found");
        assert_eq!(key, "zz");
        assert_eq!(found.index, 7);
        assert!(history.find_by_index(8).is_none());
    }

    #[test]
    fn pages_follow_insertion_order() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));
        // Keys sort opposite to insertion order.
        history.set("z", entry(1, "z")).expect("set z");
        history.set("y", entry(2, "y")).expect("set y");
        history.set("x", entry(3, "x")).expect("set x");

        let first: Vec<u64> = history.page(2, 1).expect("page 1").iter().map(|e| e.index).collect();
        let second: Vec<u64> = history.page(2, 2).expect("page 2").iter().map(|e| e.index).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3]);
    }

    #[test]
    fn show_on_empty_history_fails() {
        let tmp = tempdir().expect("tempdir");
        let history = open(&tmp.path().join("history.json"));
        assert!(matches!(history.show(10, 1), Err(BucketError::EmptyHistory)));
    }

    #[test]
    fn show_out_of_range_page_fails() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));
        for i in 1..=3 {
            history.set(format!("k{i}"), entry(i, &format!("k{i}"))).expect("set");
        }

        assert!(matches!(
            history.show(10, 5),
            Err(BucketError::PageOutOfRange { page: 5, pages: 1, .. })
        ));
        assert!(matches!(history.show(10, 0), Err(BucketError::PageOutOfRange { .. })));
        assert!(matches!(history.show(0, 1), Err(BucketError::PageOutOfRange { .. })));
    }

    #[test]
    fn show_renders_header_and_rows() {
        let tmp = tempdir().expect("tempdir");
        let mut history = open(&tmp.path().join("history.json"));
        history.set("a", entry(1, "a")).expect("set");

        let table = history.show(10, 1).expect("show");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Status"));
        assert!(lines[0].contains("Removed on"));
        assert!(lines[1].starts_with("------"));
        assert!(lines[2].contains("a.txt"));
        assert!(lines[2].contains("/home/user/a.txt"));
    }
}
