use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::model::UsageRecord;
use crate::persist::{ensure_file, read_json_for_update, read_json_or_default, write_json};

pub type UsageCounts = BTreeMap<String, UsageRecord>;

/// Per-question ask counters, persisted as a JSON object keyed by the exact
/// question text.
#[derive(Debug)]
pub struct UsageCounterStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UsageCounterStore {
    /// Open the store, creating an empty `{}` file if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_file(&path, &UsageCounts::new())?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bump the counter for `question` and stamp it with the current time.
    pub fn increment(&self, question: &str) -> Result<UsageRecord> {
        let _guard = self.guard();
        let mut counts: UsageCounts = read_json_for_update(&self.path);

        let record = counts
            .entry(question.to_string())
            .or_insert_with(|| UsageRecord {
                count: 0,
                last_asked: Utc::now(),
            });
        record.count += 1;
        record.last_asked = Utc::now();
        let updated = record.clone();

        write_json(&self.path, &counts)?;
        debug!(question, count = updated.count, "usage counter incremented");
        Ok(updated)
    }

    pub fn records(&self) -> UsageCounts {
        let _guard = self.guard();
        read_json_or_default(&self.path)
    }

    /// The `n` most asked questions, highest count first. Equal counts keep
    /// question-text order.
    pub fn top_asked(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .records()
            .into_iter()
            .map(|(question, record)| (question, record.count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    fn store() -> (tempfile::TempDir, UsageCounterStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = UsageCounterStore::open(dir.path().join("top_counts.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_empty_mapping() {
        let (_dir, store) = store();
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "{}");
        assert!(store.top_asked(5).is_empty());
    }

    #[test]
    fn increment_counts_exact_question_text() {
        let (_dir, store) = store();
        store.increment("How do I reset my password?").unwrap();
        let second = store.increment("How do I reset my password?").unwrap();
        store.increment("how do i reset my password?").unwrap();

        assert_eq!(second.count, 2);
        assert_eq!(
            store.top_asked(1),
            vec![("How do I reset my password?".to_string(), 2)]
        );
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn top_asked_orders_by_count_then_text() {
        let (_dir, store) = store();
        for q in ["b", "a", "c", "c", "c", "a"] {
            store.increment(q).unwrap();
        }

        assert_eq!(
            store.top_asked(10),
            vec![
                ("c".to_string(), 3),
                ("a".to_string(), 2),
                ("b".to_string(), 1),
            ]
        );
        assert!(store.top_asked(0).is_empty());
    }

    #[test]
    fn reopening_reads_back_identical_records() {
        let (dir, store) = store();
        store.increment("Do you offer refunds?").unwrap();
        store.increment("Is there a mobile app?").unwrap();
        let before = store.records();

        let reopened = UsageCounterStore::open(dir.path().join("top_counts.json")).unwrap();
        assert_eq!(reopened.records(), before);
        assert_eq!(reopened.records(), before);
    }

    #[test]
    fn reads_camel_case_timestamps() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"Q?": {"count": 4, "lastAsked": "2024-05-01T10:00:00.123456Z"}}"#,
        )
        .unwrap();

        let record = store.increment("Q?").unwrap();
        assert_eq!(record.count, 5);
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("last_asked"));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_dir, store) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..5 {
                        store.increment("shared").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.top_asked(1), vec![("shared".to_string(), 40)]);
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        let store = UsageCounterStore::open(&path).unwrap();
        // a directory where the temp file would go makes the write fail
        fs::create_dir(dir.path().join("counts.json.tmp")).unwrap();

        assert!(matches!(
            store.increment("Q?"),
            Err(crate::error::FaqError::Persist { .. })
        ));
    }

    #[test]
    fn ranking_does_not_move_a_corrupt_file() {
        let (dir, store) = store();
        fs::write(store.path(), "{ broken").unwrap();

        assert!(store.top_asked(10).is_empty());

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ broken");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
