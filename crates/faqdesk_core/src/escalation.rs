use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::model::{EscalationRecord, MatchedEntry};
use crate::persist::{ensure_file, read_json_for_update, read_json_or_default, write_json};

/// Append-only audit trail of escalated questions, stored as a JSON array.
#[derive(Debug)]
pub struct EscalationLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EscalationLog {
    /// Open the log, creating an empty `[]` file if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_file(&path, &Vec::<EscalationRecord>::new())?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. An unreadable log is treated as empty; a failed
    /// write is returned as an error.
    pub fn append(&self, record: EscalationRecord) -> Result<()> {
        let _guard = self.guard();
        let mut records: Vec<EscalationRecord> = read_json_for_update(&self.path);
        records.push(record);
        write_json(&self.path, &records)?;
        info!(total = records.len(), "escalation logged");
        Ok(())
    }

    /// Build a record stamped with the current time and append it. Tags
    /// default to the matched entry's tags when none are given.
    pub fn log(
        &self,
        question: &str,
        context: Option<&str>,
        matched: Option<&MatchedEntry>,
        confidence: Option<f64>,
        tags: Option<Vec<String>>,
    ) -> Result<EscalationRecord> {
        let tags = tags
            .filter(|t| !t.is_empty())
            .or_else(|| matched.map(|m| m.entry.tags.clone()))
            .unwrap_or_default();

        let record = EscalationRecord {
            timestamp: Utc::now(),
            question: question.to_string(),
            context: context.unwrap_or_default().to_string(),
            matched: matched.cloned(),
            confidence: confidence.unwrap_or(0.0),
            tags,
        };
        self.append(record.clone())?;
        Ok(record)
    }

    pub fn records(&self) -> Vec<EscalationRecord> {
        let _guard = self.guard();
        read_json_or_default(&self.path)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FaqEntry;
    use std::fs;

    fn log() -> (tempfile::TempDir, EscalationLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = EscalationLog::open(dir.path().join("escalations.json")).unwrap();
        (dir, log)
    }

    fn matched() -> MatchedEntry {
        MatchedEntry {
            entry: FaqEntry::new("How do I reset my password?", "Go to settings > reset.")
                .with_tags(["account"]),
            confidence: 0.5,
        }
    }

    #[test]
    fn open_creates_empty_array() {
        let (_dir, log) = log();
        assert_eq!(fs::read_to_string(log.path()).unwrap().trim(), "[]");
        assert!(log.is_empty());
    }

    #[test]
    fn each_call_appends_one_record_and_keeps_earlier_ones() {
        let (_dir, log) = log();
        let first = log.log("reset pwd", None, None, None, None).unwrap();
        let second = log
            .log("reset pwd please", Some("tried twice"), Some(&matched()), Some(0.5), None)
            .unwrap();

        let records = log.records();
        assert_eq!(records, vec![first, second]);
        assert_eq!(records[0].context, "");
        assert_eq!(records[1].context, "tried twice");
    }

    #[test]
    fn tags_default_to_matched_entry() {
        let (_dir, log) = log();
        let from_match = log.log("q", None, Some(&matched()), Some(0.5), None).unwrap();
        let explicit = log
            .log("q", None, Some(&matched()), None, Some(vec!["billing".into()]))
            .unwrap();
        let bare = log.log("q", None, None, None, None).unwrap();

        assert_eq!(from_match.tags, vec!["account"]);
        assert_eq!(explicit.tags, vec!["billing"]);
        assert!(bare.tags.is_empty());
        assert_eq!(bare.confidence, 0.0);
    }

    #[test]
    fn matched_snapshot_is_flattened_on_disk() {
        let (_dir, log) = log();
        log.log("q", None, Some(&matched()), Some(0.5), None).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(log.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["matched"]["question"], "How do I reset my password?");
        assert_eq!(raw[0]["matched"]["confidence"], 0.5);
    }

    #[test]
    fn unreadable_log_restarts_from_empty() {
        let (_dir, log) = log();
        fs::write(log.path(), "not json").unwrap();

        log.log("q", None, None, None, None).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn appends_after_records_with_null_fields() {
        let (_dir, log) = log();
        fs::write(
            log.path(),
            r#"[
              {"timestamp": "2024-05-01T10:00:00.123456Z", "question": "first", "context": "",
               "matched": null, "confidence": 0.0, "tags": []},
              {"timestamp": "2024-05-02T10:00:00Z", "question": "second", "context": null,
               "matched": {"question": "Q?", "answer": "A.", "confidence": 0.42},
               "confidence": 0.42, "tags": null}
            ]"#,
        )
        .unwrap();

        log.log("new", None, None, None, None).unwrap();

        let records = log.records();
        let questions: Vec<&str> = records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second", "new"]);
        let second = &records[1];
        assert!(second.tags.is_empty());
        assert_eq!(second.context, "");
        assert!(second.matched.as_ref().unwrap().entry.tags.is_empty());
    }

    #[test]
    fn write_failure_is_reported() {
        let (dir, log) = log();
        // a directory where the temp file would go makes the write fail
        fs::create_dir(dir.path().join("escalations.json.tmp")).unwrap();

        let result = log.log("q", None, None, None, None);

        assert!(matches!(result, Err(crate::error::FaqError::Persist { .. })));
        assert!(log.is_empty());
    }
}
