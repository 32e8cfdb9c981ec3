use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::FaqEntry;
use crate::persist::{read_json, ReadOutcome};

/// In-memory FAQ corpus backed by a JSON array on disk.
///
/// Readers take an `Arc` snapshot; `reload` swaps the whole list, so a
/// reader never sees a half-replaced corpus.
#[derive(Debug)]
pub struct CorpusStore {
    path: Option<PathBuf>,
    entries: RwLock<Arc<Vec<FaqEntry>>>,
}

impl CorpusStore {
    /// Load the corpus at `path`. Falls back to an empty corpus if the file
    /// is missing or is not a JSON array of entries.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_corpus(&path);
        Self {
            path: Some(path),
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// A corpus with no backing file; `reload` keeps the current entries.
    pub fn from_entries(entries: Vec<FaqEntry>) -> Self {
        Self {
            path: None,
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Re-read the backing file and swap it in. Returns the new entry count.
    pub fn reload(&self) -> usize {
        let Some(path) = &self.path else {
            return self.len();
        };
        let fresh = Arc::new(read_corpus(path));
        let count = fresh.len();
        match self.entries.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        info!(path = %path.display(), entries = count, "corpus reloaded");
        count
    }

    pub fn snapshot(&self) -> Arc<Vec<FaqEntry>> {
        match self.entries.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries carrying `tag` (exact, case-sensitive). `None` or an empty
    /// tag returns the whole corpus.
    pub fn by_tag(&self, tag: Option<&str>) -> Vec<FaqEntry> {
        let entries = self.snapshot();
        match tag.filter(|t| !t.is_empty()) {
            None => entries.to_vec(),
            Some(tag) => entries.iter().filter(|e| e.has_tag(tag)).cloned().collect(),
        }
    }

    /// Every tag used in the corpus, once each, sorted.
    pub fn all_tags(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .flat_map(|e| e.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Entries that fail to parse are skipped; only a document that is not an
/// array empties the corpus.
fn read_corpus(path: &Path) -> Vec<FaqEntry> {
    match read_json::<Vec<Value>>(path) {
        ReadOutcome::Loaded(raw) => {
            let total = raw.len();
            let entries: Vec<FaqEntry> = raw
                .into_iter()
                .enumerate()
                .filter_map(|(index, value)| match serde_json::from_value(value) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(path = %path.display(), index, error = %err, "skipping invalid corpus entry");
                        None
                    }
                })
                .collect();
            debug!(path = %path.display(), entries = entries.len(), skipped = total - entries.len(), "corpus loaded");
            entries
        }
        ReadOutcome::Missing => {
            debug!(path = %path.display(), "corpus file missing, using empty corpus");
            Vec::new()
        }
        ReadOutcome::Invalid(err) => {
            warn!(path = %path.display(), error = %err, "corpus file unreadable, using empty corpus");
            Vec::new()
        }
    }
}
