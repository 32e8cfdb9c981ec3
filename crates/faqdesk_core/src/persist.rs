//! JSON file helpers shared by the counter store and the escalation log.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FaqError, Result};

/// Outcome of reading a JSON document that may legitimately be missing.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Loaded(T),
    Missing,
    Invalid(FaqError),
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return ReadOutcome::Missing,
        Err(err) => return ReadOutcome::Invalid(err.into()),
    };
    if contents.trim().is_empty() {
        return ReadOutcome::Missing;
    }
    match serde_json::from_str(&contents) {
        Ok(value) => ReadOutcome::Loaded(value),
        Err(err) => ReadOutcome::Invalid(err.into()),
    }
}

/// Read a store file, treating absence and corruption as an empty store.
/// Never touches the file.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        ReadOutcome::Loaded(value) => value,
        ReadOutcome::Missing => {
            debug!(path = %path.display(), "store file missing, starting empty");
            T::default()
        }
        ReadOutcome::Invalid(err) => {
            warn!(path = %path.display(), error = %err, "store file unreadable, reading as empty");
            T::default()
        }
    }
}

/// Like [`read_json_or_default`], for a caller about to overwrite the file.
///
/// A file that does not parse is renamed aside first, so its bytes stay
/// recoverable. I/O failures leave the file where it is.
pub fn read_json_for_update<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        ReadOutcome::Loaded(value) => value,
        ReadOutcome::Missing => {
            debug!(path = %path.display(), "store file missing, starting empty");
            T::default()
        }
        ReadOutcome::Invalid(err) => {
            warn!(path = %path.display(), error = %err, "store file unreadable, starting empty");
            if matches!(err, FaqError::Json(_)) {
                quarantine(path);
            }
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it via a sibling
/// temp file and a rename.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');

    let persist_err = |source: io::Error| FaqError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }

    let tmp = sibling(path, "tmp");
    let mut file = fs::File::create(&tmp).map_err(persist_err)?;
    file.write_all(&body).map_err(persist_err)?;
    file.sync_all().map_err(persist_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(persist_err)
}

/// Create `path` holding `empty` if it does not exist yet.
pub fn ensure_file<T: Serialize + ?Sized>(path: &Path, empty: &T) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    debug!(path = %path.display(), "initializing store file");
    write_json(path, empty)
}

fn quarantine(path: &Path) {
    if !path.exists() {
        return;
    }
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let target = sibling(path, &format!("corrupt-{stamp}"));
    match fs::rename(path, &target) {
        Ok(()) => warn!(from = %path.display(), to = %target.display(), "moved unreadable store file aside"),
        Err(err) => warn!(path = %path.display(), error = %err, "could not move unreadable store file aside"),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{suffix}"));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(read_json::<Vec<u32>>(&path), ReadOutcome::Missing));
        let value: Vec<u32> = read_json_or_default(&path);
        assert!(value.is_empty());
    }

    #[test]
    fn plain_reads_leave_corrupt_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        fs::write(&path, "{ not json").unwrap();

        let value: BTreeMap<String, u32> = read_json_or_default(&path);

        assert!(value.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn unreadable_path_is_not_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        // reading a directory fails with an I/O error, not a parse error
        let path = dir.path().join("counts.json");
        fs::create_dir(&path).unwrap();

        let value: BTreeMap<String, u32> = read_json_for_update(&path);

        assert!(value.is_empty());
        assert!(path.is_dir());
    }

    #[test]
    fn corrupt_file_is_moved_aside_before_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        fs::write(&path, "{ not json").unwrap();

        let value: BTreeMap<String, u32> = read_json_for_update(&path);

        assert!(value.is_empty());
        assert!(!path.exists());
        let kept: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].starts_with("counts.json.corrupt-"));
    }

    #[test]
    fn write_then_read_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log.json");
        let value = vec!["No close FAQ match — ¿ayuda?".to_string()];

        write_json(&path, &value).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("—"));
        match read_json::<Vec<String>>(&path) {
            ReadOutcome::Loaded(read) => assert_eq!(read, value),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!sibling(&path, "tmp").exists());
    }

    #[test]
    fn ensure_file_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, "[1]").unwrap();

        ensure_file(&path, &Vec::<u32>::new()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[1]");
    }
}
