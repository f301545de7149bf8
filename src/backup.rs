// src/backup.rs
// =============================================================================
// Durable backups of pre-edit descriptions, keyed by video id.
//
// The store is a single JSON file holding a map of video id -> record. Every
// save loads the whole map, inserts (overwriting any previous record for that
// id - no history chain), and rewrites the whole file. That read-modify-write
// shape is fine for a single-operator, single-process tool; the write itself
// goes through a temp file + rename in the same directory so a crash mid-save
// cannot leave a half-written file behind.
//
// The safety contract the orchestrator relies on: save() has returned Ok
// before any mutating update is attempted, so the pre-edit text is always
// recoverable.
//
// Rust concepts:
// - BTreeMap: Keeps the file (and the `backups` listing) in stable id order
// - chrono DateTime<Utc>: Serializes as an ISO 8601 timestamp via serde
// =============================================================================

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// One backed-up description. At most one live record per video id; a new
/// backup for the same id overwrites the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub title: String,
    pub description: String,
    pub backup_time: DateTime<Utc>,
}

/// File-backed backup store. Cheap to construct; every operation opens the
/// file fresh, so there is no in-memory state to go stale.
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full backup map. A missing file is an empty map, not an
    /// error - the store starts existing on first save.
    pub fn load(&self) -> Result<BTreeMap<String, BackupRecord>, EditorError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let map = serde_json::from_str(&contents)?;
        Ok(map)
    }

    /// Inserts (or overwrites) the record for `video_id`, stamped now, and
    /// durably rewrites the file. Must complete before the caller mutates
    /// the remote video.
    pub fn save(
        &self,
        video_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), EditorError> {
        let mut backups = self.load()?;
        backups.insert(
            video_id.to_string(),
            BackupRecord {
                title: title.to_string(),
                description: description.to_string(),
                backup_time: Utc::now(),
            },
        );
        self.write_atomic(&backups)
    }

    /// Looks up the record for `video_id`. Absence is the typed
    /// NoBackupFound error so callers can report it without string matching.
    pub fn get(&self, video_id: &str) -> Result<BackupRecord, EditorError> {
        self.load()?
            .remove(video_id)
            .ok_or_else(|| EditorError::NoBackupFound(video_id.to_string()))
    }

    // Whole-file rewrite via temp file + rename. The temp file lives in the
    // same directory so the rename stays on one filesystem, and it is synced
    // to disk before the rename makes it visible - otherwise the rename can
    // land while the data is still only in the page cache.
    fn write_atomic(&self, backups: &BTreeMap<String, BackupRecord>) -> Result<(), EditorError> {
        let json = serde_json::to_string_pretty(backups)?;

        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why rename instead of writing the file directly?
//    - fs::write truncates first, so a crash mid-write loses the old data
//    - Writing to a temp file and renaming over the target swaps the whole
//      file in one filesystem operation - readers see old or new, never half
//    - sync_all (fsync) before the rename forces the bytes out of the OS
//      page cache, so a power loss right after the rename keeps the data
//
// 2. Why BTreeMap instead of HashMap?
//    - BTreeMap iterates in key order, so the JSON file and the `backups`
//      listing come out in a stable order instead of shuffling on every save
//
// 3. What is impl Into<PathBuf>?
//    - Accepts anything convertible into a PathBuf (&str, String, &Path...)
//    - The conversion happens once in the constructor, callers stay tidy
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> BackupStore {
        BackupStore::new(dir.path().join("description_backups.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.save("abc", "My video", "original text").unwrap();

        let record = store.get("abc").unwrap();
        assert_eq!(record.title, "My video");
        assert_eq!(record.description, "original text");
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.save("abc", "My video", "first").unwrap();
        store.save("abc", "My video", "second").unwrap();

        let backups = store.load().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups["abc"].description, "second");
    }

    #[test]
    fn test_save_keeps_other_records() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.save("a", "Video A", "text a").unwrap();
        store.save("b", "Video B", "text b").unwrap();

        let backups = store.load().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups["a"].description, "text a");
    }

    #[test]
    fn test_get_missing_is_no_backup_found() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let result = store.get("nope");
        assert!(matches!(result, Err(EditorError::NoBackupFound(id)) if id == "nope"));
    }

    #[test]
    fn test_file_is_plain_json_map() {
        // The file format is operator-inspectable JSON keyed by video id.
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save("abc", "My video", "original").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["abc"]["description"], "original");
        assert!(value["abc"]["backup_time"].is_string());
    }

    // The whole payload survives the sync-then-rename write path, not just
    // the first buffer-full.
    #[test]
    fn test_large_description_written_in_full() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let long_description = "line of descriptive text with a link https://a.com/x\n".repeat(500);

        store.save("abc", "My video", &long_description).unwrap();

        let record = store.get("abc").unwrap();
        assert_eq!(record.description, long_description);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save("abc", "My video", "original").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["description_backups.json"]);
    }
}
