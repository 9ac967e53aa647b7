//! Per-directory record files with timestamped backups.
//!
//! Layout under the records directory:
//!
//! ```text
//! <records_dir>/<key>.json
//! <records_dir>/backups/<key>_backup_<YYYYmmddTHHMMSS.ffffff>[_<n>].json
//! ```
//!
//! `<key>` is the directory's sanitized basename plus a hash of its full
//! path. Backup stamps are UTC; `_<n>` keeps snapshots taken within the same
//! microsecond distinct and ordered.

use std::fs::{self, OpenOptions};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{RestoreError, StoreError};
use crate::tracks::{MetadataRecord, RecordMap};

const BACKUP_DIR: &str = "backups";
const BACKUP_MARKER: &str = "_backup_";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";

/// A backup file and its ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub stamp: String,
    pub seq: u32,
}

impl BackupSnapshot {
    fn order_key(&self) -> (&str, u32) {
        (&self.stamp, self.seq)
    }
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    records_dir: PathBuf,
    max_backups: Option<usize>,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>>(records_dir: P, max_backups: Option<usize>) -> Self {
        Self {
            records_dir: records_dir.into(),
            max_backups,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.records_dir.clone(), config.max_backups)
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.records_dir.join(BACKUP_DIR)
    }

    /// File-name key for a media directory
    pub fn record_key(directory: &Path) -> String {
        let base: String = directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let base = if base.is_empty() { "root".to_string() } else { base };

        let mut hasher = DefaultHasher::new();
        directory.to_string_lossy().hash(&mut hasher);

        format!("{}-{:016x}", base, hasher.finish())
    }

    pub fn record_path(&self, directory: &Path) -> PathBuf {
        self.records_dir
            .join(format!("{}.json", Self::record_key(directory)))
    }

    /// Read the records for `directory`; a missing file is an empty map.
    pub fn load(&self, directory: &Path) -> Result<RecordMap, StoreError> {
        let path = self.record_path(directory);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No records yet for {}", directory.display());
                return Ok(RecordMap::new());
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Parse { path, source })
    }

    /// Snapshot the current on-disk state, then overwrite it with `records`.
    ///
    /// Returns the path of the snapshot written by this call.
    pub fn save(&self, directory: &Path, records: &RecordMap) -> Result<PathBuf, StoreError> {
        let primary = self.record_path(directory);
        let backup_path = self.snapshot_current(directory)?;

        let content = serde_json::to_string_pretty(records)?;
        self.replace_primary(&primary, content.as_bytes())?;
        debug!("Saved {} records to {}", records.len(), primary.display());

        self.prune(directory);
        Ok(backup_path)
    }

    /// Copy the most recent snapshot over the record file and return it.
    ///
    /// The state being replaced is snapshotted first, so restoring again
    /// right away brings it back.
    pub fn restore_latest(&self, directory: &Path) -> Result<RecordMap, RestoreError> {
        let latest = self
            .list_backups(directory)?
            .pop()
            .ok_or_else(|| RestoreError::NoBackupFound(directory.to_path_buf()))?;

        let content = fs::read_to_string(&latest.path).map_err(|source| StoreError::Read {
            path: latest.path.clone(),
            source,
        })?;
        let records: RecordMap =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: latest.path.clone(),
                source,
            })?;

        let primary = self.record_path(directory);
        let replaced = self.snapshot_current(directory)?;
        self.replace_primary(&primary, content.as_bytes())?;
        self.prune(directory);

        info!(
            "Restored {} from {} (previous state in {})",
            primary.display(),
            latest.path.display(),
            replaced.display()
        );
        Ok(records)
    }

    /// Snapshots for `directory`, oldest first.
    pub fn list_backups(&self, directory: &Path) -> Result<Vec<BackupSnapshot>, StoreError> {
        let backup_dir = self.backup_dir();
        let entries = match fs::read_dir(&backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: backup_dir,
                    source,
                });
            }
        };

        let prefix = format!("{}{}", Self::record_key(directory), BACKUP_MARKER);
        let mut snapshots: Vec<BackupSnapshot> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let rest = name.strip_prefix(&prefix)?.strip_suffix(".json")?;
                let (stamp, seq) = parse_backup_suffix(rest)?;
                Some(BackupSnapshot {
                    path: entry.path(),
                    stamp,
                    seq,
                })
            })
            .collect();

        snapshots.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Ok(snapshots)
    }

    pub fn has_backup(&self, directory: &Path) -> bool {
        match self.list_backups(directory) {
            Ok(backups) => !backups.is_empty(),
            Err(e) => {
                warn!("Could not list backups: {}", e);
                false
            }
        }
    }

    /// Insert `record`, replacing any previous record for the same container.
    pub fn upsert(records: &mut RecordMap, record: MetadataRecord) {
        records.insert(record.path.clone(), record);
    }

    /// Back up the record file as it is now; `{}` when there is none yet.
    fn snapshot_current(&self, directory: &Path) -> Result<PathBuf, StoreError> {
        let primary = self.record_path(directory);
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(|source| StoreError::Write {
            path: backup_dir.clone(),
            source,
        })?;

        let previous = match fs::read(&primary) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                serde_json::to_vec_pretty(&RecordMap::new())?
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: primary,
                    source,
                });
            }
        };
        let backup_path = self.write_snapshot(directory, &previous)?;
        info!("Backup created: {}", backup_path.display());
        Ok(backup_path)
    }

    /// Atomic replace through a temporary file in the records directory.
    fn replace_primary(&self, primary: &Path, content: &[u8]) -> Result<(), StoreError> {
        let mut temp = tempfile::NamedTempFile::new_in(&self.records_dir).map_err(|source| {
            StoreError::Write {
                path: self.records_dir.clone(),
                source,
            }
        })?;
        temp.write_all(content)
            .and_then(|_| temp.flush())
            .map_err(|source| StoreError::Write {
                path: primary.to_path_buf(),
                source,
            })?;
        temp.persist(primary).map_err(|e| StoreError::Write {
            path: primary.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn write_snapshot(&self, directory: &Path, content: &[u8]) -> Result<PathBuf, StoreError> {
        let key = Self::record_key(directory);
        let mut stamp = Utc::now().format(STAMP_FORMAT).to_string();
        let mut seq = 0;

        // Never sort behind an existing snapshot, even if the clock moved back.
        if let Some(latest) = self.list_backups(directory)?.pop() {
            if latest.stamp >= stamp {
                stamp = latest.stamp;
                seq = latest.seq + 1;
            }
        }

        loop {
            let name = if seq == 0 {
                format!("{key}{BACKUP_MARKER}{stamp}.json")
            } else {
                format!("{key}{BACKUP_MARKER}{stamp}_{seq}.json")
            };
            let path = self.backup_dir().join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|source| StoreError::Write {
                            path: path.clone(),
                            source,
                        })?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => seq += 1,
                Err(source) => return Err(StoreError::Write { path, source }),
            }
        }
    }

    fn prune(&self, directory: &Path) {
        let Some(max) = self.max_backups else {
            return;
        };
        let keep = max.max(1);

        let backups = match self.list_backups(directory) {
            Ok(backups) => backups,
            Err(e) => {
                warn!("Skipping backup pruning: {}", e);
                return;
            }
        };
        if backups.len() <= keep {
            return;
        }

        let excess = backups.len() - keep;
        for old in backups.into_iter().take(excess) {
            match fs::remove_file(&old.path) {
                Ok(()) => debug!("Pruned backup {}", old.path.display()),
                Err(e) => warn!("Failed to prune backup {}: {}", old.path.display(), e),
            }
        }
    }
}

fn parse_backup_suffix(rest: &str) -> Option<(String, u32)> {
    let (stamp, seq) = match rest.split_once('_') {
        Some((stamp, seq)) => (stamp, seq.parse().ok()?),
        None => (rest, 0),
    };
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    Some((stamp.to_string(), seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::{TrackDescriptor, TrackKind};

    fn record(path: &str, default: bool) -> MetadataRecord {
        MetadataRecord::new(
            path,
            vec![TrackDescriptor {
                number: 2,
                kind: TrackKind::Audio,
                language: "en".to_string(),
                codec: "AAC".to_string(),
                title: None,
                default,
                forced: false,
            }],
        )
    }

    fn map_of(records: &[MetadataRecord]) -> RecordMap {
        let mut map = RecordMap::new();
        for r in records {
            RecordStore::upsert(&mut map, r.clone());
        }
        map
    }

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("json"), None);
        fs::create_dir_all(store.records_dir()).unwrap();
        (dir, store)
    }

    #[test]
    fn load_without_file_is_empty() {
        let (_tmp, store) = store();
        assert!(store.load(Path::new("/media/Show")).unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");
        let records = map_of(&[record("/media/Show/a.mkv", true), record("/media/Show/b.mkv", false)]);

        store.save(dir, &records).unwrap();
        assert_eq!(store.load(dir).unwrap(), records);
    }

    #[test]
    fn every_save_creates_one_distinct_backup() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");

        let mut paths = Vec::new();
        for i in 0..5 {
            let records = map_of(&[record(&format!("/media/Show/{i}.mkv"), true)]);
            paths.push(store.save(dir, &records).unwrap());
        }

        let backups = store.list_backups(dir).unwrap();
        assert_eq!(backups.len(), 5);
        assert_eq!(
            backups.iter().map(|b| b.path.clone()).collect::<Vec<_>>(),
            paths
        );
    }

    #[test]
    fn restore_returns_state_before_last_save() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");
        let first = map_of(&[record("/media/Show/a.mkv", false)]);
        let second = map_of(&[record("/media/Show/a.mkv", true)]);

        store.save(dir, &first).unwrap();
        store.save(dir, &second).unwrap();

        let restored = store.restore_latest(dir).unwrap();
        assert_eq!(restored, first);
        assert_eq!(store.load(dir).unwrap(), first);
    }

    #[test]
    fn restore_snapshots_the_state_it_replaces() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");
        let first = map_of(&[record("/media/Show/a.mkv", false)]);
        let second = map_of(&[record("/media/Show/a.mkv", true)]);

        store.save(dir, &first).unwrap();
        store.save(dir, &second).unwrap();
        assert_eq!(store.list_backups(dir).unwrap().len(), 2);

        assert_eq!(store.restore_latest(dir).unwrap(), first);
        let backups = store.list_backups(dir).unwrap();
        assert_eq!(backups.len(), 3);
        let newest: RecordMap =
            serde_json::from_str(&fs::read_to_string(&backups[2].path).unwrap()).unwrap();
        assert_eq!(newest, second);

        // A second restore undoes the first one.
        assert_eq!(store.restore_latest(dir).unwrap(), second);
        assert_eq!(store.load(dir).unwrap(), second);
        assert_eq!(store.list_backups(dir).unwrap().len(), 4);
    }

    #[test]
    fn first_backup_is_the_empty_mapping() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");
        store
            .save(dir, &map_of(&[record("/media/Show/a.mkv", true)]))
            .unwrap();

        assert!(store.restore_latest(dir).unwrap().is_empty());
    }

    #[test]
    fn restore_without_backup_fails() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.restore_latest(Path::new("/media/Other")),
            Err(RestoreError::NoBackupFound(_))
        ));
        assert!(!store.has_backup(Path::new("/media/Other")));
    }

    #[test]
    fn directories_with_same_name_do_not_collide() {
        let (_tmp, store) = store();
        let a = Path::new("/media/tv/Extras");
        let b = Path::new("/media/movies/Extras");
        assert_ne!(store.record_path(a), store.record_path(b));

        store.save(a, &map_of(&[record("/media/tv/Extras/x.mkv", true)])).unwrap();
        assert!(store.load(b).unwrap().is_empty());
        assert!(store.list_backups(b).unwrap().is_empty());
    }

    #[test]
    fn retention_keeps_newest_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::new(tmp.path().join("json"), Some(2));
        fs::create_dir_all(store.records_dir()).unwrap();
        let dir = Path::new("/media/Show");

        let mut paths = Vec::new();
        for i in 0..4 {
            let records = map_of(&[record(&format!("/media/Show/{i}.mkv"), true)]);
            paths.push(store.save(dir, &records).unwrap());
        }

        let kept: Vec<PathBuf> = store
            .list_backups(dir)
            .unwrap()
            .into_iter()
            .map(|b| b.path)
            .collect();
        assert_eq!(kept, paths[2..].to_vec());
    }

    #[test]
    fn upsert_replaces_whole_record() {
        let mut map = map_of(&[record("/m/a.mkv", false)]);
        let mut replacement = record("/m/a.mkv", true);
        replacement.tracks.clear();
        RecordStore::upsert(&mut map, replacement.clone());

        assert_eq!(map.len(), 1);
        assert_eq!(map[Path::new("/m/a.mkv")], replacement);
    }

    #[test]
    fn corrupt_record_file_is_a_parse_error() {
        let (_tmp, store) = store();
        let dir = Path::new("/media/Show");
        fs::write(store.record_path(dir), "{ not json").unwrap();

        assert!(matches!(store.load(dir), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn backup_suffix_parsing() {
        assert_eq!(
            parse_backup_suffix("20261017T101500.000123"),
            Some(("20261017T101500.000123".to_string(), 0))
        );
        assert_eq!(
            parse_backup_suffix("20261017T101500.000123_4"),
            Some(("20261017T101500.000123".to_string(), 4))
        );
        assert_eq!(parse_backup_suffix("yesterday"), None);
    }
}
