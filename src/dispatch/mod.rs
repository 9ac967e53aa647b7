// Operation dispatcher
//
// Turns a user request into adapter and store calls:
// - Plan: target-track selection and idempotent edit planning
// - Report: per-file outcomes, failures and the end-of-batch tally

pub mod plan;
pub mod report;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

pub use plan::*;
pub use report::*;

use crate::error::{DispatchError, EditError, StoreError};
use crate::media::MediaTool;
use crate::store::RecordStore;
use crate::tracks::{ContainerRef, MetadataRecord, RecordMap, TrackDescriptor, TrackKind};

enum Target {
    Select,
    Exact(u32),
}

/// Runs flag, info and restore operations for one working directory at a time.
pub struct Dispatcher<'a> {
    tool: &'a dyn MediaTool,
    store: &'a RecordStore,
    show_progress: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(tool: &'a dyn MediaTool, store: &'a RecordStore) -> Self {
        Self {
            tool,
            store,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr during multi-file runs
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn store(&self) -> &RecordStore {
        self.store
    }

    /// Apply `request` to every file, in order, continuing past failures.
    ///
    /// Records are saved once at the end; a save failure is reported in
    /// [`BatchReport::store_error`].
    pub fn bulk_set(
        &self,
        directory: &Path,
        files: &[ContainerRef],
        request: &FlagRequest,
    ) -> Result<BatchReport, DispatchError> {
        let mut records = self.store.load(directory)?;
        let mut report = BatchReport::new(request.dry_run);
        let mut dirty = false;

        info!(
            "{}Setting {:?}={} on {} tracks of {} file(s) in {}",
            if request.dry_run { "[DRY RUN] " } else { "" },
            request.flags,
            request.value,
            request.kind,
            files.len(),
            directory.display()
        );

        let pb = self.progress_bar(files.len());
        for file in files {
            pb.set_message(file.display_name.clone());

            match self.apply(&file.path, Target::Select, request) {
                Ok((outcome, refreshed)) => {
                    debug!("{}: {}", file.display_name, outcome);
                    if let Some(record) = refreshed {
                        RecordStore::upsert(&mut records, record);
                        dirty = true;
                    }
                    report.outcomes.push((file.path.clone(), outcome));
                }
                Err(e) => {
                    warn!("{}: {}", file.display_name, e);
                    report.failures.push((file.path.clone(), e));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if dirty {
            report.store_error = self.persist(directory, &records);
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Apply `request` to one exact track of one file.
    pub fn individual_set(
        &self,
        directory: &Path,
        file: &ContainerRef,
        track: u32,
        request: &FlagRequest,
    ) -> Result<BatchReport, DispatchError> {
        let mut records = self.store.load(directory)?;
        let mut report = BatchReport::new(request.dry_run);

        match self.apply(&file.path, Target::Exact(track), request) {
            Ok((outcome, refreshed)) => {
                if let Some(record) = refreshed {
                    RecordStore::upsert(&mut records, record);
                    report.store_error = self.persist(directory, &records);
                }
                report.outcomes.push((file.path.clone(), outcome));
            }
            Err(
                e @ (DispatchError::TrackNotFound { .. } | DispatchError::TrackKindMismatch { .. }),
            ) => return Err(e),
            Err(e) => {
                warn!("{}: {}", file.display_name, e);
                report.failures.push((file.path.clone(), e));
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Describe each file, or reuse its stored record unless `refresh` is set,
    /// and persist what was described. Never edits a container.
    ///
    /// Records written by a flag run carry no stream details and are
    /// described again.
    pub fn info_check(
        &self,
        directory: &Path,
        files: &[ContainerRef],
        refresh: bool,
    ) -> Result<InfoReport, DispatchError> {
        let mut records = self.store.load(directory)?;
        let mut report = InfoReport::default();
        let mut dirty = false;

        let pb = self.progress_bar(files.len());
        for file in files {
            pb.set_message(file.display_name.clone());

            if !refresh {
                let cached = records.get(&file.path).filter(|r| !r.streams.is_empty());
                if let Some(cached) = cached {
                    debug!("Using stored record for {}", file.display_name);
                    report.records.push(cached.clone());
                    pb.inc(1);
                    continue;
                }
            }

            match self.tool.describe(&file.path) {
                Ok(streams) => {
                    let record = MetadataRecord::from_streams(file.path.clone(), streams);
                    RecordStore::upsert(&mut records, record.clone());
                    report.records.push(record);
                    dirty = true;
                }
                Err(e) => {
                    warn!("{}: {}", file.display_name, e);
                    report.failures.push((file.path.clone(), e.into()));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if dirty {
            report.store_error = self.persist(directory, &records);
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Group the `kind` tracks of all files by language and title, in the
    /// order first seen. Stored records are used where present.
    pub fn unique_tracks(
        &self,
        directory: &Path,
        files: &[ContainerRef],
        kind: TrackKind,
    ) -> Result<UniqueTracks, DispatchError> {
        let records = self.store.load(directory)?;
        let mut result = UniqueTracks::default();

        for file in files {
            let tracks = match records.get(&file.path) {
                Some(record) => record.tracks.clone(),
                None => match self.tool.inspect(&file.path) {
                    Ok(tracks) => tracks,
                    Err(e) => {
                        warn!("{}: {}", file.display_name, e);
                        result.failures.push((file.path.clone(), e.into()));
                        continue;
                    }
                },
            };

            let mut seen_in_file = HashSet::new();
            for track in tracks.iter().filter(|t| t.kind == kind) {
                let identity = track.identity();
                if !seen_in_file.insert(identity.clone()) {
                    continue;
                }

                let existing = result.groups.iter_mut().find(|g| {
                    (
                        g.language.trim().to_lowercase(),
                        g.title.as_deref().unwrap_or("").trim().to_lowercase(),
                    ) == identity
                });
                match existing {
                    Some(group) => group.files += 1,
                    None => result.groups.push(TrackGroup {
                        kind,
                        language: track.language.clone(),
                        title: track.title.clone(),
                        files: 1,
                    }),
                }
            }
        }

        Ok(result)
    }

    /// Roll the directory's records back to the latest backup
    pub fn restore(&self, directory: &Path) -> Result<RecordMap, DispatchError> {
        let records = self.store.restore_latest(directory)?;
        info!(
            "Restored {} record(s) for {}",
            records.len(),
            directory.display()
        );
        Ok(records)
    }

    fn apply(
        &self,
        path: &Path,
        target: Target,
        request: &FlagRequest,
    ) -> Result<(FileOutcome, Option<MetadataRecord>), DispatchError> {
        let tracks = self.tool.inspect(path)?;
        let fresh = |tracks: Vec<TrackDescriptor>| {
            if request.dry_run {
                None
            } else {
                Some(MetadataRecord::new(path, tracks))
            }
        };

        let chosen = match target {
            Target::Select => match select_target(&tracks, request) {
                Some(track) => track,
                None => {
                    let reason = match &request.selector {
                        TrackSelector::Auto => format!("no {} tracks", request.kind),
                        TrackSelector::Matching { .. } => "selected track not present".to_string(),
                    };
                    return Ok((FileOutcome::Skipped(reason), fresh(tracks.clone())));
                }
            },
            Target::Exact(number) => {
                let track = tracks.iter().find(|t| t.number == number).ok_or_else(|| {
                    DispatchError::TrackNotFound {
                        path: path.to_path_buf(),
                        track: number,
                    }
                })?;
                if track.kind != request.kind {
                    return Err(DispatchError::TrackKindMismatch {
                        path: path.to_path_buf(),
                        track: number,
                        expected: request.kind.to_string(),
                        actual: track.kind.to_string(),
                    });
                }
                track
            }
        };

        let edits = plan_edits(&tracks, chosen, request);
        if edits.is_empty() {
            return Ok((FileOutcome::Unchanged, fresh(tracks.clone())));
        }
        if request.dry_run {
            return Ok((FileOutcome::WouldChange(edits), None));
        }

        check_writable(path)?;
        self.tool.set_flags(path, &edits)?;

        let refreshed = self.tool.inspect(path)?;
        Ok((
            FileOutcome::Changed(edits),
            Some(MetadataRecord::new(path, refreshed)),
        ))
    }

    fn persist(&self, directory: &Path, records: &RecordMap) -> Option<StoreError> {
        match self.store.save(directory, records) {
            Ok(backup) => {
                debug!("Records saved, previous state in {}", backup.display());
                None
            }
            Err(e) => {
                error!("Failed to save records for {}: {}", directory.display(), e);
                Some(e)
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress || len < 2 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb
    }
}

/// Read-only files are rejected before the editor is invoked.
fn check_writable(path: &Path) -> Result<(), EditError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.permissions().readonly() => {
            Err(EditError::PermissionDenied(path.to_path_buf()))
        }
        _ => Ok(()),
    }
}
