//! Outcome reporting for batch operations.

use std::fmt;
use std::path::PathBuf;

use crate::error::{DispatchError, StoreError};
use crate::media::FlagEdit;
use crate::tracks::{MetadataRecord, TrackKind};

/// What happened to one file in a flag run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Changed(Vec<FlagEdit>),
    Unchanged,
    /// Dry run: these edits would have been applied.
    WouldChange(Vec<FlagEdit>),
    Skipped(String),
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileOutcome::Changed(edits) => write!(f, "changed ({})", describe_edits(edits)),
            FileOutcome::Unchanged => write!(f, "already set"),
            FileOutcome::WouldChange(edits) => {
                write!(f, "would change ({})", describe_edits(edits))
            }
            FileOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

fn describe_edits(edits: &[FlagEdit]) -> String {
    edits
        .iter()
        .map(|e| format!("track {} {}={}", e.track, e.flag, u8::from(e.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of a bulk or single-file flag run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(PathBuf, FileOutcome)>,
    pub failures: Vec<(PathBuf, DispatchError)>,
    /// Set when the records could not be persisted after the run.
    pub store_error: Option<StoreError>,
    pub dry_run: bool,
}

impl BatchReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Changed(_) | FileOutcome::WouldChange(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unchanged))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn outcome_for(&self, path: &std::path::Path) -> Option<&FileOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, outcome)| outcome)
    }

    /// End-of-batch tally line
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "would change" } else { "changed" };
        let mut line = format!(
            "{} file(s): {} {}, {} unchanged, {} skipped, {} failed",
            self.total(),
            self.succeeded(),
            verb,
            self.unchanged(),
            self.skipped(),
            self.failed()
        );
        if self.store_error.is_some() {
            line.push_str(" (records not saved)");
        }
        line
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Result of an info check or refresh.
#[derive(Debug, Default)]
pub struct InfoReport {
    pub records: Vec<MetadataRecord>,
    pub failures: Vec<(PathBuf, DispatchError)>,
    pub store_error: Option<StoreError>,
}

impl InfoReport {
    pub fn summary(&self) -> String {
        format!(
            "{} file(s) inspected, {} failed",
            self.records.len(),
            self.failures.len()
        )
    }
}

/// Equivalent tracks grouped across files by (language, title).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub kind: TrackKind,
    pub language: String,
    pub title: Option<String>,
    /// Number of files containing at least one such track.
    pub files: usize,
}

impl fmt::Display for TrackGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Language: {}, Title: {} ({} MKV file{})",
            self.language,
            self.title.as_deref().unwrap_or(""),
            self.files,
            if self.files == 1 { "" } else { "s" }
        )
    }
}

#[derive(Debug, Default)]
pub struct UniqueTracks {
    pub groups: Vec<TrackGroup>,
    pub failures: Vec<(PathBuf, DispatchError)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectionError;
    use crate::tracks::FlagKind;

    #[test]
    fn summary_tallies_every_outcome() {
        let mut report = BatchReport::new(false);
        report.outcomes.push((
            "a.mkv".into(),
            FileOutcome::Changed(vec![FlagEdit { track: 2, flag: FlagKind::Default, value: true }]),
        ));
        report.outcomes.push(("b.mkv".into(), FileOutcome::Unchanged));
        report.outcomes.push(("c.mkv".into(), FileOutcome::Skipped("no match".into())));
        report.failures.push((
            "d.mkv".into(),
            InspectionError::NotFound("d.mkv".into()).into(),
        ));

        assert_eq!(
            report.summary(),
            "4 file(s): 1 changed, 1 unchanged, 1 skipped, 1 failed"
        );
    }

    #[test]
    fn dry_run_summary_uses_conditional_wording() {
        let mut report = BatchReport::new(true);
        report.outcomes.push((
            "a.mkv".into(),
            FileOutcome::WouldChange(vec![FlagEdit { track: 3, flag: FlagKind::Forced, value: false }]),
        ));
        assert_eq!(
            report.summary(),
            "1 file(s): 1 would change, 0 unchanged, 0 skipped, 0 failed"
        );
        assert_eq!(
            report.outcome_for(std::path::Path::new("a.mkv")).unwrap().to_string(),
            "would change (track 3 forced=0)"
        );
    }

    #[test]
    fn group_display_pluralises() {
        let group = TrackGroup {
            kind: TrackKind::Subtitle,
            language: "eng".into(),
            title: Some("Signs".into()),
            files: 1,
        };
        assert_eq!(group.to_string(), "Language: eng, Title: Signs (1 MKV file)");
    }
}
