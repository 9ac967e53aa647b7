//! Track selection and edit planning for flag requests.

use tracing::info;

use crate::media::FlagEdit;
use crate::tracks::{FlagKind, TrackDescriptor, TrackKind};

/// How the target track of a file is chosen in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSelector {
    /// The track that already carries the flag if exactly one does,
    /// otherwise the first track of the requested kind.
    Auto,
    /// The first track whose language and title match, compared
    /// case-insensitively after trimming. `None` matches an untitled track.
    Matching {
        language: String,
        title: Option<String>,
    },
}

/// A flag change requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRequest {
    pub kind: TrackKind,
    pub flags: Vec<FlagKind>,
    pub value: bool,
    pub selector: TrackSelector,
    /// Clear the flags on the other tracks of the same kind when setting them.
    pub exclusive: bool,
    pub dry_run: bool,
}

impl FlagRequest {
    pub fn new(kind: TrackKind, flags: Vec<FlagKind>, value: bool) -> Self {
        Self {
            kind,
            flags,
            value,
            selector: TrackSelector::Auto,
            exclusive: false,
            dry_run: false,
        }
    }

    pub fn with_selector(mut self, selector: TrackSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The flag consulted by the automatic tie-break.
    fn primary_flag(&self) -> FlagKind {
        self.flags.first().copied().unwrap_or(FlagKind::Default)
    }
}

/// Pick the track a request applies to, or `None` if the file has no
/// eligible track.
pub fn select_target<'t>(
    tracks: &'t [TrackDescriptor],
    request: &FlagRequest,
) -> Option<&'t TrackDescriptor> {
    let candidates: Vec<&TrackDescriptor> =
        tracks.iter().filter(|t| t.kind == request.kind).collect();

    match &request.selector {
        TrackSelector::Auto => {
            let flag = request.primary_flag();
            let flagged: Vec<&TrackDescriptor> = candidates
                .iter()
                .copied()
                .filter(|t| t.flag(flag))
                .collect();

            let target = if flagged.len() == 1 {
                flagged[0]
            } else {
                *candidates.first()?
            };

            if candidates.len() > 1 && flagged.len() != 1 {
                info!(
                    "{} {} tracks eligible, {} already {}; chose track {} (first in order)",
                    candidates.len(),
                    request.kind,
                    flagged.len(),
                    flag,
                    target.number
                );
            }
            Some(target)
        }
        TrackSelector::Matching { language, title } => {
            let wanted = (
                language.trim().to_lowercase(),
                title.as_deref().unwrap_or("").trim().to_lowercase(),
            );
            candidates.into_iter().find(|t| t.identity() == wanted)
        }
    }
}

/// Edits that bring `target` (and, for exclusive requests, its siblings)
/// to the requested state. Flags already in that state produce no edit.
pub fn plan_edits(
    tracks: &[TrackDescriptor],
    target: &TrackDescriptor,
    request: &FlagRequest,
) -> Vec<FlagEdit> {
    let mut edits: Vec<FlagEdit> = request
        .flags
        .iter()
        .filter(|flag| target.flag(**flag) != request.value)
        .map(|flag| FlagEdit {
            track: target.number,
            flag: *flag,
            value: request.value,
        })
        .collect();

    if request.exclusive && request.value {
        for other in tracks
            .iter()
            .filter(|t| t.kind == target.kind && t.number != target.number)
        {
            for flag in &request.flags {
                if other.flag(*flag) {
                    edits.push(FlagEdit {
                        track: other.number,
                        flag: *flag,
                        value: false,
                    });
                }
            }
        }
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(number: u32, kind: TrackKind, language: &str, default: bool) -> TrackDescriptor {
        TrackDescriptor {
            number,
            kind,
            language: language.to_string(),
            codec: "AAC".to_string(),
            title: None,
            default,
            forced: false,
        }
    }

    fn default_audio() -> FlagRequest {
        FlagRequest::new(TrackKind::Audio, vec![FlagKind::Default], true)
    }

    #[test]
    fn auto_prefers_the_single_flagged_track() {
        let tracks = vec![
            track(1, TrackKind::Audio, "jpn", false),
            track(2, TrackKind::Audio, "eng", true),
        ];
        assert_eq!(select_target(&tracks, &default_audio()).unwrap().number, 2);
    }

    #[test]
    fn auto_falls_back_to_first_of_kind() {
        let tracks = vec![
            track(1, TrackKind::Subtitle, "eng", false),
            track(2, TrackKind::Audio, "jpn", true),
            track(3, TrackKind::Audio, "eng", true),
        ];
        assert_eq!(select_target(&tracks, &default_audio()).unwrap().number, 2);

        let none_flagged = vec![
            track(4, TrackKind::Audio, "jpn", false),
            track(5, TrackKind::Audio, "eng", false),
        ];
        assert_eq!(
            select_target(&none_flagged, &default_audio()).unwrap().number,
            4
        );
    }

    #[test]
    fn no_track_of_kind_means_no_target() {
        let tracks = vec![track(1, TrackKind::Subtitle, "eng", false)];
        assert!(select_target(&tracks, &default_audio()).is_none());
    }

    #[test]
    fn matching_compares_language_and_title_loosely() {
        let mut commentary = track(3, TrackKind::Audio, "eng", false);
        commentary.title = Some("Commentary".to_string());
        let tracks = vec![track(2, TrackKind::Audio, "eng", false), commentary];

        let request = default_audio().with_selector(TrackSelector::Matching {
            language: " ENG".to_string(),
            title: Some("commentary ".to_string()),
        });
        assert_eq!(select_target(&tracks, &request).unwrap().number, 3);

        let untitled = default_audio().with_selector(TrackSelector::Matching {
            language: "eng".to_string(),
            title: None,
        });
        assert_eq!(select_target(&tracks, &untitled).unwrap().number, 2);

        let missing = default_audio().with_selector(TrackSelector::Matching {
            language: "fre".to_string(),
            title: None,
        });
        assert!(select_target(&tracks, &missing).is_none());
    }

    #[test]
    fn plan_skips_flags_already_in_place() {
        let tracks = vec![track(2, TrackKind::Audio, "eng", true)];
        assert!(plan_edits(&tracks, &tracks[0], &default_audio()).is_empty());
    }

    #[test]
    fn exclusive_plan_clears_siblings() {
        let tracks = vec![
            track(1, TrackKind::Audio, "jpn", true),
            track(2, TrackKind::Audio, "eng", false),
            track(3, TrackKind::Subtitle, "eng", true),
        ];
        let request = default_audio().exclusive(true);
        let edits = plan_edits(&tracks, &tracks[1], &request);

        assert_eq!(
            edits,
            vec![
                FlagEdit { track: 2, flag: FlagKind::Default, value: true },
                FlagEdit { track: 1, flag: FlagKind::Default, value: false },
            ]
        );
    }

    #[test]
    fn clearing_is_never_exclusive() {
        let tracks = vec![
            track(1, TrackKind::Audio, "jpn", true),
            track(2, TrackKind::Audio, "eng", true),
        ];
        let request = FlagRequest::new(TrackKind::Audio, vec![FlagKind::Default], false)
            .exclusive(true);
        assert_eq!(
            plan_edits(&tracks, &tracks[0], &request),
            vec![FlagEdit { track: 1, flag: FlagKind::Default, value: false }]
        );
    }
}
