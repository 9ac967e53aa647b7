// External tool adapter
//
// This module wraps the two external programs the application depends on:
// - Commands: timed subprocess runner and argument builders
// - Mediainfo: analyser JSON mapping
// - Processor: the mkvpropedit/mediainfo backed implementation

pub mod commands;
pub mod mediainfo;
pub mod processor;

use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::error::{EditError, InspectionError};
use crate::tracks::{FlagKind, StreamInfo, TrackDescriptor};

/// One flag assignment on one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagEdit {
    pub track: u32,
    pub flag: FlagKind,
    pub value: bool,
}

/// Inspection and flag editing of container files.
///
/// Calls block until the underlying tool finishes or times out.
#[cfg_attr(test, mockall::automock)]
pub trait MediaTool {
    /// Full analyser view of a container: General, Video, Audio and Text entries
    fn describe(&self, path: &Path) -> Result<Vec<StreamInfo>, InspectionError>;

    /// List the audio and subtitle tracks of a container
    fn inspect(&self, path: &Path) -> Result<Vec<TrackDescriptor>, InspectionError> {
        let streams = self.describe(path)?;
        mediainfo::tracks_from_streams(path, &streams)
    }

    /// Set one flag on one track
    fn set_flag(
        &self,
        path: &Path,
        track: u32,
        flag: FlagKind,
        value: bool,
    ) -> Result<(), EditError> {
        self.set_flags(path, &[FlagEdit { track, flag, value }])
    }

    /// Apply several flag assignments in a single editor invocation
    fn set_flags(&self, path: &Path, edits: &[FlagEdit]) -> Result<(), EditError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Records every editor invocation.
    #[derive(Default)]
    struct RecordingTool {
        invocations: RefCell<Vec<Vec<FlagEdit>>>,
    }

    impl MediaTool for RecordingTool {
        fn describe(&self, path: &Path) -> Result<Vec<StreamInfo>, InspectionError> {
            Err(InspectionError::NotFound(path.to_path_buf()))
        }

        fn set_flags(&self, _path: &Path, edits: &[FlagEdit]) -> Result<(), EditError> {
            self.invocations.borrow_mut().push(edits.to_vec());
            Ok(())
        }
    }

    #[test]
    fn set_flag_is_one_edit_directive() {
        let tool = RecordingTool::default();
        tool.set_flag(Path::new("/media/a.mkv"), 3, FlagKind::Forced, true)
            .unwrap();

        let invocations = tool.invocations.borrow();
        assert_eq!(
            *invocations,
            vec![vec![FlagEdit { track: 3, flag: FlagKind::Forced, value: true }]]
        );

        let cmd = ToolCommandBuilder::new("mkvpropedit", "mediainfo", Duration::from_secs(5))
            .edit_flags("/media/a.mkv", &invocations[0]);
        assert_eq!(
            cmd.args,
            vec!["/media/a.mkv", "--edit", "track:@3", "--set", "flag-forced=1"]
        );
    }

    #[test]
    fn inspect_keeps_only_flaggable_tracks() {
        struct Described;
        impl MediaTool for Described {
            fn describe(&self, _path: &Path) -> Result<Vec<StreamInfo>, InspectionError> {
                Ok(vec![
                    StreamInfo::default(),
                    StreamInfo {
                        section: crate::tracks::StreamSection::Audio,
                        number: Some(2),
                        language: Some("jpn".to_string()),
                        default: Some(true),
                        ..StreamInfo::default()
                    },
                ])
            }

            fn set_flags(&self, _path: &Path, _edits: &[FlagEdit]) -> Result<(), EditError> {
                Ok(())
            }
        }

        let tracks = Described.inspect(Path::new("/media/a.mkv")).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].number, 2);
        assert!(tracks[0].default);
    }
}
