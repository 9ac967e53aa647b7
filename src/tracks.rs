//! Track, record and container types shared by the adapter, store and dispatcher.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record set for one directory, ordered by container path.
pub type RecordMap = BTreeMap<PathBuf, MetadataRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Default,
    Forced,
}

impl FlagKind {
    /// Property name understood by mkvpropedit's `--set`.
    pub fn property_name(&self) -> &'static str {
        match self {
            FlagKind::Default => "flag-default",
            FlagKind::Forced => "flag-forced",
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlagKind::Default => write!(f, "default"),
            FlagKind::Forced => write!(f, "forced"),
        }
    }
}

/// One audio or subtitle stream as reported by the analyser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Matroska track number, addressed as `track:@N` by the editor.
    pub number: u32,
    pub kind: TrackKind,
    pub language: String,
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub default: bool,
    pub forced: bool,
}

impl TrackDescriptor {
    pub fn flag(&self, flag: FlagKind) -> bool {
        match flag {
            FlagKind::Default => self.default,
            FlagKind::Forced => self.forced,
        }
    }

    /// Case-insensitive, whitespace-trimmed (language, title) identity used to
    /// group equivalent tracks across files.
    pub fn identity(&self) -> (String, String) {
        (
            self.language.trim().to_lowercase(),
            self.title.as_deref().unwrap_or("").trim().to_lowercase(),
        )
    }
}

impl fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Track {} [{}] lang={} codec={} title={} default={} forced={}",
            self.number,
            self.kind,
            self.language,
            self.codec,
            self.title.as_deref().unwrap_or("-"),
            yes_no(self.default),
            yes_no(self.forced),
        )
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Language code used when the analyser reports none.
pub const UNDEFINED_LANGUAGE: &str = "und";

/// Analyser section a stream belongs to. Menu and other sections are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSection {
    #[default]
    General,
    Video,
    Audio,
    Text,
}

impl StreamSection {
    pub const ALL: [StreamSection; 4] = [
        StreamSection::General,
        StreamSection::Video,
        StreamSection::Audio,
        StreamSection::Text,
    ];

    /// Section for a mediainfo `@type` value
    pub fn from_mediainfo(track_type: &str) -> Option<Self> {
        match track_type {
            "General" => Some(StreamSection::General),
            "Video" => Some(StreamSection::Video),
            "Audio" => Some(StreamSection::Audio),
            "Text" => Some(StreamSection::Text),
            _ => None,
        }
    }

    /// The flaggable track kind of this section, if any.
    pub fn track_kind(&self) -> Option<TrackKind> {
        match self {
            StreamSection::Audio => Some(TrackKind::Audio),
            StreamSection::Text => Some(TrackKind::Subtitle),
            StreamSection::General | StreamSection::Video => None,
        }
    }
}

impl fmt::Display for StreamSection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamSection::General => write!(f, "General"),
            StreamSection::Video => write!(f, "Video"),
            StreamSection::Audio => write!(f, "Audio"),
            StreamSection::Text => write!(f, "Text"),
        }
    }
}

/// Everything the info view shows about one analyser section entry.
///
/// Values are kept as the analyser prints them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub section: StreamSection,
    /// Matroska track number; `None` for the General section.
    pub number: Option<u32>,
    pub codec: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub file_size: Option<String>,
    pub overall_bit_rate: Option<String>,
    pub bit_rate: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub frame_rate: Option<String>,
    pub channels: Option<String>,
    pub sampling_rate: Option<String>,
    pub default: Option<bool>,
    pub forced: Option<bool>,
}

impl StreamInfo {
    /// Labelled values that are present, in display order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("codec", &self.codec),
            ("language", &self.language),
            ("title", &self.title),
            ("duration", &self.duration),
            ("file_size", &self.file_size),
            ("overall_bit_rate", &self.overall_bit_rate),
            ("bit_rate", &self.bit_rate),
            ("width", &self.width),
            ("height", &self.height),
            ("frame_rate", &self.frame_rate),
            ("channels", &self.channels),
            ("sampling_rate", &self.sampling_rate),
        ];

        let mut fields = Vec::new();
        if let Some(n) = self.number {
            fields.push(("track_id", n.to_string()));
        }
        fields.extend(
            text.into_iter()
                .filter_map(|(label, value)| value.clone().map(|v| (label, v))),
        );
        for (label, flag) in [("default", self.default), ("forced", self.forced)] {
            if let Some(flag) = flag {
                fields.push((label, yes_no(flag).to_string()));
            }
        }
        fields
    }

    /// The flaggable track this entry describes, if it is one.
    pub fn track_descriptor(&self) -> Option<TrackDescriptor> {
        let kind = self.section.track_kind()?;
        Some(TrackDescriptor {
            number: self.number?,
            kind,
            language: self
                .language
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| UNDEFINED_LANGUAGE.to_string()),
            codec: self.codec.clone().unwrap_or_else(|| "unknown".to_string()),
            title: self.title.clone().filter(|t| !t.trim().is_empty()),
            default: self.default.unwrap_or(false),
            forced: self.forced.unwrap_or(false),
        })
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (label, value) in self.fields() {
            writeln!(f, "  {label}: {value}")?;
        }
        Ok(())
    }
}

/// Cached summary of one container as of `refreshed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub path: PathBuf,
    pub tracks: Vec<TrackDescriptor>,
    /// Full analyser view, present once the file went through an info check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<StreamInfo>,
    pub refreshed_at: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn new(path: impl Into<PathBuf>, tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            path: path.into(),
            tracks,
            streams: Vec::new(),
            refreshed_at: Utc::now(),
        }
    }

    /// Record carrying the full analyser view; tracks are derived from it.
    pub fn from_streams(path: impl Into<PathBuf>, streams: Vec<StreamInfo>) -> Self {
        let tracks = streams.iter().filter_map(StreamInfo::track_descriptor).collect();
        Self {
            path: path.into(),
            tracks,
            streams,
            refreshed_at: Utc::now(),
        }
    }

    pub fn streams_in(&self, section: StreamSection) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(move |s| s.section == section)
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }
}

/// A Matroska file found during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub path: PathBuf,
    pub directory: PathBuf,
    /// Path relative to the listing root.
    pub display_name: String,
}

impl ContainerRef {
    pub fn new(path: PathBuf, root: &Path) -> Self {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        let display_name = pathdiff::diff_paths(&path, root)
            .unwrap_or_else(|| path.clone())
            .to_string_lossy()
            .to_string();

        Self {
            path,
            directory,
            display_name,
        }
    }
}
