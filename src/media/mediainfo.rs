//! Mapping of `mediainfo --Output=JSON` into [`StreamInfo`]s and the
//! flaggable [`TrackDescriptor`]s derived from them.
//!
//! General, Video, Audio and Text entries are kept; Menu entries are ignored.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::InspectionError;
use crate::tracks::{StreamInfo, StreamSection, TrackDescriptor};

#[derive(Debug, Deserialize)]
struct MiOutput {
    media: Option<MiMedia>,
}

#[derive(Debug, Deserialize)]
struct MiMedia {
    #[serde(default)]
    track: Vec<MiTrack>,
}

#[derive(Debug, Deserialize)]
struct MiTrack {
    #[serde(rename = "@type")]
    track_type: String,

    #[serde(rename = "ID")]
    id: Option<String>,

    #[serde(rename = "StreamOrder")]
    stream_order: Option<String>,

    #[serde(rename = "Format")]
    format: Option<String>,

    #[serde(rename = "CodecID")]
    codec_id: Option<String>,

    #[serde(rename = "Language")]
    language: Option<String>,

    #[serde(rename = "Title")]
    title: Option<String>,

    #[serde(rename = "Default")]
    default: Option<String>,

    #[serde(rename = "Forced")]
    forced: Option<String>,

    #[serde(rename = "Duration")]
    duration: Option<String>,

    #[serde(rename = "FileSize")]
    file_size: Option<String>,

    #[serde(rename = "OverallBitRate")]
    overall_bit_rate: Option<String>,

    #[serde(rename = "BitRate")]
    bit_rate: Option<String>,

    #[serde(rename = "Width")]
    width: Option<String>,

    #[serde(rename = "Height")]
    height: Option<String>,

    #[serde(rename = "FrameRate")]
    frame_rate: Option<String>,

    #[serde(rename = "Channels")]
    channels: Option<String>,

    #[serde(rename = "SamplingRate")]
    sampling_rate: Option<String>,
}

/// Parse analyser output for `path` into every kept section entry.
pub fn parse_streams(path: &Path, json: &str) -> Result<Vec<StreamInfo>, InspectionError> {
    let output: MiOutput =
        serde_json::from_str(json).map_err(|e| InspectionError::Unreadable {
            path: path.to_path_buf(),
            message: format!("mediainfo JSON parse error: {e}"),
        })?;

    let Some(media) = output.media else {
        return Err(InspectionError::Unreadable {
            path: path.to_path_buf(),
            message: "mediainfo returned no media section".to_string(),
        });
    };

    Ok(media
        .track
        .into_iter()
        .filter_map(|track| {
            let section = StreamSection::from_mediainfo(&track.track_type)?;
            let number = match section {
                StreamSection::General => None,
                _ => track_number(&track),
            };
            Some(StreamInfo {
                section,
                number,
                codec: non_empty(track.format).or(non_empty(track.codec_id)),
                language: non_empty(track.language),
                title: non_empty(track.title),
                duration: non_empty(track.duration),
                file_size: non_empty(track.file_size),
                overall_bit_rate: non_empty(track.overall_bit_rate),
                bit_rate: non_empty(track.bit_rate),
                width: non_empty(track.width),
                height: non_empty(track.height),
                frame_rate: non_empty(track.frame_rate),
                channels: non_empty(track.channels),
                sampling_rate: non_empty(track.sampling_rate),
                default: track.default.as_deref().map(yes_no),
                forced: track.forced.as_deref().map(yes_no),
            })
        })
        .collect())
}

/// Audio and subtitle tracks of `streams`; `NoTracks` when there are none.
pub fn tracks_from_streams(
    path: &Path,
    streams: &[StreamInfo],
) -> Result<Vec<TrackDescriptor>, InspectionError> {
    let mut tracks = Vec::new();
    for stream in streams {
        let Some(kind) = stream.section.track_kind() else {
            continue;
        };
        match stream.track_descriptor() {
            Some(track) => tracks.push(track),
            None => warn!(
                "Skipping {} track without a usable ID in {}",
                kind,
                path.display()
            ),
        }
    }

    if tracks.is_empty() {
        return Err(InspectionError::NoTracks(path.to_path_buf()));
    }
    Ok(tracks)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Matroska track number: `ID`, else the zero-based `StreamOrder` plus one.
fn track_number(track: &MiTrack) -> Option<u32> {
    if let Some(n) = track.id.as_deref().and_then(leading_number) {
        return Some(n);
    }
    track
        .stream_order
        .as_deref()
        .and_then(leading_number)
        .map(|n| n + 1)
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn yes_no(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}
