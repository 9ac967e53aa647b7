//! mkvflags - batch editing of MKV track flags
//!
//! Walks a media directory, inspects Matroska files with `mediainfo`, caches
//! their track metadata as JSON records with timestamped backups, and sets
//! the default and forced flags of audio and subtitle tracks through
//! `mkvpropedit`, one file or a whole directory at a time.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod menu;
pub mod navigator;
pub mod setup;
pub mod shell;
pub mod store;
pub mod tracks;
