//! Interactive terminal front end.
//!
//! The shell only renders menus, reads selections and hands work to the
//! [`Dispatcher`]. It is generic over its input and output so whole sessions
//! can be scripted.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatch::{BatchReport, Dispatcher, FlagRequest, InfoReport, TrackSelector};
use crate::error::Result;
use crate::media::MediaTool;
use crate::menu::{
    BrowseEntry, BrowseMenu, EditAction, ExecuteChoice, FieldFilter, FlagSet, InfoAction,
    ListPick, MainAction, SettingsAction,
};
use crate::navigator;
use crate::store::RecordStore;
use crate::tracks::{ContainerRef, StreamSection, TrackKind};

const CHOICE_PROMPT: &str = "\nEnter your choice: ";
const SEPARATOR: &str = "----------------------------------------";

/// Where control goes after a submenu returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    MainMenu,
    /// Input is exhausted
    Quit,
}

/// What a directory browser does with "Work in current directory".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowseMode {
    Info,
    Edit,
}

pub struct Shell<'a, R: BufRead, W: Write> {
    input: R,
    output: W,
    config: Config,
    config_path: PathBuf,
    tool: &'a dyn MediaTool,
    store: RecordStore,
    show_progress: bool,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        config: Config,
        config_path: PathBuf,
        tool: &'a dyn MediaTool,
    ) -> Self {
        let store = RecordStore::from_config(&config.store);
        Self {
            input,
            output,
            config,
            config_path,
            tool,
            store,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the main menu until the user exits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let has_dir = self.config.media_directory.is_some();
            write!(self.output, "{}", MainAction::render(has_dir))?;

            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                info!("Input closed, exiting");
                return Ok(());
            };

            let flow = match MainAction::from_selection(&line, has_dir) {
                Some(MainAction::BrowseStored) => match self.config.media_directory.clone() {
                    Some(dir) if dir.is_dir() => self.browse(dir, BrowseMode::Info)?,
                    Some(dir) => {
                        self.report_error(&format!(
                            "Stored media directory '{}' not found.",
                            dir.display()
                        ))?;
                        Flow::Continue
                    }
                    None => Flow::Continue,
                },
                Some(MainAction::CheckCustom) => {
                    let Some(dir) = self.prompt("Enter the directory to check for media files: ")?
                    else {
                        return Ok(());
                    };
                    let dir = PathBuf::from(dir);
                    if dir.is_dir() {
                        self.browse(dir, BrowseMode::Info)?
                    } else {
                        self.report_error(&format!(
                            "Directory '{}' not found. Please try again.",
                            dir.display()
                        ))?;
                        Flow::Continue
                    }
                }
                Some(MainAction::EditFiles) => match self.config.media_directory.clone() {
                    Some(dir) if dir.is_dir() => self.browse(dir, BrowseMode::Edit)?,
                    other => {
                        let shown = other
                            .map(|d| d.display().to_string())
                            .unwrap_or_default();
                        self.report_error(&format!(
                            "Configured media directory '{shown}' not found."
                        ))?;
                        Flow::Continue
                    }
                },
                Some(MainAction::Configure) => self.settings()?,
                Some(MainAction::Exit) => {
                    info!("Exiting program.");
                    return Ok(());
                }
                None => {
                    self.invalid()?;
                    Flow::Continue
                }
            };

            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn browse(&mut self, start: PathBuf, mode: BrowseMode) -> Result<Flow> {
        let mut current = start;

        loop {
            let subdirectories = navigator::list_subdirectories(&current);
            let containers =
                navigator::list_containers(&current, self.config.include_subdirectories);
            let menu = BrowseMenu {
                subdirectories: subdirectories.len(),
                containers: containers.len(),
            };
            write!(
                self.output,
                "{}",
                menu.render(&current.display().to_string(), &subdirectories)
            )?;

            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Flow::Quit);
            };

            match menu.from_selection(&line) {
                Some(BrowseEntry::Subdirectory(i)) => {
                    match navigator::enter_subdirectory(&current, &subdirectories[i]) {
                        Ok(path) => current = path,
                        Err(e) => self.report_error(&e.to_string())?,
                    }
                }
                Some(BrowseEntry::ListFiles) => {
                    writeln!(self.output, "\nList of files:")?;
                    for (idx, c) in containers.iter().enumerate() {
                        writeln!(self.output, "{}. {}", idx + 1, c.display_name)?;
                    }
                }
                Some(BrowseEntry::WorkHere) => {
                    let flow = match mode {
                        BrowseMode::Info => self.info_menu(&current, &containers)?,
                        BrowseMode::Edit => self.edit_menu(&current)?,
                    };
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                }
                Some(BrowseEntry::Parent) => match navigator::parent_directory(&current) {
                    Some(parent) if parent.is_dir() => current = parent,
                    _ => writeln!(self.output, "No previous directory.")?,
                },
                Some(BrowseEntry::MainMenu) => return Ok(Flow::MainMenu),
                None => self.invalid()?,
            }
        }
    }

    fn info_menu(&mut self, directory: &Path, containers: &[ContainerRef]) -> Result<Flow> {
        write!(self.output, "{}", InfoAction::render())?;
        let Some(line) = self.prompt(CHOICE_PROMPT)? else {
            return Ok(Flow::Quit);
        };

        let files: Vec<ContainerRef> = match InfoAction::from_selection(&line) {
            Some(InfoAction::OneFile) => match self.pick_file(containers)? {
                Some(file) => vec![file],
                None => return Ok(Flow::Continue),
            },
            Some(InfoAction::AllFiles) => containers.to_vec(),
            Some(InfoAction::Back) => return Ok(Flow::Continue),
            Some(InfoAction::MainMenu) => return Ok(Flow::MainMenu),
            None => {
                self.invalid()?;
                return Ok(Flow::Continue);
            }
        };

        let filter = loop {
            write!(self.output, "{}", FieldFilter::render())?;
            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Flow::Quit);
            };
            match FieldFilter::from_selection(&line) {
                Some(FieldFilter::Back) => return Ok(Flow::Continue),
                Some(FieldFilter::MainMenu) => return Ok(Flow::MainMenu),
                Some(filter) => break filter,
                None => self.invalid()?,
            }
        };

        let result = self.dispatcher().info_check(directory, &files, false);
        match result {
            Ok(report) => self.print_info(&report, filter)?,
            Err(e) => self.report_error(&e.to_string())?,
        }
        Ok(Flow::Continue)
    }

    fn edit_menu(&mut self, directory: &Path) -> Result<Flow> {
        loop {
            let containers =
                navigator::list_containers(directory, self.config.include_subdirectories);
            if containers.is_empty() {
                info!("No MKV files found in {}", directory.display());
                writeln!(self.output, "No MKV files found in this directory.")?;
                return Ok(Flow::MainMenu);
            }

            let backup_exists = self.store.has_backup(directory);
            write!(self.output, "{}", EditAction::render(backup_exists))?;
            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Flow::Quit);
            };

            let flow = match EditAction::from_selection(&line, backup_exists) {
                Some(EditAction::Bulk { kind, flags }) => {
                    self.bulk_flow(directory, &containers, kind, flags)?
                }
                Some(EditAction::Single { kind, flags }) => {
                    self.single_flow(directory, &containers, kind, flags)?
                }
                Some(EditAction::Refresh) => {
                    let result = self.dispatcher().info_check(directory, &containers, true);
                    match result {
                        Ok(report) => {
                            self.print_failures(&report.failures)?;
                            writeln!(
                                self.output,
                                "\nMedia information refreshed successfully. {}",
                                report.summary()
                            )?;
                        }
                        Err(e) => self.report_error(&e.to_string())?,
                    }
                    Flow::Continue
                }
                Some(EditAction::Restore) => {
                    let result = self.dispatcher().restore(directory);
                    match result {
                        Ok(records) => writeln!(
                            self.output,
                            "Restored {} record(s) from the latest backup.",
                            records.len()
                        )?,
                        Err(e) => self.report_error(&e.to_string())?,
                    }
                    Flow::Continue
                }
                Some(EditAction::Back) => return Ok(Flow::Continue),
                Some(EditAction::MainMenu) => return Ok(Flow::MainMenu),
                None => {
                    self.invalid()?;
                    Flow::Continue
                }
            };

            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
    }

    fn bulk_flow(
        &mut self,
        directory: &Path,
        containers: &[ContainerRef],
        kind: TrackKind,
        flags: FlagSet,
    ) -> Result<Flow> {
        writeln!(self.output, "\nBulk set {} {} tracks", flags.label(), kind)?;
        writeln!(self.output, "Collecting unique tracks across all MKV files...")?;

        let result = self.dispatcher().unique_tracks(directory, containers, kind);
        let unique = match result {
            Ok(unique) => unique,
            Err(e) => {
                self.report_error(&e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        self.print_failures(&unique.failures)?;
        if unique.groups.is_empty() {
            writeln!(self.output, "No {kind} tracks found.")?;
            return Ok(Flow::Continue);
        }

        writeln!(self.output, "\nAvailable tracks:")?;
        for (idx, group) in unique.groups.iter().enumerate() {
            writeln!(self.output, "{}. {}", idx + 1, group)?;
        }
        let auto_index = unique.groups.len();
        writeln!(
            self.output,
            "{}. Automatic (the track already flagged, else the first {} track)",
            auto_index + 1,
            kind
        )?;

        let selector = loop {
            let prompt = format!(
                "\nSelect the track to set as {} (1-{}), or 0 to cancel: ",
                flags.label(),
                auto_index + 1
            );
            let Some(line) = self.prompt(&prompt)? else {
                return Ok(Flow::Quit);
            };
            match ListPick::from_selection(&line, auto_index + 1) {
                Some(ListPick::Cancel) => return Ok(Flow::Continue),
                Some(ListPick::Item(i)) if i == auto_index => break TrackSelector::Auto,
                Some(ListPick::Item(i)) => {
                    let group = &unique.groups[i];
                    break TrackSelector::Matching {
                        language: group.language.clone(),
                        title: group.title.clone(),
                    };
                }
                None => self.invalid()?,
            }
        };

        let request = FlagRequest::new(kind, flags.flags(), true)
            .with_selector(selector)
            .exclusive(true);

        loop {
            write!(self.output, "{}", ExecuteChoice::render())?;
            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Flow::Quit);
            };
            let request = match ExecuteChoice::from_selection(&line) {
                Some(ExecuteChoice::DryRun) => request.clone().dry_run(true),
                Some(ExecuteChoice::Execute) => request.clone(),
                Some(ExecuteChoice::Back) => return Ok(Flow::Continue),
                Some(ExecuteChoice::MainMenu) => return Ok(Flow::MainMenu),
                None => {
                    self.invalid()?;
                    continue;
                }
            };

            let result = self.dispatcher().bulk_set(directory, containers, &request);
            match result {
                Ok(report) => self.print_batch(&report, containers)?,
                Err(e) => self.report_error(&e.to_string())?,
            }
            return Ok(Flow::Continue);
        }
    }

    fn single_flow(
        &mut self,
        directory: &Path,
        containers: &[ContainerRef],
        kind: TrackKind,
        flags: FlagSet,
    ) -> Result<Flow> {
        writeln!(
            self.output,
            "\nSet {} {} track for a single file",
            flags.label(),
            kind
        )?;
        let Some(file) = self.pick_file(containers)? else {
            return Ok(Flow::Continue);
        };

        let result = self
            .dispatcher()
            .info_check(directory, std::slice::from_ref(&file), false);
        let tracks = match result {
            Ok(report) => {
                self.print_failures(&report.failures)?;
                match report.records.into_iter().next() {
                    Some(record) => record.tracks_of(kind).cloned().collect::<Vec<_>>(),
                    None => return Ok(Flow::Continue),
                }
            }
            Err(e) => {
                self.report_error(&e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        if tracks.is_empty() {
            writeln!(
                self.output,
                "No {} tracks found in '{}'.",
                kind, file.display_name
            )?;
            return Ok(Flow::Continue);
        }

        writeln!(self.output, "\nAvailable {} tracks in '{}':", kind, file.display_name)?;
        for (idx, track) in tracks.iter().enumerate() {
            writeln!(
                self.output,
                "{}. Track ID: {}, Language: {}, Title: {}, Default: {}, Forced: {}",
                idx + 1,
                track.number,
                track.language,
                track.title.as_deref().unwrap_or("No Title"),
                track.default,
                track.forced
            )?;
        }

        let chosen = loop {
            let prompt = format!(
                "\nSelect a track to set as {} (1-{}), or 0 to cancel: ",
                flags.label(),
                tracks.len()
            );
            let Some(line) = self.prompt(&prompt)? else {
                return Ok(Flow::Quit);
            };
            match ListPick::from_selection(&line, tracks.len()) {
                Some(ListPick::Item(i)) => break tracks[i].number,
                Some(ListPick::Cancel) => return Ok(Flow::Continue),
                None => self.invalid()?,
            }
        };

        let request = FlagRequest::new(kind, flags.flags(), true).exclusive(true);
        let result = self
            .dispatcher()
            .individual_set(directory, &file, chosen, &request);
        match result {
            Ok(report) => self.print_batch(&report, std::slice::from_ref(&file))?,
            Err(e) => self.report_error(&e.to_string())?,
        }
        Ok(Flow::Continue)
    }

    fn settings(&mut self) -> Result<Flow> {
        loop {
            write!(
                self.output,
                "{}",
                SettingsAction::render(self.config.include_subdirectories)
            )?;
            let Some(line) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Flow::Quit);
            };

            match SettingsAction::from_selection(&line) {
                Some(SettingsAction::SetMediaDirectory) => {
                    let Some(dir) = self.prompt("Enter the path to your media directory: ")?
                    else {
                        return Ok(Flow::Quit);
                    };
                    let dir = PathBuf::from(dir);
                    if !dir.is_dir() {
                        self.report_error(&format!(
                            "Directory '{}' does not exist.",
                            dir.display()
                        ))?;
                        continue;
                    }

                    self.config.media_directory = Some(dir.clone());
                    match self.config.save_to_file(&self.config_path) {
                        Ok(()) => {
                            info!("Media directory set to '{}'", dir.display());
                            writeln!(self.output, "Media directory set to '{}'.", dir.display())?;
                        }
                        Err(e) => self.report_error(&e.to_string())?,
                    }
                }
                Some(SettingsAction::ToggleSubdirectories) => {
                    self.config.include_subdirectories = !self.config.include_subdirectories;
                    match self.config.save_to_file(&self.config_path) {
                        Ok(()) => {
                            let state = if self.config.include_subdirectories {
                                "on"
                            } else {
                                "off"
                            };
                            info!("Including subdirectories: {}", state);
                            writeln!(self.output, "Including subdirectories is now {state}.")?;
                        }
                        Err(e) => self.report_error(&e.to_string())?,
                    }
                }
                Some(SettingsAction::Return) => return Ok(Flow::Continue),
                None => self.invalid()?,
            }
        }
    }

    fn pick_file(&mut self, containers: &[ContainerRef]) -> Result<Option<ContainerRef>> {
        writeln!(self.output, "\nAvailable MKV Files:")?;
        for (idx, c) in containers.iter().enumerate() {
            writeln!(self.output, "{}. {}", idx + 1, c.display_name)?;
        }

        loop {
            let prompt = format!(
                "\nSelect a file (1-{}), or 0 to cancel: ",
                containers.len()
            );
            let Some(line) = self.prompt(&prompt)? else {
                return Ok(None);
            };
            match ListPick::from_selection(&line, containers.len()) {
                Some(ListPick::Item(i)) => return Ok(Some(containers[i].clone())),
                Some(ListPick::Cancel) => return Ok(None),
                None => self.invalid()?,
            }
        }
    }

    fn print_info(&mut self, report: &InfoReport, filter: FieldFilter) -> Result<()> {
        for record in &report.records {
            let name = record
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| record.path.display().to_string());
            writeln!(self.output, "\n{name}")?;
            for section in StreamSection::ALL.into_iter().filter(|s| filter.shows(*s)) {
                let streams: Vec<_> = record.streams_in(section).collect();
                if streams.is_empty() {
                    continue;
                }
                writeln!(self.output, "\n{section} Tracks:")?;
                for stream in streams {
                    write!(self.output, "{stream}")?;
                    writeln!(self.output, "{SEPARATOR}")?;
                }
            }
        }
        self.print_failures(&report.failures)?;
        if let Some(e) = &report.store_error {
            writeln!(self.output, "Warning: records not saved: {e}")?;
        }
        writeln!(self.output, "\n{}", report.summary())?;
        Ok(())
    }

    fn print_batch(&mut self, report: &BatchReport, containers: &[ContainerRef]) -> Result<()> {
        let name_of = |path: &Path| {
            containers
                .iter()
                .find(|c| c.path == path)
                .map(|c| c.display_name.clone())
                .unwrap_or_else(|| path.display().to_string())
        };

        for (path, outcome) in &report.outcomes {
            writeln!(self.output, "  {}: {}", name_of(path), outcome)?;
        }
        for (path, e) in &report.failures {
            writeln!(self.output, "  {}: FAILED: {}", name_of(path), e)?;
        }
        if let Some(e) = &report.store_error {
            writeln!(self.output, "Warning: records not saved: {e}")?;
        }
        if report.dry_run {
            writeln!(self.output, "\nDry run completed. No changes have been made.")?;
        }
        writeln!(self.output, "{}", report.summary())?;
        Ok(())
    }

    fn print_failures(&mut self, failures: &[(PathBuf, crate::error::DispatchError)]) -> Result<()> {
        for (path, e) in failures {
            writeln!(self.output, "  {}: FAILED: {}", path.display(), e)?;
        }
        Ok(())
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(self.tool, &self.store).with_progress(self.show_progress)
    }

    /// Print `prompt` and read one trimmed line; `None` at end of input.
    ///
    /// Bytes that are not UTF-8 are replaced, so such input reads as an
    /// invalid selection instead of an error.
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            debug!("End of input");
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }

    fn invalid(&mut self) -> Result<()> {
        warn!("Invalid menu selection");
        writeln!(self.output, "Invalid choice. Please select a valid option.")?;
        Ok(())
    }

    fn report_error(&mut self, message: &str) -> Result<()> {
        error!("{}", message);
        writeln!(self.output, "Error: {message}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    use crate::media::{FlagEdit, MockMediaTool};
    use crate::tracks::{FlagKind, StreamInfo, TrackDescriptor};

    fn audio(number: u32, language: &str) -> TrackDescriptor {
        TrackDescriptor {
            number,
            kind: TrackKind::Audio,
            language: language.to_string(),
            codec: "AAC".to_string(),
            title: None,
            default: false,
            forced: false,
        }
    }

    fn config_in(temp: &TempDir, media: Option<PathBuf>) -> Config {
        let mut config = Config::default();
        config.media_directory = media;
        config.store.records_dir = temp.path().join("json");
        config
    }

    fn run_script(script: &str, config: Config, config_path: PathBuf, tool: &MockMediaTool) -> (String, Config) {
        let mut output = Vec::new();
        let mut shell = Shell::new(Cursor::new(script.as_bytes()), &mut output, config, config_path, tool);
        shell.run().unwrap();
        let config = shell.config().clone();
        drop(shell);
        (String::from_utf8(output).unwrap(), config)
    }

    #[test]
    fn exit_and_end_of_input_both_stop() {
        let temp = TempDir::new().unwrap();
        let tool = MockMediaTool::new();
        let path = temp.path().join("config.toml");

        let (out, _) = run_script("5\n", config_in(&temp, None), path.clone(), &tool);
        assert!(out.contains("Main Menu"));
        assert!(!out.contains("1. Browse media in stored directory"));

        let (out, _) = run_script("", config_in(&temp, None), path, &tool);
        assert!(out.contains("Enter your choice"));
    }

    #[test]
    fn invalid_selection_reprompts() {
        let temp = TempDir::new().unwrap();
        let tool = MockMediaTool::new();
        let (out, _) = run_script(
            "9\n1\n5\n",
            config_in(&temp, None),
            temp.path().join("config.toml"),
            &tool,
        );
        assert_eq!(out.matches("Invalid choice").count(), 2);
        assert_eq!(out.matches("\nMain Menu\n").count(), 3);
    }

    #[test]
    fn non_utf8_input_is_an_invalid_choice() {
        let temp = TempDir::new().unwrap();
        let tool = MockMediaTool::new();
        let mut output = Vec::new();
        let mut shell = Shell::new(
            Cursor::new(&b"\xff\xfe\n5\n"[..]),
            &mut output,
            config_in(&temp, None),
            temp.path().join("config.toml"),
            &tool,
        );

        shell.run().unwrap();
        drop(shell);
        let out = String::from_utf8(output).unwrap();
        assert_eq!(out.matches("Invalid choice").count(), 1);
        assert_eq!(out.matches("\nMain Menu\n").count(), 2);
    }

    #[test]
    fn settings_persist_media_directory() {
        let temp = TempDir::new().unwrap();
        temp.child("media").create_dir_all().unwrap();
        let media = temp.path().join("media");
        let config_path = temp.path().join("config.toml");
        let tool = MockMediaTool::new();

        let script = format!("4\n1\n/no/such/dir\n1\n{}\n2\n3\n5\n", media.display());
        let (out, config) = run_script(&script, config_in(&temp, None), config_path.clone(), &tool);

        assert!(out.contains("does not exist"));
        assert!(out.contains("Including subdirectories is now on."));
        assert_eq!(config.media_directory, Some(media.clone()));
        let saved = Config::from_file(&config_path).unwrap();
        assert_eq!(saved.media_directory, Some(media));
        assert!(saved.include_subdirectories);
    }

    #[test]
    fn bulk_default_audio_from_edit_menu() {
        let temp = TempDir::new().unwrap();
        temp.child("media/ep1.mkv").touch().unwrap();
        let media = temp.path().join("media");

        let mut tool = MockMediaTool::new();
        tool.expect_inspect()
            .returning(|_| Ok(vec![audio(2, "jpn"), audio(3, "eng")]));
        tool.expect_set_flags()
            .withf(|_, edits| {
                edits.to_vec() == vec![FlagEdit { track: 3, flag: FlagKind::Default, value: true }]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        // edit -> work here -> bulk default audio -> "eng" -> execute -> main -> exit
        let script = "3\n2\n3\n2\n2\n0\n5\n";
        let (out, _) = run_script(
            script,
            config_in(&temp, Some(media.clone())),
            temp.path().join("config.toml"),
            &tool,
        );

        assert!(out.contains("1. Language: jpn, Title:  (1 MKV file)"));
        assert!(out.contains("ep1.mkv: changed (track 3 default=1)"));
        assert!(out.contains("1 file(s): 1 changed, 0 unchanged, 0 skipped, 0 failed"));
        assert!(out.contains("14. Restore previous changes back"));
    }

    #[test]
    fn dry_run_does_not_edit() {
        let temp = TempDir::new().unwrap();
        temp.child("media/ep1.mkv").touch().unwrap();
        let media = temp.path().join("media");

        let mut tool = MockMediaTool::new();
        tool.expect_inspect().returning(|_| Ok(vec![audio(2, "jpn")]));
        tool.expect_set_flags().never();

        // edit -> work here -> bulk forced audio -> automatic -> dry run -> back -> main -> exit
        let script = "3\n2\n1\n2\n1\n14\n0\n5\n";
        let (out, _) = run_script(
            script,
            config_in(&temp, Some(media)),
            temp.path().join("config.toml"),
            &tool,
        );

        assert!(out.contains("would change (track 2 forced=1)"));
        assert!(out.contains("Dry run completed"));
    }

    fn described(tracks: &[TrackDescriptor]) -> Vec<StreamInfo> {
        let mut streams = vec![
            StreamInfo {
                codec: Some("Matroska".to_string()),
                file_size: Some("734003200".to_string()),
                duration: Some("1420.064".to_string()),
                ..StreamInfo::default()
            },
            StreamInfo {
                section: StreamSection::Video,
                number: Some(1),
                codec: Some("AVC".to_string()),
                width: Some("1920".to_string()),
                height: Some("1080".to_string()),
                ..StreamInfo::default()
            },
        ];
        streams.extend(tracks.iter().map(|t| StreamInfo {
            section: match t.kind {
                TrackKind::Audio => StreamSection::Audio,
                TrackKind::Subtitle => StreamSection::Text,
            },
            number: Some(t.number),
            language: Some(t.language.clone()),
            codec: Some(t.codec.clone()),
            ..StreamInfo::default()
        }));
        streams
    }

    fn info_session(filter: &str) -> String {
        let temp = TempDir::new().unwrap();
        temp.child("media/a.mkv").touch().unwrap();
        let media = temp.path().join("media");

        let mut tool = MockMediaTool::new();
        tool.expect_describe().times(1).returning(|_| {
            let mut sub = audio(4, "eng");
            sub.kind = TrackKind::Subtitle;
            Ok(described(&[audio(2, "jpn"), sub]))
        });

        // browse stored -> work here -> all files -> filter -> main -> exit
        let script = format!("1\n2\n2\n{filter}\n0\n5\n");
        let (out, _) = run_script(
            &script,
            config_in(&temp, Some(media)),
            temp.path().join("config.toml"),
            &tool,
        );
        out
    }

    #[test]
    fn info_for_all_files_lists_filtered_tracks() {
        let out = info_session("4");
        assert!(out.contains("Text Tracks:\n  track_id: 4\n  codec: AAC\n  language: eng\n"));
        assert!(!out.contains("Audio Tracks:"));
        assert!(out.contains("1 file(s) inspected, 0 failed"));
    }

    #[test]
    fn info_shows_general_and_video_sections() {
        let general = info_session("1");
        assert!(general.contains("General Tracks:\n  codec: Matroska\n  duration: 1420.064\n  file_size: 734003200\n"));
        assert!(!general.contains("Video Tracks:"));

        let video = info_session("2");
        assert!(video.contains("Video Tracks:\n  track_id: 1\n  codec: AVC\n  width: 1920\n  height: 1080\n"));

        let all = info_session("5");
        for heading in ["General Tracks:", "Video Tracks:", "Audio Tracks:", "Text Tracks:"] {
            assert!(all.contains(heading), "missing {heading}");
        }
    }

    #[test]
    fn nested_files_are_listed_when_subdirectories_are_included() {
        let temp = TempDir::new().unwrap();
        temp.child("media/Show/s01e01.mkv").touch().unwrap();
        temp.child("media/top.mkv").touch().unwrap();
        let media = temp.path().join("media");
        let tool = MockMediaTool::new();

        // browse stored -> list files -> main -> exit
        let script = "1\n2\n0\n5\n";
        let (flat, _) = run_script(
            script,
            config_in(&temp, Some(media.clone())),
            temp.path().join("config.toml"),
            &tool,
        );
        assert!(flat.contains("2. List 1 MKV files"));
        assert!(!flat.contains("Show/s01e01.mkv"));

        let mut config = config_in(&temp, Some(media));
        config.include_subdirectories = true;
        let (nested, _) = run_script(script, config, temp.path().join("config.toml"), &tool);
        assert!(nested.contains("2. List 2 MKV files"));
        assert!(nested.contains("1. Show/s01e01.mkv\n2. top.mkv\n"));
    }

    #[test]
    fn browsing_into_subdirectories_and_back() {
        let temp = TempDir::new().unwrap();
        temp.child("media/Show/s01e01.mkv").touch().unwrap();
        let media = temp.path().join("media");
        let tool = MockMediaTool::new();

        // browse stored -> Show -> list files -> previous dir -> main -> exit
        let script = "1\n1\n1\n3\n0\n5\n";
        let (out, _) = run_script(
            script,
            config_in(&temp, Some(media.clone())),
            temp.path().join("config.toml"),
            &tool,
        );

        assert!(out.contains(&format!("Current Directory: {}", media.join("Show").display())));
        assert!(out.contains("1. s01e01.mkv"));
        assert_eq!(
            out.matches(&format!("Current Directory: {}\n", media.display()))
                .count(),
            2
        );
    }
}
