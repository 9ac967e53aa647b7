//! Menu states and the mapping from typed selections to actions.
//!
//! Every menu is a closed enum; `from_selection` returns `None` for input
//! that does not name an entry, and the shell re-prompts.

use crate::tracks::{FlagKind, StreamSection, TrackKind};

fn parse(input: &str) -> Option<usize> {
    input.trim().parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    BrowseStored,
    CheckCustom,
    EditFiles,
    Configure,
    Exit,
}

impl MainAction {
    /// "1" is only offered when a media directory is configured.
    pub fn from_selection(input: &str, has_media_directory: bool) -> Option<Self> {
        match parse(input)? {
            1 if has_media_directory => Some(MainAction::BrowseStored),
            2 => Some(MainAction::CheckCustom),
            3 => Some(MainAction::EditFiles),
            4 => Some(MainAction::Configure),
            5 => Some(MainAction::Exit),
            _ => None,
        }
    }

    pub fn render(has_media_directory: bool) -> String {
        let mut text = String::from("\nMain Menu\n");
        if has_media_directory {
            text.push_str("1. Browse media in stored directory\n");
        }
        text.push_str(
            "2. Check media info in a custom directory\n\
             3. Edit MKV files\n\
             4. Configure settings\n\
             5. Exit\n",
        );
        text
    }
}

/// One entry of the directory browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseEntry {
    /// Index into the subdirectory listing
    Subdirectory(usize),
    ListFiles,
    WorkHere,
    Parent,
    MainMenu,
}

/// Shape of the browser menu for the current directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseMenu {
    pub subdirectories: usize,
    pub containers: usize,
}

impl BrowseMenu {
    /// Entries in display order, numbered from 1
    pub fn entries(&self) -> Vec<BrowseEntry> {
        let mut entries: Vec<BrowseEntry> =
            (0..self.subdirectories).map(BrowseEntry::Subdirectory).collect();
        if self.containers > 0 {
            entries.push(BrowseEntry::ListFiles);
            entries.push(BrowseEntry::WorkHere);
        }
        entries.push(BrowseEntry::Parent);
        entries
    }

    pub fn from_selection(&self, input: &str) -> Option<BrowseEntry> {
        match parse(input)? {
            0 => Some(BrowseEntry::MainMenu),
            n => self.entries().get(n - 1).copied(),
        }
    }

    pub fn render(&self, current: &str, subdirectories: &[String]) -> String {
        let mut text = format!("\nCurrent Directory: {current}\n");
        if !subdirectories.is_empty() {
            text.push_str("\nSubdirectories:\n");
        }
        for (idx, entry) in self.entries().iter().enumerate() {
            let label = match entry {
                BrowseEntry::Subdirectory(i) => {
                    subdirectories.get(*i).cloned().unwrap_or_default()
                }
                BrowseEntry::ListFiles => format!("List {} MKV files", self.containers),
                BrowseEntry::WorkHere => "Work in current directory".to_string(),
                BrowseEntry::Parent => "Move to previous directory".to_string(),
                BrowseEntry::MainMenu => continue,
            };
            text.push_str(&format!("{}. {}\n", idx + 1, label));
        }
        text.push_str("0. Return to main menu\n");
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoAction {
    OneFile,
    AllFiles,
    Back,
    MainMenu,
}

impl InfoAction {
    pub fn from_selection(input: &str) -> Option<Self> {
        match parse(input)? {
            1 => Some(InfoAction::OneFile),
            2 => Some(InfoAction::AllFiles),
            3 => Some(InfoAction::Back),
            4 => Some(InfoAction::MainMenu),
            _ => None,
        }
    }

    pub fn render() -> &'static str {
        "\n1. Check media info for a specific file\n\
         2. Check media info for all files\n\
         3. Return to previous directory\n\
         4. Return to main menu\n"
    }
}

/// Which analyser sections an info listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFilter {
    General,
    Video,
    Audio,
    Subtitle,
    All,
    Back,
    MainMenu,
}

impl FieldFilter {
    pub fn from_selection(input: &str) -> Option<Self> {
        match parse(input)? {
            1 => Some(FieldFilter::General),
            2 => Some(FieldFilter::Video),
            3 => Some(FieldFilter::Audio),
            4 => Some(FieldFilter::Subtitle),
            5 => Some(FieldFilter::All),
            6 => Some(FieldFilter::Back),
            0 => Some(FieldFilter::MainMenu),
            _ => None,
        }
    }

    /// Whether entries of `section` are shown
    pub fn shows(&self, section: StreamSection) -> bool {
        match self {
            FieldFilter::General => section == StreamSection::General,
            FieldFilter::Video => section == StreamSection::Video,
            FieldFilter::Audio => section == StreamSection::Audio,
            FieldFilter::Subtitle => section == StreamSection::Text,
            FieldFilter::All => true,
            FieldFilter::Back | FieldFilter::MainMenu => false,
        }
    }

    pub fn render() -> &'static str {
        "\nSelect which fields to display:\n\
         1. General\n\
         2. Video\n\
         3. Audio\n\
         4. Text\n\
         5. All Fields\n\
         6. Return to previous menu\n\
         0. Return to main menu\n"
    }
}

/// Flags touched by an edit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSet {
    Forced,
    Default,
    Both,
}

impl FlagSet {
    pub fn flags(&self) -> Vec<FlagKind> {
        match self {
            FlagSet::Forced => vec![FlagKind::Forced],
            FlagSet::Default => vec![FlagKind::Default],
            FlagSet::Both => vec![FlagKind::Default, FlagKind::Forced],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlagSet::Forced => "forced",
            FlagSet::Default => "default",
            FlagSet::Both => "both default and forced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Bulk { kind: TrackKind, flags: FlagSet },
    Single { kind: TrackKind, flags: FlagSet },
    Refresh,
    Restore,
    Back,
    MainMenu,
}

impl EditAction {
    /// With a backup present, 14 restores and 15 goes back; otherwise 14
    /// goes back and 15 is not an entry.
    pub fn from_selection(input: &str, backup_exists: bool) -> Option<Self> {
        use TrackKind::{Audio, Subtitle};

        let action = match parse(input)? {
            0 => EditAction::MainMenu,
            1 => EditAction::Bulk { kind: Audio, flags: FlagSet::Forced },
            2 => EditAction::Bulk { kind: Subtitle, flags: FlagSet::Forced },
            3 => EditAction::Bulk { kind: Audio, flags: FlagSet::Default },
            4 => EditAction::Bulk { kind: Subtitle, flags: FlagSet::Default },
            5 => EditAction::Single { kind: Audio, flags: FlagSet::Forced },
            6 => EditAction::Single { kind: Subtitle, flags: FlagSet::Forced },
            7 => EditAction::Single { kind: Audio, flags: FlagSet::Default },
            8 => EditAction::Single { kind: Subtitle, flags: FlagSet::Default },
            9 => EditAction::Bulk { kind: Audio, flags: FlagSet::Both },
            10 => EditAction::Bulk { kind: Subtitle, flags: FlagSet::Both },
            11 => EditAction::Single { kind: Audio, flags: FlagSet::Both },
            12 => EditAction::Single { kind: Subtitle, flags: FlagSet::Both },
            13 => EditAction::Refresh,
            14 if backup_exists => EditAction::Restore,
            14 => EditAction::Back,
            15 if backup_exists => EditAction::Back,
            _ => return None,
        };
        Some(action)
    }

    pub fn render(backup_exists: bool) -> String {
        let mut text = String::from(
            "\nOptions:\n\
             1. Bulk set forced audio for files\n\
             2. Bulk set forced subtitle for files\n\
             3. Bulk set default audio for files\n\
             4. Bulk set default subtitle for files\n\
             5. Set forced audio for a single file\n\
             6. Set forced subtitle for a single file\n\
             7. Set default audio for a single file\n\
             8. Set default subtitle for a single file\n\
             9. Bulk set both default and forced audio for files\n\
             10. Bulk set both default and forced subtitle for files\n\
             11. Set both default and forced audio for a single file\n\
             12. Set both default and forced subtitle for a single file\n\
             13. Refresh media info\n",
        );
        if backup_exists {
            text.push_str("14. Restore previous changes back\n15. Return to previous menu\n");
        } else {
            text.push_str("14. Return to previous menu\n");
        }
        text.push_str("0. Return to main menu\n");
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    SetMediaDirectory,
    ToggleSubdirectories,
    Return,
}

impl SettingsAction {
    pub fn from_selection(input: &str) -> Option<Self> {
        match parse(input)? {
            1 => Some(SettingsAction::SetMediaDirectory),
            2 => Some(SettingsAction::ToggleSubdirectories),
            3 => Some(SettingsAction::Return),
            _ => None,
        }
    }

    pub fn render(include_subdirectories: bool) -> String {
        format!(
            "\nSettings Menu\n\
             1. Set media directory\n\
             2. Include subdirectories when listing files (currently {})\n\
             3. Return to main menu\n",
            if include_subdirectories { "on" } else { "off" }
        )
    }
}

/// Confirmation step before a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteChoice {
    DryRun,
    Execute,
    Back,
    MainMenu,
}

impl ExecuteChoice {
    pub fn from_selection(input: &str) -> Option<Self> {
        match parse(input)? {
            1 => Some(ExecuteChoice::DryRun),
            2 => Some(ExecuteChoice::Execute),
            3 => Some(ExecuteChoice::Back),
            4 => Some(ExecuteChoice::MainMenu),
            _ => None,
        }
    }

    pub fn render() -> &'static str {
        "\nOptions:\n\
         1. Perform a Dry Run\n\
         2. Execute Changes\n\
         3. Return to Previous Menu\n\
         4. Return to Main Menu\n"
    }
}

/// Choice from a numbered list where 0 cancels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPick {
    Item(usize),
    Cancel,
}

impl ListPick {
    /// `len` items numbered from 1; `Item` holds the zero-based index.
    pub fn from_selection(input: &str, len: usize) -> Option<Self> {
        match parse(input)? {
            0 => Some(ListPick::Cancel),
            n if n <= len => Some(ListPick::Item(n - 1)),
            _ => None,
        }
    }
}
