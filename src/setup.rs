use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info, warn};

use crate::config::ToolsConfig;
use crate::error::SetupError;

/// Vendor download page for platforms without an automatic install path
pub const MKVTOOLNIX_DOWNLOAD_URL: &str = "https://mkvtoolnix.download/downloads.html";

const OS_RELEASE: &str = "/etc/os-release";
const EDITOR_TOOL: &str = "mkvpropedit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            other => HostOs::Other(other.to_string()),
        }
    }
}

/// Linux distribution families with a known package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Debian,
    Arch,
    Fedora,
}

impl Distro {
    fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "debian" | "ubuntu" | "linuxmint" | "pop" | "raspbian" => Some(Distro::Debian),
            "arch" | "manjaro" | "endeavouros" => Some(Distro::Arch),
            "fedora" | "rhel" | "redhat" | "centos" | "rocky" | "almalinux" => {
                Some(Distro::Fedora)
            }
            _ => None,
        }
    }
}

/// Distribution from the contents of `/etc/os-release`: `ID` first, then
/// each entry of `ID_LIKE`.
pub fn detect_distro(os_release: &str) -> Option<Distro> {
    let value_of = |key: &str| {
        os_release.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        })
    };

    if let Some(distro) = value_of("ID").as_deref().and_then(Distro::from_id) {
        return Some(distro);
    }
    value_of("ID_LIKE")?
        .split_whitespace()
        .find_map(Distro::from_id)
}

/// One command of an install plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallStep {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for InstallStep {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Commands that install MKVToolNix, or `None` when it has to be done by hand.
pub fn install_plan(os: &HostOs, distro: Option<Distro>) -> Option<Vec<InstallStep>> {
    match (os, distro) {
        (HostOs::Linux, Some(Distro::Debian)) => Some(vec![
            InstallStep::new("sudo", &["apt", "update"]),
            InstallStep::new("sudo", &["apt", "install", "-y", "mkvtoolnix"]),
        ]),
        (HostOs::Linux, Some(Distro::Arch)) => Some(vec![InstallStep::new(
            "sudo",
            &["pacman", "-S", "--noconfirm", "mkvtoolnix-cli"],
        )]),
        (HostOs::Linux, Some(Distro::Fedora)) => Some(vec![InstallStep::new(
            "sudo",
            &["dnf", "install", "-y", "mkvtoolnix"],
        )]),
        (HostOs::MacOs, _) => Some(vec![InstallStep::new("brew", &["install", "mkvtoolnix"])]),
        _ => None,
    }
}

/// Startup check for the external tools.
pub struct SetupManager {
    tools: ToolsConfig,
    os: HostOs,
    os_release: PathBuf,
}

impl SetupManager {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            tools,
            os: HostOs::current(),
            os_release: PathBuf::from(OS_RELEASE),
        }
    }

    /// Override platform detection
    pub fn with_platform<P: Into<PathBuf>>(mut self, os: HostOs, os_release: P) -> Self {
        self.os = os;
        self.os_release = os_release.into();
        self
    }

    /// Locate mkvpropedit, offering to install MKVToolNix when it is missing.
    ///
    /// `consent` is asked once, with the tool name, before anything is
    /// installed.
    pub fn ensure_tool_available<F>(&self, mut consent: F) -> Result<PathBuf, SetupError>
    where
        F: FnMut(&str) -> bool,
    {
        if let Some(path) = locate(&self.tools.mkvpropedit_path) {
            debug!("{} found at {}", EDITOR_TOOL, path.display());
            return Ok(path);
        }

        info!("The {} tool is required but not installed.", EDITOR_TOOL);
        if !consent(EDITOR_TOOL) {
            error!("MKVToolNix is required to proceed.");
            return Err(SetupError::Declined {
                tool: EDITOR_TOOL.to_string(),
            });
        }

        let plan = self.plan().ok_or_else(|| {
            warn!("No automatic install available on {:?}", self.os);
            SetupError::ManualInstallRequired {
                tool: EDITOR_TOOL.to_string(),
                url: MKVTOOLNIX_DOWNLOAD_URL.to_string(),
            }
        })?;

        for step in &plan {
            run_step(step)?;
        }

        locate(&self.tools.mkvpropedit_path)
            .or_else(|| locate(EDITOR_TOOL))
            .inspect(|path| info!("MKVToolNix installed, using {}", path.display()))
            .ok_or_else(|| SetupError::InstallFailed {
                tool: EDITOR_TOOL.to_string(),
                message: format!("{EDITOR_TOOL} still not found after installation"),
            })
    }

    /// Look up the analyser; a missing one is only a warning.
    pub fn check_analyser(&self) -> Option<PathBuf> {
        let found = locate(&self.tools.mediainfo_path);
        if found.is_none() {
            warn!(
                "{} not found; media inspection will fail until it is installed",
                self.tools.mediainfo_path
            );
        }
        found
    }

    fn plan(&self) -> Option<Vec<InstallStep>> {
        let distro = match self.os {
            HostOs::Linux => match fs::read_to_string(&self.os_release) {
                Ok(content) => detect_distro(&content),
                Err(e) => {
                    warn!("Cannot read {}: {}", self.os_release.display(), e);
                    None
                }
            },
            _ => None,
        };
        install_plan(&self.os, distro)
    }
}

/// Resolve a configured tool: explicit paths are checked directly, bare
/// names are searched on `PATH`.
fn locate(tool: &str) -> Option<PathBuf> {
    let path = Path::new(tool);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    which::which(tool).ok()
}

fn run_step(step: &InstallStep) -> Result<(), SetupError> {
    info!("Running: {}", step);
    let status = Command::new(&step.program)
        .args(&step.args)
        .status()
        .map_err(|e| SetupError::InstallFailed {
            tool: EDITOR_TOOL.to_string(),
            message: format!("failed to run {}: {}", step.program, e),
        })?;

    if !status.success() {
        error!("Installation step failed: {} ({})", step, status);
        return Err(SetupError::InstallFailed {
            tool: EDITOR_TOOL.to_string(),
            message: format!("`{step}` exited with {status}"),
        });
    }
    Ok(())
}
