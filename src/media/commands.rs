use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use super::FlagEdit;

/// Default upper bound for one tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error waiting for {program}: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// External tool invocation with a bounded wait
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub timeout: Duration,
}

impl ToolCommand {
    /// Create a new tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a file path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Set the maximum execution time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// A nonzero exit is not an error here; callers interpret the code.
    /// On timeout the child is killed.
    pub async fn execute(&self) -> Result<ToolOutput, CommandError> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: self.binary_path.clone(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CommandError::Wait {
                program: self.binary_path.clone(),
                source,
            })?,
            Err(_elapsed) => {
                return Err(CommandError::Timeout {
                    program: self.binary_path.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let output = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!("{} exited with {:?}", self.description, output.code);
        Ok(output)
    }
}

/// Builds the mkvpropedit and mediainfo invocations.
#[derive(Debug, Clone)]
pub struct ToolCommandBuilder {
    mkvpropedit_path: String,
    mediainfo_path: String,
    timeout: Duration,
}

impl ToolCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        mkvpropedit_path: S1,
        mediainfo_path: S2,
        timeout: Duration,
    ) -> Self {
        Self {
            mkvpropedit_path: mkvpropedit_path.into(),
            mediainfo_path: mediainfo_path.into(),
            timeout,
        }
    }

    /// `mkvpropedit <file> (--edit track:@N --set flag-x=0|1)+`
    ///
    /// Consecutive edits of the same track share one `--edit` selector.
    pub fn edit_flags<P: AsRef<Path>>(&self, container: P, edits: &[FlagEdit]) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.mkvpropedit_path, "Track flag edit")
            .with_timeout(self.timeout)
            .path(container);

        let mut current: Option<u32> = None;
        for edit in edits {
            if current != Some(edit.track) {
                cmd = cmd.arg("--edit").arg(format!("track:@{}", edit.track));
                current = Some(edit.track);
            }
            cmd = cmd.arg("--set").arg(format!(
                "{}={}",
                edit.flag.property_name(),
                if edit.value { "1" } else { "0" }
            ));
        }

        cmd
    }

    /// `mediainfo --Output=JSON <file>`
    pub fn inspect<P: AsRef<Path>>(&self, container: P) -> ToolCommand {
        ToolCommand::new(&self.mediainfo_path, "Media inspection")
            .with_timeout(self.timeout)
            .arg("--Output=JSON")
            .path(container)
    }

    /// Build version check command for the editor
    pub fn editor_version(&self) -> ToolCommand {
        ToolCommand::new(&self.mkvpropedit_path, "Version check")
            .with_timeout(self.timeout)
            .arg("--version")
    }
}
