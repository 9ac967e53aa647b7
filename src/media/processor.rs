use std::path::Path;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::mediainfo::parse_streams;
use super::{CommandError, FlagEdit, MediaTool, ToolCommandBuilder, ToolOutput};
use crate::config::ToolsConfig;
use crate::error::{EditError, InspectionError};
use crate::tracks::StreamInfo;

/// mkvpropedit reports a read-only or locked target with this message.
const WRITE_DENIED_MARKER: &str = "could not be opened for writing";

/// Adapter backed by MKVToolNix's `mkvpropedit` and the `mediainfo` CLI
pub struct MkvToolNixAdapter {
    config: ToolsConfig,
    command_builder: ToolCommandBuilder,
    runtime: Runtime,
}

impl MkvToolNixAdapter {
    /// Create a new adapter with its own single-threaded runtime
    pub fn new(config: ToolsConfig) -> std::io::Result<Self> {
        let command_builder = ToolCommandBuilder::new(
            &config.mkvpropedit_path,
            &config.mediainfo_path,
            config.timeout(),
        );
        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            config,
            command_builder,
            runtime,
        })
    }

    /// First line of `mkvpropedit --version`
    pub fn editor_version(&self) -> Result<String, EditError> {
        let output = self
            .runtime
            .block_on(self.command_builder.editor_version().execute())
            .map_err(edit_error_from_command)?;

        if !output.success() {
            return Err(EditError::InvocationFailed {
                code: output.code,
                stderr: diagnostic_text(&output),
            });
        }

        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or("Unknown version")
            .to_string())
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }
}

impl MediaTool for MkvToolNixAdapter {
    fn describe(&self, path: &Path) -> Result<Vec<StreamInfo>, InspectionError> {
        if !path.exists() {
            return Err(InspectionError::NotFound(path.to_path_buf()));
        }

        debug!("Inspecting {}", path.display());
        let output = self
            .runtime
            .block_on(self.command_builder.inspect(path).execute())
            .map_err(|e| InspectionError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.success() {
            return Err(InspectionError::Unreadable {
                path: path.to_path_buf(),
                message: format!(
                    "mediainfo exited with {:?}: {}",
                    output.code,
                    diagnostic_text(&output)
                ),
            });
        }

        parse_streams(path, &output.stdout)
    }

    fn set_flags(&self, path: &Path, edits: &[FlagEdit]) -> Result<(), EditError> {
        if edits.is_empty() {
            return Ok(());
        }

        let command = self.command_builder.edit_flags(path, edits);
        let output = self
            .runtime
            .block_on(command.execute())
            .map_err(edit_error_from_command)?;

        if output.success() {
            for edit in edits {
                info!(
                    "Track {} {} set to {} in {}",
                    edit.track,
                    edit.flag,
                    edit.value,
                    path.display()
                );
            }
            return Ok(());
        }

        let message = diagnostic_text(&output);
        warn!(
            "mkvpropedit failed on {} with {:?}: {}",
            path.display(),
            output.code,
            message
        );

        if message.to_lowercase().contains(WRITE_DENIED_MARKER) {
            return Err(EditError::PermissionDenied(path.to_path_buf()));
        }

        Err(EditError::InvocationFailed {
            code: output.code,
            stderr: message,
        })
    }
}

fn edit_error_from_command(e: CommandError) -> EditError {
    match e {
        CommandError::Spawn { program, source } => {
            EditError::ToolMissing(format!("{program}: {source}"))
        }
        CommandError::Timeout { timeout, .. } => EditError::Timeout(timeout),
        other @ CommandError::Wait { .. } => EditError::InvocationFailed {
            code: None,
            stderr: other.to_string(),
        },
    }
}

/// mkvpropedit prints its errors on stdout; prefer stderr when present.
fn diagnostic_text(output: &ToolOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}
