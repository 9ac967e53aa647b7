//! mkvflags - batch editing of MKV track flags
//!
//! Entry point: sets up logging and configuration, makes sure MKVToolNix is
//! installed, then hands the terminal to the interactive shell.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mkvflags::cli::Args;
use mkvflags::config::{Config, DEFAULT_CONFIG_FILE};
use mkvflags::media::MkvToolNixAdapter;
use mkvflags::setup::SetupManager;
use mkvflags::shell::Shell;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    info!("Starting mkvflags");

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load_or_default(&config_path)?;

    let setup = SetupManager::new(config.tools.clone());
    let editor = setup
        .ensure_tool_available(ask_install_consent)
        .context("mkvpropedit is unavailable")?;
    setup.check_analyser();
    config.tools.mkvpropedit_path = editor.to_string_lossy().to_string();

    let adapter = MkvToolNixAdapter::new(config.tools.clone())
        .context("Failed to create the tool runtime")?;
    match adapter.editor_version() {
        Ok(version) => info!("Using {}", version),
        Err(e) => warn!("Could not determine mkvpropedit version: {}", e),
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let show_progress = stdout.is_terminal();
    let mut shell = Shell::new(stdin.lock(), stdout.lock(), config, config_path, &adapter)
        .with_progress(show_progress);
    shell.run()?;

    Ok(())
}

/// Asked once when mkvpropedit is missing
fn ask_install_consent(tool: &str) -> bool {
    print!("{tool} is required but not installed. Would you like to attempt to install MKVToolNix now? (y/n): ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".mkvflags").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "mkvflags.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Menus own stdout; diagnostics go to stderr
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("mkvflags.log").display()
    );
    Ok(())
}
