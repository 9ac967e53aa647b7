use clap::Parser;
use std::path::PathBuf;

/// Menu-driven editor for the default and forced flags of MKV tracks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (defaults to ./config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
