//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// deckview - capture card viewer
///
/// Shows live video and plays audio from a capture device, following the
/// input signal's format. Run without a device name to list devices.
#[derive(Parser, Debug)]
#[command(name = "deckview")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Display name of the capture device to open
    pub device: Option<String>,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Configuration file (default: deckview.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Exit after rendering this many frames
    #[arg(long)]
    pub frames: Option<u64>,
}

impl Args {
    /// Get the log level based on verbose/quiet flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }

    /// Whether the user explicitly chose a log level on the command line
    pub fn level_overridden(&self) -> bool {
        self.quiet || self.verbose > 0
    }
}
