//! Command line and configuration file handling

mod args;
mod file;

pub use args::Args;
pub use file::{ConfigError, ViewerConfig};
