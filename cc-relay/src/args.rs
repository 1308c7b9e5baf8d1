use std::path::PathBuf;

use clap::Parser;

/// Transparent Anthropic Messages API relay over a pool of LLM
/// backends
#[derive(Debug, Parser)]
#[command(name = "cc-relay", version, about)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "cc-relay.toml")]
    pub config: PathBuf,
}
