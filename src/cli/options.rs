use clap::Parser;
use std::path::PathBuf;

/// Main magpie CLI interface.
#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "Collect diagnostic artifacts from machines described by a script")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct MagpieCli {
    /// Collection script file (or - for stdin)
    pub script: PathBuf,

    /// Maximum machines processed in parallel
    #[arg(short, long, default_value = "1")]
    pub parallel: usize,

    /// Per-machine time budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Parse and show the plan without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Write the JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
