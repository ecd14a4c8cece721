use anyhow::Result;
use clap::Parser;
use magpie::cli::{run, MagpieCli};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MagpieCli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting magpie v{}", env!("CARGO_PKG_VERSION"));

    let failed = run(&cli).await?;
    if failed {
        // Partial artifacts stay on disk; only the exit status reports it.
        std::process::exit(1);
    }

    Ok(())
}
