//! CLI command drivers: read the script, assemble it, execute, report.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::cli::options::MagpieCli;
use crate::cli::output::{print_plan, print_summary};
use crate::runtime::{Executor, ExecutorConfig, RunReport};
use crate::script::{ScriptAssembler, ScriptDefaults};

/// Runs the CLI to completion. Returns whether the run (if any) recorded a
/// failure, so the binary can exit non-zero while keeping partial artifacts.
pub async fn run(cli: &MagpieCli) -> Result<bool> {
    let source = read_script(&cli.script)?;

    let assembler = ScriptAssembler::new(ScriptDefaults::default());
    let script = assembler
        .assemble(&source)
        .with_context(|| format!("invalid script {}", cli.script.display()))?;

    if cli.dry_run {
        print_plan(&script);
        return Ok(false);
    }

    let config = ExecutorConfig {
        parallel_machines: cli.parallel,
        machine_timeout: cli.timeout.map(Duration::from_secs),
    };

    let report = Executor::new(script).with_config(config).execute().await?;

    print_summary(&report);
    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }

    Ok(report.failed())
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read script from stdin")?;
        Ok(source)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "run report written");
    Ok(())
}
