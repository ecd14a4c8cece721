//! Orchestrates one script run: resolves machines, binds a transport per
//! machine, and drives each machine's action loop in declaration order.

use chrono::Utc;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::bundle::{Bundler, TarGzBundler};
use crate::cluster::{ClusterCapture, KubectlCapture};
use crate::copy::CopyEngine;
use crate::machine::Machine;
use crate::runtime::error::ExecutionError;
use crate::runtime::result::{ActionOutcome, MachineReport, RunReport};
use crate::script::{CaptureCommand, Command, CopyCommand, OutputCommand, RunCommand, Script};
use crate::transport::{LocalTransport, SshTransport, Transport, TransportError};

/// Runtime knobs for one execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on machines processed at once. Actions within one
    /// machine always run sequentially.
    pub parallel_machines: usize,
    /// Optional budget for one machine's whole action loop.
    pub machine_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_machines: 1,
            machine_timeout: None,
        }
    }
}

/// Executes a validated [`Script`]. The script is immutable and shared
/// across machine workers; each machine owns a disjoint subtree of the
/// workdir, so workers never contend.
pub struct Executor {
    script: Arc<Script>,
    config: ExecutorConfig,
    cluster: Arc<dyn ClusterCapture>,
    bundler: Arc<dyn Bundler>,
}

impl Executor {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            config: ExecutorConfig::default(),
            cluster: Arc::new(KubectlCapture),
            bundler: Arc::new(TarGzBundler),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cluster(mut self, cluster: Arc<dyn ClusterCapture>) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Runs every action against every resolved machine. Machines are
    /// independent: one machine's total failure never stops the others.
    pub async fn execute(&self) -> Result<RunReport, ExecutionError> {
        let started_at = Utc::now();
        let workdir = self.script.workdir().to_path_buf();

        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(|source| ExecutionError::Workdir {
                path: workdir.clone(),
                source,
            })?;

        let machines = self.script.machines();
        tracing::info!(
            machines = machines.len(),
            actions = self.script.actions().len(),
            workdir = %workdir.display(),
            "starting collection"
        );

        let width = self.config.parallel_machines.max(1);
        let workdir_ref = workdir.as_path();
        let mut slotted: Vec<(usize, MachineReport)> = futures::stream::iter(
            machines
                .iter()
                .enumerate()
                .map(|(slot, machine)| async move {
                    (slot, self.run_machine(machine, workdir_ref).await)
                }),
        )
        .buffer_unordered(width)
        .collect()
        .await;

        // Reports come back in completion order; key them back to the
        // resolution order so output is stable.
        slotted.sort_by_key(|(slot, _)| *slot);

        let report = RunReport {
            run_id: Uuid::new_v4().to_string(),
            collector: collector_hostname(),
            workdir: workdir.clone(),
            machines: slotted.into_iter().map(|(_, report)| report).collect(),
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(failed = report.failed(), "collection finished");
        Ok(report)
    }

    async fn run_machine(&self, machine: &Machine, workdir: &Path) -> MachineReport {
        let started_at = Utc::now();
        let address = machine.address();
        let machine_root = workdir.join(machine.dir_name());
        let mut outcomes = Vec::new();

        let error = match self.bind_and_run(machine, workdir, &machine_root, &mut outcomes).await {
            Ok(()) => None,
            Err(reason) => {
                tracing::warn!(machine = %address, %reason, "machine aborted");
                Some(reason)
            }
        };

        MachineReport {
            address,
            error,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn bind_and_run(
        &self,
        machine: &Machine,
        workdir: &Path,
        machine_root: &Path,
        outcomes: &mut Vec<ActionOutcome>,
    ) -> Result<(), String> {
        // Destination side is always the local filesystem.
        let dest = LocalTransport::new();
        dest.make_dir_all(machine_root)
            .await
            .map_err(|err| err.to_string())?;

        // Bound per machine for the duration of its action loop; dropped
        // (connection resources included) when the loop ends either way.
        let transport: Arc<dyn Transport> = if machine.is_local() {
            Arc::new(LocalTransport::new())
        } else {
            let auth = self
                .script
                .auth()
                .ok_or_else(|| format!("{}: AUTHCONFIG required for remote machine", machine.address()))?;
            let session = SshTransport::connect(machine, auth)
                .await
                .map_err(|err| err.to_string())?;
            Arc::new(session)
        };

        let action_loop = self.run_actions(&transport, machine_root, workdir, outcomes);
        match self.config.machine_timeout {
            Some(budget) => match tokio::time::timeout(budget, action_loop).await {
                Ok(result) => result.map_err(|err| err.to_string()),
                // The in-flight future is dropped at its suspension point;
                // outcomes recorded so far are retained.
                Err(_) => Err(format!("timed out after {budget:?}")),
            },
            None => action_loop.await.map_err(|err| err.to_string()),
        }
    }

    /// Strict declaration order within one machine: a RUN that primes a file
    /// must be visible to a later COPY. A lost session aborts the rest of
    /// this machine's actions only.
    async fn run_actions(
        &self,
        transport: &Arc<dyn Transport>,
        machine_root: &Path,
        workdir: &Path,
        outcomes: &mut Vec<ActionOutcome>,
    ) -> Result<(), TransportError> {
        for action in self.script.actions() {
            let outcome = match action {
                Command::Copy(copy) => self.copy_action(transport, machine_root, copy).await?,
                Command::Run(run) => self.run_action(transport, machine_root, run).await?,
                Command::Capture(capture) => self.capture_action(machine_root, capture).await,
                Command::Output(output) => self.output_action(workdir, output).await,
                // Preamble variants never reach the action list.
                other => ActionOutcome::failed(other.index(), other.name(), "not an action"),
            };

            if outcome.is_failed() {
                tracing::warn!(
                    action = %outcome.keyword,
                    index = outcome.index,
                    detail = outcome.detail.as_deref().unwrap_or(""),
                    "action failed"
                );
            }
            outcomes.push(outcome);
        }
        Ok(())
    }

    async fn copy_action(
        &self,
        transport: &Arc<dyn Transport>,
        machine_root: &Path,
        copy: &CopyCommand,
    ) -> Result<ActionOutcome, TransportError> {
        let engine = CopyEngine::new(transport.clone(), machine_root.to_path_buf());
        let summary = engine.copy_all(copy.paths()).await?;

        let index = copy.index();
        let outcome = if summary.failed() {
            let detail = summary
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.path.display(), f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            ActionOutcome::failed(index, crate::script::CMD_COPY, detail)
        } else {
            ActionOutcome::success(index, crate::script::CMD_COPY)
        };
        Ok(outcome.with_artifacts(summary.copied))
    }

    async fn run_action(
        &self,
        transport: &Arc<dyn Transport>,
        machine_root: &Path,
        run: &RunCommand,
    ) -> Result<ActionOutcome, TransportError> {
        let index = run.index();
        let output = match transport.run_command(run.command()).await {
            Ok(output) => output,
            Err(err) if err.is_connection() => return Err(err),
            Err(err) => {
                return Ok(ActionOutcome::failed(
                    index,
                    crate::script::CMD_RUN,
                    err.to_string(),
                ))
            }
        };

        // Captured stdout lands under the machine subtree even when the
        // command itself failed; partial evidence is still evidence.
        let dest = machine_root.join(format!("{}_{}.txt", index, slug(run.command())));
        if let Err(err) = tokio::fs::write(&dest, &output.stdout).await {
            return Ok(ActionOutcome::failed(
                index,
                crate::script::CMD_RUN,
                format!("{}: {}", dest.display(), err),
            ));
        }

        let outcome = if output.success() {
            ActionOutcome::success(index, crate::script::CMD_RUN)
        } else {
            let mut detail = format!("exit status {}", output.status);
            let stderr = output.stderr_text();
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                detail = format!("{detail}: {stderr}");
            }
            ActionOutcome::failed(index, crate::script::CMD_RUN, detail)
        };
        Ok(outcome.with_artifacts(vec![dest]))
    }

    async fn capture_action(&self, machine_root: &Path, capture: &CaptureCommand) -> ActionOutcome {
        let index = capture.index();
        let dest = machine_root.join(format!("{index}_capture.yaml"));

        match self
            .cluster
            .capture(self.script.kubeconfig(), capture.selectors(), &dest)
            .await
        {
            Ok(()) => ActionOutcome::success(index, crate::script::CMD_CAPTURE)
                .with_artifacts(vec![dest]),
            Err(err) => ActionOutcome::failed(index, crate::script::CMD_CAPTURE, err.to_string()),
        }
    }

    async fn output_action(&self, workdir: &Path, output: &OutputCommand) -> ActionOutcome {
        let index = output.index();
        match self.bundler.bundle(workdir, output.path()).await {
            Ok(()) => ActionOutcome::success(index, crate::script::CMD_OUTPUT)
                .with_artifacts(vec![output.path().to_path_buf()]),
            Err(err) => ActionOutcome::failed(index, crate::script::CMD_OUTPUT, err.to_string()),
        }
    }
}

fn collector_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Flattens a command line into a short filesystem-safe stem for its
/// captured-output file.
fn slug(command: &str) -> String {
    let mut stem: String = command
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' => c,
            _ => '_',
        })
        .collect();
    stem.truncate(40);
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_flattens_and_truncates() {
        assert_eq!(slug("df -h /"), "df_-h__");
        assert_eq!(slug("cat /var/log/syslog"), "cat__var_log_syslog");
        assert!(slug(&"x".repeat(100)).len() <= 40);
    }
}
