//! Cluster-state capture collaborator.
//!
//! The executor treats CAPTURE as opaque: it hands the resolved kubeconfig
//! path, the selectors, and a destination file to this seam and records
//! success or failure. The default implementation shells out to kubectl.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("kubectl failed: {reason}")]
    Command { reason: String },

    #[error("failed to spawn kubectl: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capture capability consumed by the executor.
#[async_trait]
pub trait ClusterCapture: Send + Sync {
    /// Captures the resources named by `selectors` from the cluster reached
    /// through `kubeconfig`, writing the result to `dest`.
    async fn capture(
        &self,
        kubeconfig: &Path,
        selectors: &[String],
        dest: &Path,
    ) -> Result<(), CaptureError>;
}

/// Builds the kubectl argument list for one capture. Resource tokens pass
/// through as-is; a `namespace:<ns>` selector becomes `-n <ns>`.
pub fn build_kubectl_args(kubeconfig: &Path, selectors: &[String]) -> Vec<String> {
    let mut args = vec!["get".to_string()];
    let mut namespace = None;

    for selector in selectors {
        match selector.split_once(':') {
            Some(("namespace", ns)) if !ns.is_empty() => namespace = Some(ns.to_string()),
            _ => args.push(selector.clone()),
        }
    }

    if let Some(ns) = namespace {
        args.push("-n".to_string());
        args.push(ns);
    }

    args.push("--kubeconfig".to_string());
    args.push(kubeconfig.display().to_string());
    args.push("-o".to_string());
    args.push("yaml".to_string());
    args
}

/// Default collaborator: `kubectl get ... -o yaml`. The kubeconfig content
/// is never read here, only its path is forwarded.
pub struct KubectlCapture;

#[async_trait]
impl ClusterCapture for KubectlCapture {
    async fn capture(
        &self,
        kubeconfig: &Path,
        selectors: &[String],
        dest: &Path,
    ) -> Result<(), CaptureError> {
        let args = build_kubectl_args(kubeconfig, selectors);
        tracing::debug!(?args, dest = %dest.display(), "capturing cluster state");

        let output = Command::new("kubectl")
            .args(&args)
            .output()
            .await
            .map_err(|source| CaptureError::Spawn { source })?;

        if !output.status.success() {
            return Err(CaptureError::Command {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tokio::fs::write(dest, &output.stdout)
            .await
            .map_err(|source| CaptureError::Io {
                path: dest.to_path_buf(),
                source,
            })
    }
}
