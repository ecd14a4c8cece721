use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures that prevent execution from starting at all.
/// Everything machine- or action-scoped is recorded in the run report
/// instead of being raised.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to prepare working directory {path}: {source}")]
    Workdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
