//! Transport abstraction: the capability surface through which copy and run
//! logic reaches a machine's filesystem and process space.
//!
//! Callers depend only on the [`Transport`] trait; whether a machine is
//! local or remote is decided once, when the transport is bound.

pub mod error;
pub mod local;
pub mod ssh;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

pub use error::TransportError;
pub use local::LocalTransport;
pub use ssh::SshTransport;

/// What a path resolves to on the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    File,
    Directory,
    Missing,
}

/// Captured result of a command executed on the target machine.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Streaming reader handed out by [`Transport::open_read`].
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Capability contract shared by the local and remote variants.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Existence and type check for `path`.
    async fn stat(&self, path: &Path) -> Result<PathType, TransportError>;

    /// Immediate children of a directory, non-recursive.
    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TransportError>;

    /// Opens a file for streaming read.
    async fn open_read(&self, path: &Path) -> Result<FileReader, TransportError>;

    /// Recursive directory creation.
    async fn make_dir_all(&self, path: &Path) -> Result<(), TransportError>;

    /// Runs a command line, capturing stdout/stderr and exit status.
    async fn run_command(&self, command: &str) -> Result<CommandOutput, TransportError>;
}
