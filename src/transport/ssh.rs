//! Remote transport over a non-interactive `ssh` session.
//!
//! Every capability call is proxied through the system ssh client with
//! `BatchMode=yes`, authenticated by the username and private-key path from
//! the AUTHCONFIG directive. The key file itself is never read here.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use crate::machine::Machine;
use crate::script::AuthConfigCommand;
use crate::transport::{CommandOutput, FileReader, PathType, Transport, TransportError};

/// ssh reserves exit status 255 for its own (connection-level) failures.
const SSH_EXIT_STATUS: i32 = 255;

/// Builds the argument list for one non-interactive ssh invocation. The
/// remote command is wrapped in `sh -c` with the command line quoted as a
/// single word so the remote shell does not re-split it.
pub fn build_ssh_args(
    username: &str,
    host: &str,
    port: u16,
    private_key: &Path,
    remote_cmd: &str,
) -> Vec<String> {
    let mut args = Vec::new();
    args.push("-o".to_string());
    args.push("BatchMode=yes".to_string());
    args.push("-p".to_string());
    args.push(port.to_string());
    args.push("-i".to_string());
    args.push(private_key.display().to_string());
    args.push(format!("{username}@{host}"));
    args.push("--".to_string());
    args.push(format!("sh -c {}", shell_words::quote(remote_cmd)));
    args
}

/// Transport bound to one remote machine for the duration of its action
/// loop. The session is probed at bind time so an unreachable machine fails
/// with a connection error before any action runs.
pub struct SshTransport {
    host: String,
    port: u16,
    username: String,
    private_key: PathBuf,
    address: String,
}

impl SshTransport {
    /// Binds a session to `machine` using the AUTHCONFIG credentials.
    /// Establishment failure is a connection error scoped to this machine.
    pub async fn connect(
        machine: &Machine,
        auth: &AuthConfigCommand,
    ) -> Result<Self, TransportError> {
        let transport = Self {
            host: machine.host().to_string(),
            port: machine.port(),
            username: auth.username().to_string(),
            private_key: auth.private_key().to_path_buf(),
            address: machine.address(),
        };

        // Cheap no-op round trip to surface auth/reachability problems now.
        let probe = transport.run_ssh("true").await?;
        if probe.status == SSH_EXIT_STATUS {
            return Err(TransportError::Connection {
                address: transport.address.clone(),
                reason: probe.stderr_text().trim().to_string(),
            });
        }

        tracing::debug!(address = %transport.address, "ssh session established");
        Ok(transport)
    }

    fn args_for(&self, remote_cmd: &str) -> Vec<String> {
        build_ssh_args(
            &self.username,
            &self.host,
            self.port,
            &self.private_key,
            remote_cmd,
        )
    }

    async fn run_ssh(&self, remote_cmd: &str) -> Result<CommandOutput, TransportError> {
        let output = Command::new("ssh")
            .args(self.args_for(remote_cmd))
            .output()
            .await
            .map_err(|err| TransportError::Spawn {
                program: "ssh".to_string(),
                source: err,
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Runs a remote command, mapping ssh's own exit status to a connection
    /// error so callers can tell a lost session from a failing command.
    async fn run_checked(
        &self,
        operation: &'static str,
        path: &Path,
        remote_cmd: &str,
    ) -> Result<CommandOutput, TransportError> {
        let output = self.run_ssh(remote_cmd).await?;
        if output.status == SSH_EXIT_STATUS {
            return Err(TransportError::Connection {
                address: self.address.clone(),
                reason: output.stderr_text().trim().to_string(),
            });
        }
        if !output.success() {
            return Err(TransportError::Remote {
                operation,
                path: path.to_path_buf(),
                reason: output.stderr_text().trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn stat(&self, path: &Path) -> Result<PathType, TransportError> {
        let quoted = shell_words::quote(&path.to_string_lossy()).into_owned();
        let cmd = format!(
            "if test -d {quoted}; then echo dir; elif test -e {quoted}; then echo file; else echo missing; fi"
        );
        let output = self.run_checked("stat", path, &cmd).await?;

        match String::from_utf8_lossy(&output.stdout).trim() {
            "dir" => Ok(PathType::Directory),
            "file" => Ok(PathType::File),
            _ => Ok(PathType::Missing),
        }
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TransportError> {
        let quoted = shell_words::quote(&path.to_string_lossy()).into_owned();
        let cmd = format!("find {quoted} -mindepth 1 -maxdepth 1");
        let output = self.run_checked("list", path, &cmd).await?;

        let mut children: Vec<PathBuf> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        children.sort();
        Ok(children)
    }

    async fn open_read(&self, path: &Path) -> Result<FileReader, TransportError> {
        let quoted = shell_words::quote(&path.to_string_lossy()).into_owned();
        let mut child = Command::new("ssh")
            .args(self.args_for(&format!("cat {quoted}")))
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| TransportError::Spawn {
                program: "ssh".to_string(),
                source: err,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| TransportError::Remote {
            operation: "read",
            path: path.to_path_buf(),
            reason: "no stdout pipe from ssh".to_string(),
        })?;

        Ok(Box::new(SshFileReader {
            _child: child,
            stdout,
        }))
    }

    async fn make_dir_all(&self, path: &Path) -> Result<(), TransportError> {
        let quoted = shell_words::quote(&path.to_string_lossy()).into_owned();
        self.run_checked("mkdir", path, &format!("mkdir -p {quoted}"))
            .await?;
        Ok(())
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let output = self.run_ssh(command).await?;
        if output.status == SSH_EXIT_STATUS {
            return Err(TransportError::Connection {
                address: self.address.clone(),
                reason: output.stderr_text().trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Streams a remote file from a spawned `ssh ... cat` child. Holding the
/// child keeps the pipe alive; kill_on_drop reaps it if the reader is
/// abandoned mid-stream.
struct SshFileReader {
    _child: Child,
    stdout: ChildStdout,
}

impl AsyncRead for SshFileReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}
