//! Direct local-machine transport: filesystem and process calls with no
//! session to establish.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

use crate::transport::{CommandOutput, FileReader, PathType, Transport, TransportError};

/// Transport for the implicit local machine. Also used as the destination
/// side of every copy, since collected artifacts always land locally.
#[derive(Debug, Default, Clone)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn stat(&self, path: &Path) -> Result<PathType, TransportError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(PathType::Directory),
            Ok(_) => Ok(PathType::File),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(PathType::Missing),
            Err(err) => Err(TransportError::io(path, err)),
        }
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TransportError> {
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|err| TransportError::io(path, err))?;

        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| TransportError::io(path, err))?
        {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    async fn open_read(&self, path: &Path) -> Result<FileReader, TransportError> {
        let file = fs::File::open(path)
            .await
            .map_err(|err| TransportError::io(path, err))?;
        Ok(Box::new(file))
    }

    async fn make_dir_all(&self, path: &Path) -> Result<(), TransportError> {
        fs::create_dir_all(path)
            .await
            .map_err(|err| TransportError::io(path, err))
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|err| TransportError::Spawn {
                program: "sh".to_string(),
                source: err,
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn stat_distinguishes_file_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        let t = LocalTransport::new();
        assert_eq!(t.stat(&file).await.unwrap(), PathType::File);
        assert_eq!(t.stat(dir.path()).await.unwrap(), PathType::Directory);
        assert_eq!(
            t.stat(&dir.path().join("nope")).await.unwrap(),
            PathType::Missing
        );
    }

    #[tokio::test]
    async fn list_dir_returns_immediate_children() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("deep.txt"), "d").unwrap();

        let t = LocalTransport::new();
        let children = t.list_dir(dir.path()).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains(&dir.path().join("a.txt")));
        assert!(children.contains(&dir.path().join("sub")));
    }

    #[tokio::test]
    async fn open_read_streams_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "HelloFoo").unwrap();

        let t = LocalTransport::new();
        let mut reader = t.open_read(&file).await.unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "HelloFoo");
    }

    #[tokio::test]
    async fn run_command_captures_status_and_output() {
        let t = LocalTransport::new();

        let ok = t.run_command("printf ok").await.unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout, b"ok");

        let bad = t.run_command("exit 3").await.unwrap();
        assert!(!bad.success());
        assert_eq!(bad.status, 3);
    }

    #[tokio::test]
    async fn make_dir_all_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        let t = LocalTransport::new();
        t.make_dir_all(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
