//! Recursive copy engine: enumerates source paths through a bound transport
//! and streams file content into the per-machine destination subtree.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::transport::{LocalTransport, PathType, Transport, TransportError};

/// One source path or file that could not be collected. Recorded, never
/// fatal to sibling paths.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one COPY action: destination paths written plus accumulated
/// per-path failures. The action failed if at least one path failed.
#[derive(Debug, Default)]
pub struct CopySummary {
    pub copied: Vec<PathBuf>,
    pub failures: Vec<CopyFailure>,
}

impl CopySummary {
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Copies from one machine (through its transport) into `dest_root`, the
/// machine's subtree under the workdir. Destination writes always go to the
/// local filesystem.
pub struct CopyEngine {
    transport: Arc<dyn Transport>,
    dest_root: PathBuf,
    dest: LocalTransport,
}

impl CopyEngine {
    pub fn new(transport: Arc<dyn Transport>, dest_root: PathBuf) -> Self {
        Self {
            transport,
            dest_root,
            dest: LocalTransport::new(),
        }
    }

    /// Copies every source path, path by path, accumulating failures rather
    /// than short-circuiting. Only a lost session aborts early; the error it
    /// returns carries the already-collected summary's machine scope.
    pub async fn copy_all(&self, sources: &[PathBuf]) -> Result<CopySummary, TransportError> {
        let mut summary = CopySummary::default();
        for source in sources {
            self.copy_path(source, &mut summary).await?;
        }
        Ok(summary)
    }

    async fn copy_path(
        &self,
        source: &Path,
        summary: &mut CopySummary,
    ) -> Result<(), TransportError> {
        match self.transport.stat(source).await {
            Ok(PathType::File) => self.copy_file(source, summary).await,
            Ok(PathType::Directory) => self.copy_tree(source, summary).await,
            Ok(PathType::Missing) => {
                summary.failures.push(CopyFailure {
                    path: source.to_path_buf(),
                    reason: "not found".to_string(),
                });
                Ok(())
            }
            Err(err) => self.record_or_abort(source, err, summary),
        }
    }

    /// Depth-first walk. Children keep their full path relative to the
    /// filesystem root, not to the directory argument, so a copy of `/a/b`
    /// lands under `<dest_root>/a/b/...`.
    async fn copy_tree(
        &self,
        root: &Path,
        summary: &mut CopySummary,
    ) -> Result<(), TransportError> {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let children = match self.transport.list_dir(&dir).await {
                Ok(children) => children,
                Err(err) => {
                    self.record_or_abort(&dir, err, summary)?;
                    continue;
                }
            };

            for child in children {
                match self.transport.stat(&child).await {
                    Ok(PathType::Directory) => pending.push(child),
                    Ok(PathType::File) => self.copy_file(&child, summary).await?,
                    Ok(PathType::Missing) => summary.failures.push(CopyFailure {
                        path: child,
                        reason: "vanished during listing".to_string(),
                    }),
                    Err(err) => self.record_or_abort(&child, err, summary)?,
                }
            }
        }

        Ok(())
    }

    async fn copy_file(
        &self,
        source: &Path,
        summary: &mut CopySummary,
    ) -> Result<(), TransportError> {
        let dest = self.dest_root.join(relative_form(source));

        if let Some(parent) = dest.parent() {
            if let Err(err) = self.dest.make_dir_all(parent).await {
                return self.record_or_abort(source, err, summary);
            }
        }

        let result = self.stream_to(source, &dest).await;
        match result {
            Ok(()) => {
                tracing::debug!(source = %source.display(), dest = %dest.display(), "copied");
                summary.copied.push(dest);
                Ok(())
            }
            Err(err) => self.record_or_abort(source, err, summary),
        }
    }

    async fn stream_to(&self, source: &Path, dest: &Path) -> Result<(), TransportError> {
        let mut reader = self.transport.open_read(source).await?;

        // Create-truncate: re-running the same script overwrites prior
        // artifacts deterministically.
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|err| TransportError::io(dest, err))?;

        tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|err| TransportError::io(source, err))?;
        Ok(())
    }

    /// Connection errors invalidate the whole machine and bubble up; any
    /// other failure is recorded against the file and the walk continues.
    fn record_or_abort(
        &self,
        path: &Path,
        err: TransportError,
        summary: &mut CopySummary,
    ) -> Result<(), TransportError> {
        if err.is_connection() {
            return Err(err);
        }
        summary.failures.push(CopyFailure {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
        Ok(())
    }
}

/// The source path with its leading root separator stripped, reused verbatim
/// as the destination subpath. `.` and `..` components are dropped so the
/// result can never escape the machine subtree.
pub fn relative_form(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_form_strips_root() {
        assert_eq!(relative_form(Path::new("/tmp/foo.txt")), PathBuf::from("tmp/foo.txt"));
        assert_eq!(relative_form(Path::new("foo.txt")), PathBuf::from("foo.txt"));
        assert_eq!(relative_form(Path::new("./a/../b")), PathBuf::from("a/b"));
    }

    #[tokio::test]
    async fn missing_path_is_recorded_not_fatal() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let present = src_dir.path().join("present.txt");
        std::fs::write(&present, "here").unwrap();

        let engine = CopyEngine::new(
            Arc::new(LocalTransport::new()),
            dest_dir.path().to_path_buf(),
        );
        let summary = engine
            .copy_all(&[src_dir.path().join("absent.txt"), present.clone()])
            .await
            .unwrap();

        assert!(summary.failed());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.copied.len(), 1);

        let copied = &summary.copied[0];
        assert!(copied.ends_with(relative_form(&present)));
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "here");
    }

    #[tokio::test]
    async fn directory_copy_preserves_full_relative_path() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();

        let nested = src_dir.path().join("logs").join("pods");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("kubelet.log"), "k").unwrap();
        std::fs::write(src_dir.path().join("logs").join("boot.log"), "b").unwrap();

        let engine = CopyEngine::new(
            Arc::new(LocalTransport::new()),
            dest_dir.path().to_path_buf(),
        );
        let summary = engine
            .copy_all(&[src_dir.path().join("logs")])
            .await
            .unwrap();

        assert!(!summary.failed());
        assert_eq!(summary.copied.len(), 2);

        let expect_root = dest_dir.path().join(relative_form(src_dir.path()));
        assert!(expect_root.join("logs").join("boot.log").is_file());
        assert!(expect_root.join("logs").join("pods").join("kubelet.log").is_file());
    }
}
