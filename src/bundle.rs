//! Bundling collaborator: packs the collected working tree into a single
//! archive when the script declares OUTPUT. The executor only sees the
//! trait; packaging details stay behind it.

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundling failed: {reason}")]
    Archive { reason: String },
}

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Packs `workdir` into the archive at `out`.
    async fn bundle(&self, workdir: &Path, out: &Path) -> Result<(), BundleError>;
}

/// Default collaborator: gzip-compressed tar of the working tree.
pub struct TarGzBundler;

#[async_trait]
impl Bundler for TarGzBundler {
    async fn bundle(&self, workdir: &Path, out: &Path) -> Result<(), BundleError> {
        if out.starts_with(workdir) {
            return Err(BundleError::Archive {
                reason: format!(
                    "bundle destination {} is inside the working tree",
                    out.display()
                ),
            });
        }

        let workdir = workdir.to_path_buf();
        let out = out.to_path_buf();

        // tar/flate2 are blocking writers; keep them off the async runtime.
        tokio::task::spawn_blocking(move || write_archive(&workdir, &out))
            .await
            .map_err(|err| BundleError::Archive {
                reason: err.to_string(),
            })?
    }
}

fn write_archive(workdir: &Path, out: &Path) -> Result<(), BundleError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BundleError::Io {
            path: path.clone(),
            source,
        }
    };

    let file = std::fs::File::create(out).map_err(io_err(out))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    archive
        .append_dir_all(".", workdir)
        .map_err(io_err(workdir))?;
    let encoder = archive.into_inner().map_err(io_err(out))?;
    encoder.finish().map_err(io_err(out))?;

    tracing::info!(out = %out.display(), "bundled working tree");
    Ok(())
}
