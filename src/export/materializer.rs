use super::PageCursor;
use crate::{ExportError, Result, config::Config};
use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `<prefix>_<cursor>_<YYYYMMDD_HHMMSS>.<extension>`
pub fn destination_name(
    prefix: &str,
    cursor: PageCursor,
    captured_at: &DateTime<Local>,
    extension: &str,
) -> String {
    format!(
        "{}_{}_{}.{}",
        prefix,
        cursor,
        captured_at.format("%Y%m%d_%H%M%S"),
        extension.trim_start_matches('.')
    )
}

/// The writer may keep the file open for a moment after it becomes visible.
fn is_lock_contention(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
    ) {
        return true;
    }

    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

fn rename_file(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

/// Renames a finished download to its page-stamped name.
#[derive(Debug, Clone)]
pub struct FileMaterializer {
    dir: PathBuf,
    prefix: String,
    fallback_extension: String,
    max_attempts: u32,
    backoff: Duration,
    rename: RenameFn,
}

impl FileMaterializer {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        fallback_extension: impl Into<String>,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            fallback_extension: fallback_extension.into(),
            max_attempts,
            backoff,
            rename: rename_file,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.export.download_dir,
            &config.export.filename_prefix,
            config.export.file_extension.trim_start_matches('.'),
            config.export.rename_attempts,
            config.timeouts.rename_backoff(),
        )
    }

    /// Replaces the filesystem rename, e.g. with one that reports the file as
    /// held open by another process.
    pub fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    /// Destination for `source`, keeping whatever extension the export produced.
    pub fn destination_for(
        &self,
        source: &Path,
        cursor: PageCursor,
        captured_at: &DateTime<Local>,
    ) -> PathBuf {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.fallback_extension);

        self.dir
            .join(destination_name(&self.prefix, cursor, captured_at, extension))
    }

    /// Moves `source` to the name for `cursor`, stamped with the current time.
    pub async fn materialize_page(&self, source: &Path, cursor: PageCursor) -> Result<PathBuf> {
        let destination = self.destination_for(source, cursor, &Local::now());
        self.materialize(source, &destination).await
    }

    pub async fn materialize(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        self.materialize_with(source, destination, self.rename).await
    }

    /// Retries `rename` on lock contention only, sleeping `backoff` between
    /// attempts. Any other failure is returned immediately. On failure the
    /// source is left where it was.
    pub async fn materialize_with<F>(
        &self,
        source: &Path,
        destination: &Path,
        mut rename: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(&Path, &Path) -> io::Result<()>,
    {
        for attempt in 1..=self.max_attempts {
            match rename(source, destination) {
                Ok(()) => {
                    tracing::info!(
                        "Materialized {} -> {}",
                        source.display(),
                        destination.display()
                    );
                    return Ok(destination.to_path_buf());
                }
                Err(e) if is_lock_contention(&e) => {
                    tracing::warn!(
                        "{} is locked (attempt {}/{}): {}",
                        source.display(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(e) => return Err(ExportError::IoError(e)),
            }
        }

        Err(ExportError::LockTimeout {
            path: source.to_path_buf(),
            attempts: self.max_attempts,
        })
    }
}
