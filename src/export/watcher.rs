use crate::Result;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filenames present in the download directory at one instant.
///
/// Taken immediately before the export is triggered; only the set difference
/// against a later listing is ever used.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    names: HashSet<OsString>,
}

impl DirectorySnapshot {
    pub fn capture(dir: &Path) -> Result<Self> {
        Ok(Self {
            names: list_names(dir)?,
        })
    }

    /// Names in `current` that were not present when the snapshot was taken.
    pub fn new_entries<'a>(
        &'a self,
        current: &'a HashSet<OsString>,
    ) -> impl Iterator<Item = &'a OsString> + 'a {
        current.difference(&self.names)
    }
}

fn list_names(dir: &Path) -> Result<HashSet<OsString>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            names.insert(entry.file_name());
        }
    }
    Ok(names)
}

/// Case-insensitive match on the final extension. `export.RIS` matches `ris`,
/// `export.ris.crdownload` does not.
pub fn matches_extension(name: &std::ffi::OsStr, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Polls a directory for a new file with the export extension.
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    dir: PathBuf,
    extension: String,
    poll_interval: Duration,
}

impl DownloadWatcher {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            poll_interval,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    pub fn snapshot(&self) -> Result<DirectorySnapshot> {
        DirectorySnapshot::capture(&self.dir)
    }

    /// Waits up to `timeout` for a file absent from `snapshot` whose extension
    /// matches. Returns `Ok(None)` on timeout; only listing failures are errors.
    pub async fn await_new_file(
        &self,
        snapshot: &DirectorySnapshot,
        timeout: Duration,
    ) -> Result<Option<PathBuf>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let current = list_names(&self.dir)?;
            if let Some(name) = snapshot
                .new_entries(&current)
                .find(|name| matches_extension(name, &self.extension))
            {
                tracing::debug!("New download detected: {:?}", name);
                return Ok(Some(self.dir.join(name)));
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    #[test]
    fn test_matches_extension_case_insensitive() {
        assert!(matches_extension(OsStr::new("export.ris"), "ris"));
        assert!(matches_extension(OsStr::new("EXPORT.RIS"), "ris"));
        assert!(matches_extension(OsStr::new("export.ris"), ".ris"));
        assert!(!matches_extension(OsStr::new("export.ris.crdownload"), "ris"));
        assert!(!matches_extension(OsStr::new("ris"), "ris"));
        assert!(!matches_extension(OsStr::new("export.bib"), "ris"));
    }

    #[test]
    fn test_snapshot_lists_files_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ris"), "TY  - JOUR").unwrap();
        fs::create_dir(temp.path().join("nested.ris")).unwrap();

        let snapshot = DirectorySnapshot::capture(temp.path()).unwrap();
        assert_eq!(snapshot.names.len(), 1);
        assert!(snapshot.names.contains(OsStr::new("a.ris")));
        assert!(!snapshot.names.contains(OsStr::new("nested.ris")));
    }

    #[test]
    fn test_snapshot_missing_dir_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(DirectorySnapshot::capture(&temp.path().join("missing")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preexisting_file_is_not_new() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.ris"), "").unwrap();

        let watcher = DownloadWatcher::new(temp.path(), "ris", Duration::from_secs(1));
        let snapshot = watcher.snapshot().unwrap();

        let found = watcher
            .await_new_file(&snapshot, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_none_after_deadline() {
        let temp = TempDir::new().unwrap();
        let watcher = DownloadWatcher::new(temp.path(), "ris", Duration::from_secs(1));
        let snapshot = watcher.snapshot().unwrap();

        let start = tokio::time::Instant::now();
        let found = watcher
            .await_new_file(&snapshot, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(found.is_none());
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(62));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detects_file_arriving_later() {
        let temp = TempDir::new().unwrap();
        let watcher = DownloadWatcher::new(temp.path(), "ris", Duration::from_secs(1));
        let snapshot = watcher.snapshot().unwrap();

        let dir = temp.path().to_path_buf();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            fs::write(dir.join("export.ris.crdownload"), "").unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
            fs::write(dir.join("export.ris"), "TY  - JOUR").unwrap();
        });

        let found = watcher
            .await_new_file(&snapshot, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(found, Some(temp.path().join("export.ris")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_other_extensions() {
        let temp = TempDir::new().unwrap();
        let watcher = DownloadWatcher::new(temp.path(), "ris", Duration::from_secs(1));
        let snapshot = watcher.snapshot().unwrap();
        fs::write(temp.path().join("export.csv"), "").unwrap();

        let found = watcher
            .await_new_file(&snapshot, Duration::from_secs(3))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
