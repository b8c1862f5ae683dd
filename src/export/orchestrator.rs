use super::{DownloadWatcher, FileMaterializer, PageActions, PageCursor};
use crate::{ExportError, Result, config::Config, driver::BrowserDriver};
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    TabsNormalized,
    MenuOpened,
    OptionsVisible,
    SnapshotTaken,
    ExportTriggered,
    AwaitingFile,
    Materializing,
    Done,
    Aborted,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TabsNormalized => "tabs normalized",
            Self::MenuOpened => "menu opened",
            Self::OptionsVisible => "options visible",
            Self::SnapshotTaken => "snapshot taken",
            Self::ExportTriggered => "export triggered",
            Self::AwaitingFile => "awaiting file",
            Self::Materializing => "materializing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Drives one page's export from menu to materialized file.
///
/// [`export_page`](Self::export_page) always returns a tagged result: driver
/// errors and panics alike are logged and turned into `Err`.
pub struct ExportOrchestrator<'a, D: BrowserDriver + ?Sized> {
    actions: &'a PageActions<'a, D>,
    watcher: DownloadWatcher,
    materializer: FileMaterializer,
    download_timeout: Duration,
    state: ExportState,
    transitions: Vec<ExportState>,
}

impl<'a, D: BrowserDriver + ?Sized> ExportOrchestrator<'a, D> {
    pub fn new(actions: &'a PageActions<'a, D>, config: &Config) -> Self {
        let watcher = DownloadWatcher::new(
            &config.export.download_dir,
            &config.export.file_extension,
            config.timeouts.download_poll(),
        );

        Self::with_parts(
            actions,
            watcher,
            FileMaterializer::from_config(config),
            config.timeouts.download(),
        )
    }

    pub fn with_parts(
        actions: &'a PageActions<'a, D>,
        watcher: DownloadWatcher,
        materializer: FileMaterializer,
        download_timeout: Duration,
    ) -> Self {
        Self {
            actions,
            watcher,
            materializer,
            download_timeout,
            state: ExportState::Idle,
            transitions: vec![ExportState::Idle],
        }
    }

    pub fn with_materializer(mut self, materializer: FileMaterializer) -> Self {
        self.materializer = materializer;
        self
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// States visited by the most recent attempt, starting at `Idle`.
    pub fn transitions(&self) -> &[ExportState] {
        &self.transitions
    }

    fn enter(&mut self, state: ExportState) {
        tracing::debug!("export: {} -> {}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    pub async fn export_page(&mut self, cursor: PageCursor) -> Result<PathBuf> {
        self.state = ExportState::Idle;
        self.transitions.clear();
        self.transitions.push(ExportState::Idle);

        let result = match AssertUnwindSafe(self.attempt(cursor)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ExportError::UnexpectedFault(panic_message(panic.as_ref()))),
        };

        match &result {
            Ok(path) => {
                tracing::info!("Page {} exported to {}", cursor, path.display());
                self.enter(ExportState::Done);
            }
            Err(e) => {
                tracing::error!(
                    page = cursor.get(),
                    state = %self.state,
                    dir = %self.watcher.dir().display(),
                    "Page export failed: {}",
                    e
                );
                self.enter(ExportState::Aborted);
            }
        }

        result
    }

    async fn attempt(&mut self, cursor: PageCursor) -> Result<PathBuf> {
        let actions = self.actions;

        actions.normalize_windows().await?;
        self.enter(ExportState::TabsNormalized);

        actions.open_export_menu().await?;
        self.enter(ExportState::MenuOpened);

        actions.await_export_panel().await?;
        self.enter(ExportState::OptionsVisible);

        actions.await_export_option().await?;
        let snapshot = self.watcher.snapshot()?;
        self.enter(ExportState::SnapshotTaken);

        actions.trigger_export_option().await?;
        self.enter(ExportState::ExportTriggered);

        self.enter(ExportState::AwaitingFile);
        let source = self
            .watcher
            .await_new_file(&snapshot, self.download_timeout)
            .await?
            .ok_or_else(|| ExportError::DownloadTimeout {
                extension: self.watcher.extension().to_string(),
                secs: self.download_timeout.as_secs(),
            })?;

        self.enter(ExportState::Materializing);
        self.materializer.materialize_page(&source, cursor).await
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
