use super::{
    ConsentOutcome, ExportOrchestrator, FileMaterializer, PageActions, PageAdvance, PageCursor,
    Paginator, orchestrator::panic_message,
};
use crate::{
    Result,
    config::Config,
    driver::BrowserDriver,
    output::{self, text},
    utils::signal,
};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedPage {
    pub page: PageCursor,
    pub path: PathBuf,
}

/// Where in the page cycle a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Navigation,
    SelectAll,
    Export,
    Pagination,
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The next-page control was disabled after `last_page` was exported.
    Completed { last_page: PageCursor },
    Aborted {
        page: PageCursor,
        stage: RunStage,
        reason: String,
    },
    Interrupted { page: PageCursor },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub saved: Vec<SavedPage>,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed { .. })
    }

    pub fn summary_line(&self) -> String {
        match &self.status {
            RunStatus::Completed { last_page } => format!(
                "Process finished: {} file(s) saved, last page {}",
                self.saved.len(),
                last_page
            ),
            RunStatus::Aborted { page, stage, reason } => format!(
                "Process finished: aborted on page {} during {:?} ({}); {} file(s) saved",
                page,
                stage,
                reason,
                self.saved.len()
            ),
            RunStatus::Interrupted { page } => format!(
                "Process finished: interrupted before page {}; {} file(s) saved",
                page,
                self.saved.len()
            ),
        }
    }
}

impl output::OutputFormatter for RunReport {
    fn format_text(&self) -> String {
        let mut lines = vec![text::section("Run summary")];
        for saved in &self.saved {
            lines.push(text::key_value(
                &format!("Page {}", saved.page),
                &saved.path.display().to_string(),
            ));
        }
        let summary = self.summary_line();
        lines.push(if self.is_success() {
            text::success(&summary)
        } else {
            text::error(&summary)
        });
        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// What a run has achieved so far; kept outside the page loop so a panic
/// cannot lose it.
#[derive(Debug, Default)]
struct Progress {
    saved: Vec<SavedPage>,
    page: PageCursor,
}

/// Owns the browser session for one pass over the result pages.
///
/// The driver is released exactly once, on every exit path, by [`run`](Self::run).
pub struct ExportRun<D: BrowserDriver> {
    driver: D,
    config: Config,
    materializer: FileMaterializer,
    progress: bool,
}

impl<D: BrowserDriver> ExportRun<D> {
    pub fn new(driver: D, config: Config) -> Self {
        let materializer = FileMaterializer::from_config(&config);
        Self {
            driver,
            config,
            materializer,
            progress: true,
        }
    }

    /// Per-page status lines on stdout; on by default.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_materializer(mut self, materializer: FileMaterializer) -> Self {
        self.materializer = materializer;
        self
    }

    pub async fn run(self) -> RunReport {
        let mut progress = Progress::default();
        let outcome = AssertUnwindSafe(self.drive(&mut progress))
            .catch_unwind()
            .await;

        let status = match outcome {
            Ok(status) => status,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(page = %progress.page, "Run loop panicked: {}", reason);
                RunStatus::Aborted {
                    page: progress.page,
                    stage: RunStage::Fault,
                    reason,
                }
            }
        };

        match self.driver.quit().await {
            Ok(()) => tracing::debug!("Browser session closed"),
            Err(e) => tracing::warn!("Browser teardown failed: {}", e),
        }

        let report = RunReport {
            saved: progress.saved,
            status,
        };

        self.status_line(&if report.is_success() {
            text::success(&report.summary_line())
        } else {
            text::warning(&report.summary_line())
        });

        report
    }

    fn status_line(&self, line: &str) {
        if self.progress {
            println!("{}", line);
        }
    }

    fn abort(&self, page: PageCursor, stage: RunStage, reason: String) -> RunStatus {
        tracing::error!(page = %page, ?stage, "Aborting run: {}", reason);
        self.status_line(&text::error(&format!(
            "Aborting on page {} ({:?}): {}",
            page, stage, reason
        )));
        RunStatus::Aborted {
            page,
            stage,
            reason,
        }
    }

    async fn drive(&self, progress: &mut Progress) -> RunStatus {
        let site = &self.config.site;
        let timeouts = &self.config.timeouts;

        let Some(start_url) = site.start_url.as_deref() else {
            return self.abort(
                progress.page,
                RunStage::Navigation,
                "start_url is not set".to_string(),
            );
        };

        if let Err(e) = self.driver.navigate(start_url).await {
            return self.abort(progress.page, RunStage::Navigation, e.to_string());
        }

        let actions = PageActions::new(&self.driver, site, timeouts);
        match actions.accept_consent_if_present().await {
            ConsentOutcome::Dismissed => tracing::info!("Consent overlay dismissed"),
            ConsentOutcome::NotPresent => tracing::debug!("Consent overlay not shown"),
            ConsentOutcome::Failed(reason) => {
                tracing::warn!("Consent overlay could not be dismissed: {}", reason)
            }
        }

        let paginator = Paginator::new(&self.driver, site, timeouts);
        let mut orchestrator = ExportOrchestrator::new(&actions, &self.config)
            .with_materializer(self.materializer.clone());

        loop {
            let page = progress.page;

            if signal::is_shutdown() {
                tracing::warn!("Shutdown requested before page {}", page);
                return RunStatus::Interrupted { page };
            }

            self.status_line(&text::info(&format!("Processing page {}", page)));

            if let Err(e) = actions.select_all_results().await {
                return self.abort(page, RunStage::SelectAll, e.to_string());
            }

            match orchestrator.export_page(page).await {
                Ok(path) => {
                    self.status_line(&text::success(&format!("Saved: {}", path.display())));
                    progress.saved.push(SavedPage { page, path });
                }
                Err(e) => return self.abort(page, RunStage::Export, e.to_string()),
            }

            match paginator.advance().await {
                Ok(PageAdvance::Advanced) => progress.page = page.next(),
                Ok(PageAdvance::LastPage) => {
                    self.status_line(&text::info("Last page reached"));
                    return RunStatus::Completed { last_page: page };
                }
                Err(e) => return self.abort(page, RunStage::Pagination, e.to_string()),
            }
        }
    }
}
