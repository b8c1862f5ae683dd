use crate::{
    Result,
    config::{SiteConfig, TimeoutConfig},
    driver::{BrowserDriver, Readiness},
};
use serde::Serialize;

/// Result of the best-effort consent dismissal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ConsentOutcome {
    Dismissed,
    /// The control never became interactable; already dismissed or never shown.
    NotPresent,
    /// The control was there but could not be activated.
    Failed(String),
}

/// The UI actions performed on every results page.
pub struct PageActions<'a, D: BrowserDriver + ?Sized> {
    driver: &'a D,
    site: &'a SiteConfig,
    timeouts: &'a TimeoutConfig,
}

impl<'a, D: BrowserDriver + ?Sized> PageActions<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteConfig, timeouts: &'a TimeoutConfig) -> Self {
        Self {
            driver,
            site,
            timeouts,
        }
    }

    /// Never fails the run: absence of the control is a valid state.
    pub async fn accept_consent_if_present(&self) -> ConsentOutcome {
        let button = &self.site.consent_button;

        if let Err(e) = self
            .driver
            .wait_for(button, Readiness::Clickable, self.timeouts.consent())
            .await
        {
            if e.is_timeout() {
                tracing::debug!("No consent control within {}s", self.timeouts.consent_secs);
                return ConsentOutcome::NotPresent;
            }
            tracing::warn!("Consent control lookup failed: {}", e);
            return ConsentOutcome::Failed(e.to_string());
        }

        match self.driver.activate(button, self.site.activation).await {
            Ok(()) => {
                tokio::time::sleep(self.timeouts.consent_settle()).await;
                tracing::debug!("Consent overlay dismissed");
                ConsentOutcome::Dismissed
            }
            Err(e) => {
                tracing::warn!("Consent control present but not dismissed: {}", e);
                ConsentOutcome::Failed(e.to_string())
            }
        }
    }

    /// Ticks the "select all" control, removing any blocking overlay first.
    pub async fn select_all_results(&self) -> Result<()> {
        let checkbox = &self.site.select_all;

        self.driver
            .wait_for(checkbox, Readiness::Present, self.timeouts.select_all())
            .await?;
        self.driver.scroll_into_view(checkbox).await?;

        let removed = self.driver.remove_all(&self.site.blocking_overlay).await?;
        if removed > 0 {
            tracing::debug!("Removed {} blocking overlay element(s)", removed);
        }

        self.driver.force_click(checkbox).await
    }

    /// Closes every window opened as a side effect and refocuses the primary one.
    pub async fn normalize_windows(&self) -> Result<()> {
        let handles = self.driver.window_handles().await?;
        let Some((primary, extras)) = handles.split_first() else {
            return Err(crate::ExportError::General("No open windows".to_string()));
        };

        for handle in extras {
            tracing::debug!("Closing extra window {}", handle);
            self.driver.close_window(handle).await?;
        }

        self.driver.switch_to_window(primary).await
    }

    pub async fn open_export_menu(&self) -> Result<()> {
        let menu = &self.site.export_menu;

        self.driver
            .wait_for(menu, Readiness::Clickable, self.timeouts.export_menu())
            .await?;
        self.driver.scroll_into_view(menu).await?;
        self.driver.activate(menu, self.site.activation).await
    }

    pub async fn await_export_panel(&self) -> Result<()> {
        self.driver
            .wait_for(
                &self.site.export_panel,
                Readiness::Visible,
                self.timeouts.export_panel(),
            )
            .await
    }

    pub async fn await_export_option(&self) -> Result<()> {
        self.driver
            .wait_for(
                &self.site.export_option,
                Readiness::Clickable,
                self.timeouts.export_option(),
            )
            .await
    }

    /// Requests the export file. Must run right after the download directory
    /// snapshot.
    pub async fn trigger_export_option(&self) -> Result<()> {
        self.driver
            .activate(&self.site.export_option, self.site.activation)
            .await
    }
}
