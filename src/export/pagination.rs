use crate::{
    Result,
    config::{SiteConfig, TimeoutConfig},
    driver::{BrowserDriver, Readiness},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAdvance {
    /// The next page is loaded and settled.
    Advanced,
    /// The next-page control is disabled; there is nothing left to export.
    LastPage,
}

/// Moves the results view forward one page.
pub struct Paginator<'a, D: BrowserDriver + ?Sized> {
    driver: &'a D,
    site: &'a SiteConfig,
    timeouts: &'a TimeoutConfig,
}

impl<'a, D: BrowserDriver + ?Sized> Paginator<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteConfig, timeouts: &'a TimeoutConfig) -> Self {
        Self {
            driver,
            site,
            timeouts,
        }
    }

    /// Any wait timeout or missing control is an `Err`; reaching the end is
    /// [`PageAdvance::LastPage`].
    pub async fn advance(&self) -> Result<PageAdvance> {
        let next = &self.site.next_page;

        // Visible rather than clickable: a disabled control is the end marker.
        self.driver
            .wait_for(next, Readiness::Visible, self.timeouts.next_page())
            .await?;

        if self.next_is_disabled().await? {
            tracing::info!("Next-page control is disabled; last page reached");
            return Ok(PageAdvance::LastPage);
        }

        self.driver.activate(next, self.site.activation).await?;

        self.driver
            .wait_for(
                &self.site.select_all,
                Readiness::Present,
                self.timeouts.page_load(),
            )
            .await?;

        tokio::time::sleep(self.timeouts.page_settle()).await;
        Ok(PageAdvance::Advanced)
    }

    async fn next_is_disabled(&self) -> Result<bool> {
        let next = &self.site.next_page;

        let class = self.driver.attribute(next, "class").await?;
        if class
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .any(|token| token == self.site.disabled_class)
        {
            return Ok(true);
        }

        if self.driver.attribute(next, "disabled").await?.is_some() {
            return Ok(true);
        }

        Ok(self
            .driver
            .attribute(next, "aria-disabled")
            .await?
            .is_some_and(|v| v == "true"))
    }
}
