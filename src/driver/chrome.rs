use super::{BrowserDriver, Locator, Readiness, WindowHandle};
use crate::{
    ExportError, Result,
    config::Config,
    js_templates,
    timeouts::{ms, secs},
};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    ActivateTargetParams, CloseTargetParams, TargetId,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct PageTarget {
    id: TargetId,
    #[serde(rename = "type")]
    target_type: String,
}

/// Chromium session driven over the DevTools protocol.
///
/// Downloads are routed into the configured directory with
/// `Browser.setDownloadBehavior`, so the export click never raises a save
/// prompt. The session is owned exclusively and released by [`quit`].
///
/// [`quit`]: BrowserDriver::quit
pub struct ChromeDriver {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    primary: Arc<Page>,
    active: RwLock<Arc<Page>>,
    port: u16,
    navigation_timeout: Duration,
}

impl ChromeDriver {
    pub async fn launch(config: &Config) -> Result<Self> {
        let chrome_path = config
            .browser
            .chrome_path
            .clone()
            .map(Ok)
            .unwrap_or_else(crate::utils::find_chrome_executable)?;

        let port = config.browser.port;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .port(port)
            .window_size(config.browser.window_width, config.browser.window_height)
            .request_timeout(Duration::from_secs(secs::REQUEST));

        if !config.browser.headless {
            builder = builder.with_head();
        }

        if let Some(ref dir) = config.browser.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        let browser_config = builder.build().map_err(ExportError::LaunchFailed)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ExportError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match Self::prepare(&browser, &config.export.download_dir).await {
            Ok(page) => page,
            Err(e) => {
                browser.close().await.ok();
                browser.wait().await.ok();
                handler_task.abort();
                return Err(e);
            }
        };

        tracing::debug!(
            "Chrome launched on port {} (target {})",
            port,
            page.target_id().inner()
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            active: RwLock::new(page.clone()),
            primary: page,
            port,
            navigation_timeout: config.timeouts.navigation(),
        })
    }

    async fn prepare(browser: &Browser, download_dir: &Path) -> Result<Arc<Page>> {
        let download_path = std::fs::canonicalize(download_dir)?;

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_path.to_string_lossy().to_string())
            .build()
            .map_err(ExportError::LaunchFailed)?;

        browser.execute(params).await.map_err(|e| {
            ExportError::LaunchFailed(format!("Failed to set download behavior: {}", e))
        })?;

        tokio::time::sleep(Duration::from_millis(ms::PAGE_LOAD_SETTLE)).await;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExportError::LaunchFailed(format!("Failed to create page: {}", e)))?;

        Ok(Arc::new(page))
    }

    async fn active_page(&self) -> Arc<Page> {
        self.active.read().await.clone()
    }

    fn primary_handle(&self) -> WindowHandle {
        self.primary.target_id().inner().to_string()
    }

    async fn eval_json(&self, script: String) -> Result<serde_json::Value> {
        let page = self.active_page().await;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| ExportError::EvaluationError(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| ExportError::EvaluationError(format!("Failed to parse result: {}", e)))
    }

    async fn eval_found(&self, script: String, locator: &Locator) -> Result<()> {
        let value = self.eval_json(script).await?;

        let found = value
            .get("found")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if found {
            Ok(())
        } else {
            Err(ExportError::ElementNotFound {
                locator: locator.to_string(),
            })
        }
    }

    async fn list_targets_from_http(&self) -> Result<Vec<PageTarget>> {
        let url = format!("http://127.0.0.1:{}/json/list", self.port);

        let response: Vec<PageTarget> = reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .map_err(|_| ExportError::ConnectionLost)?
            .json()
            .await
            .map_err(|_| ExportError::ConnectionLost)?;

        Ok(response
            .into_iter()
            .filter(|t| t.target_type == "page")
            .collect())
    }

    async fn attached_page_handles(&self) -> Result<Vec<WindowHandle>> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(ExportError::ConnectionLost)?;

        let pages = browser
            .pages()
            .await
            .map_err(|e| ExportError::Connection(e.to_string()))?;

        Ok(pages
            .iter()
            .map(|p| p.target_id().inner().to_string())
            .collect())
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.active_page().await;

        tokio::time::timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| ExportError::NavigationTimeout(self.navigation_timeout.as_secs()))?
            .map_err(|e| ExportError::General(format!("Navigation failed: {}", e)))?;

        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<()> {
        let start = tokio::time::Instant::now();
        let script = js_templates::readiness_check(locator, readiness);

        loop {
            // evaluation fails while the document is being replaced; treat as not ready
            let ready = self
                .eval_json(script.clone())
                .await
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            if ready {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(ExportError::ElementTimeout {
                    locator: locator.to_string(),
                    secs: timeout.as_secs(),
                });
            }

            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.eval_found(js_templates::scroll_into_view(locator), locator)
            .await?;
        tokio::time::sleep(Duration::from_millis(ms::VIEWPORT_SETTLE)).await;
        Ok(())
    }

    async fn force_click(&self, locator: &Locator) -> Result<()> {
        self.eval_found(js_templates::dispatch_click(locator), locator)
            .await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let page = self.active_page().await;

        let found = match locator.as_css() {
            Some(css) => page.find_element(css).await,
            None => page.find_xpath(locator.expression()).await,
        };

        let element = found.map_err(|_| ExportError::ElementNotFound {
            locator: locator.to_string(),
        })?;

        tokio::time::timeout(Duration::from_millis(ms::CDP_ACTION), element.click())
            .await
            .map_err(|_| ExportError::General(format!("Click on {} timed out", locator)))?
            .map_err(|e| ExportError::General(format!("Click failed: {}", e)))?;

        Ok(())
    }

    async fn remove_all(&self, locator: &Locator) -> Result<usize> {
        let value = self.eval_json(js_templates::remove_all(locator)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let value = self
            .eval_json(js_templates::read_attribute(locator, name))
            .await?;

        if !value
            .get("found")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            return Err(ExportError::ElementNotFound {
                locator: locator.to_string(),
            });
        }

        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        let primary = self.primary_handle();
        let mut handles = vec![primary.clone()];

        let others: Vec<WindowHandle> = match self.list_targets_from_http().await {
            Ok(targets) => targets
                .into_iter()
                .map(|t| t.id.inner().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!("Target list over HTTP failed ({}), using attached pages", e);
                self.attached_page_handles().await?
            }
        };

        handles.extend(others.into_iter().filter(|id| *id != primary));
        Ok(handles)
    }

    async fn close_window(&self, handle: &WindowHandle) -> Result<()> {
        if *handle == self.primary_handle() {
            return Err(ExportError::General(
                "Cannot close the primary window".to_string(),
            ));
        }

        {
            let guard = self.browser.lock().await;
            let browser = guard.as_ref().ok_or(ExportError::ConnectionLost)?;
            browser
                .execute(CloseTargetParams::new(TargetId::from(handle.clone())))
                .await
                .map_err(|e| ExportError::General(format!("Failed to close tab via CDP: {}", e)))?;
        }

        let mut active = self.active.write().await;
        if active.target_id().inner() == handle {
            *active = self.primary.clone();
        }

        Ok(())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        let target_id = TargetId::from(handle.clone());

        let page = {
            let guard = self.browser.lock().await;
            let browser = guard.as_ref().ok_or(ExportError::ConnectionLost)?;

            browser
                .execute(ActivateTargetParams::new(target_id.clone()))
                .await
                .map_err(|e| ExportError::General(format!("Failed to focus tab: {}", e)))?;

            if *handle == self.primary_handle() {
                self.primary.clone()
            } else {
                browser
                    .get_page(target_id)
                    .await
                    .map(Arc::new)
                    .map_err(|e| ExportError::General(format!("Failed to attach tab: {}", e)))?
            }
        };

        *self.active.write().await = page;
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ExportError::General(format!("Failed to close Chrome: {}", e)));

        browser.wait().await.ok();

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }

        closed
    }
}
