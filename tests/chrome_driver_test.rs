//! Exercises `ChromeDriver` against a local page in a real browser.
//!
//! Run with: cargo test --test chrome_driver_test -- --ignored

use citation_export::{
    Config,
    driver::{BrowserDriver, Locator, Readiness, chrome::ChromeDriver},
};
use std::time::Duration;
use tempfile::TempDir;

const RESULTS_PAGE: &str = r#"<html><body>
<div class="blockUI" style="position:fixed;inset:0"></div>
<input type="checkbox" id="checkbox-all">
<button id="next" class="btn disabled" aria-disabled="true">Next</button>
<div id="panel" style="display:none">panel</div>
</body></html>"#;

#[tokio::test]
#[ignore = "requires a local Chrome installation"]
async fn test_driver_reads_and_mutates_results_page() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.export.download_dir = temp.path().to_path_buf();
    config.browser.port = 9333;

    let driver = ChromeDriver::launch(&config).await.unwrap();
    let url = format!("data:text/html,{}", RESULTS_PAGE.replace('#', "%23"));
    driver.navigate(&url).await.unwrap();

    let checkbox = Locator::id("checkbox-all");
    driver
        .wait_for(&checkbox, Readiness::Clickable, Duration::from_secs(5))
        .await
        .unwrap();

    let hidden = driver
        .wait_for(&Locator::id("panel"), Readiness::Visible, Duration::from_millis(300))
        .await;
    assert!(hidden.unwrap_err().is_timeout());

    assert_eq!(driver.remove_all(&Locator::css("div.blockUI")).await.unwrap(), 1);

    let next = Locator::css("#next");
    assert_eq!(
        driver.attribute(&next, "class").await.unwrap().as_deref(),
        Some("btn disabled")
    );
    assert!(driver.attribute(&next, "disabled").await.unwrap().is_none());

    driver.force_click(&checkbox).await.unwrap();
    assert!(driver.force_click(&Locator::css("#missing")).await.is_err());

    let handles = driver.window_handles().await.unwrap();
    assert!(!handles.is_empty());
    driver.switch_to_window(&handles[0]).await.unwrap();

    driver.quit().await.unwrap();
    driver.quit().await.unwrap();
}
