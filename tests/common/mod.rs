//! Scripted in-memory results site for driving the export flow without Chrome.

#![allow(dead_code)]

use async_trait::async_trait;
use citation_export::{
    Config, ExportError, Result,
    config::SiteConfig,
    driver::{BrowserDriver, Locator, Readiness, WindowHandle},
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const START_URL: &str = "https://example.org/search?q=ris";

/// How the last page marks its next-page control.
#[derive(Debug, Clone, Copy)]
pub enum EndMarker {
    Class,
    DisabledAttribute,
    AriaDisabled,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub pages: u32,
    pub consent: bool,
    pub end_marker: EndMarker,
    /// Page on which the export click produces nothing.
    pub no_download_on: Option<u32>,
    /// Page on which the export click panics.
    pub panic_on: Option<u32>,
    /// Page whose select-all control never appears.
    pub select_all_missing_on: Option<u32>,
    /// Drops a `.ris` file into the download directory when the export panel opens.
    pub stray_file_on_panel: bool,
    /// Every export click also opens a popup window.
    pub popup_on_export: bool,
    /// The consent control shows up but every click on it is rejected.
    pub consent_activation_fails: bool,
    /// Page on which the next-page control never renders.
    pub next_page_missing_on: Option<u32>,
    /// Page on which removing the blocking overlay panics.
    pub panic_on_overlay_removal: Option<u32>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            pages: 3,
            consent: true,
            end_marker: EndMarker::Class,
            no_download_on: None,
            panic_on: None,
            select_all_missing_on: None,
            stray_file_on_panel: false,
            popup_on_export: false,
            consent_activation_fails: false,
            next_page_missing_on: None,
            panic_on_overlay_removal: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    page: u32,
    consent_visible: bool,
    panel_open: bool,
    windows: Vec<WindowHandle>,
    popups: u32,
    calls: Vec<String>,
    quits: u32,
}

#[derive(Clone)]
pub struct FakeDriver {
    script: Script,
    site: SiteConfig,
    download_dir: PathBuf,
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new(script: Script, config: &Config) -> Self {
        let state = State {
            page: 1,
            windows: vec!["primary".to_string()],
            ..Default::default()
        };

        Self {
            script,
            site: config.site.clone(),
            download_dir: config.export.download_dir.clone(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn quits(&self) -> u32 {
        self.state.lock().unwrap().quits
    }

    pub fn current_page(&self) -> u32 {
        self.state.lock().unwrap().page
    }

    pub fn open_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().windows.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn ready(&self, locator: &Locator) -> bool {
        let state = self.state.lock().unwrap();
        let site = &self.site;

        if locator == &site.consent_button {
            state.consent_visible
        } else if locator == &site.select_all {
            self.script.select_all_missing_on != Some(state.page)
        } else if locator == &site.next_page {
            self.script.next_page_missing_on != Some(state.page)
        } else if locator == &site.export_menu {
            true
        } else if locator == &site.export_panel || locator == &site.export_option {
            state.panel_open
        } else {
            false
        }
    }

    fn write_download(&self, page: u32) {
        // Chrome leaves its partial file behind while the real one lands.
        std::fs::write(self.download_dir.join("export.ris.crdownload"), "").unwrap();
        std::fs::write(
            self.download_dir.join("export.ris"),
            ris_record(page),
        )
        .unwrap();
    }

    fn press(&self, locator: &Locator) -> Result<()> {
        let site = &self.site;

        if locator == &site.consent_button && self.script.consent_activation_fails {
            return Err(ExportError::General(format!(
                "Click on {} intercepted by another element",
                locator
            )));
        }
        let mut panic_page = None;

        {
            let mut state = self.state.lock().unwrap();
            if locator == &site.consent_button {
                state.consent_visible = false;
            } else if locator == &site.export_menu {
                state.panel_open = true;
            } else if locator == &site.export_option {
                state.panel_open = false;
                let page = state.page;
                if self.script.popup_on_export {
                    state.popups += 1;
                    let handle = format!("popup-{}", state.popups);
                    state.windows.push(handle);
                }
                if self.script.panic_on == Some(page) {
                    panic_page = Some(page);
                } else if self.script.no_download_on != Some(page) {
                    drop(state);
                    self.write_download(page);
                }
            } else if locator == &site.next_page {
                state.page += 1;
            }
        }

        if let Some(page) = panic_page {
            panic!("export control detached on page {}", page);
        }
        Ok(())
    }
}

pub fn ris_record(page: u32) -> String {
    format!("TY  - JOUR\nT1  - Result page {}\nER  - \n", page)
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate {}", url));
        self.state.lock().unwrap().consent_visible = self.script.consent;
        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<()> {
        self.record(format!("wait {} {}", readiness, locator));

        if self.ready(locator) {
            if locator == &self.site.export_panel && self.script.stray_file_on_panel {
                std::fs::write(self.download_dir.join("stray.ris"), "TY  - STRAY\n").unwrap();
            }
            return Ok(());
        }

        tokio::time::sleep(timeout).await;
        Err(ExportError::ElementTimeout {
            locator: locator.to_string(),
            secs: timeout.as_secs(),
        })
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.record(format!("scroll {}", locator));
        Ok(())
    }

    async fn force_click(&self, locator: &Locator) -> Result<()> {
        self.record(format!("force_click {}", locator));
        self.press(locator)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.record(format!("click {}", locator));
        self.press(locator)
    }

    async fn remove_all(&self, locator: &Locator) -> Result<usize> {
        self.record(format!("remove_all {}", locator));
        let page = self.current_page();
        if self.script.panic_on_overlay_removal == Some(page) {
            panic!("overlay node vanished mid-removal on page {}", page);
        }
        Ok(usize::from(page == 1))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.record(format!("attribute {} {}", locator, name));
        if locator != &self.site.next_page {
            return Ok(None);
        }

        let last = self.current_page() >= self.script.pages;
        let value = match (self.script.end_marker, name) {
            (EndMarker::Class, "class") if last => Some("btn btn-link disabled".to_string()),
            (_, "class") => Some("btn btn-link".to_string()),
            (EndMarker::DisabledAttribute, "disabled") if last => Some(String::new()),
            (EndMarker::AriaDisabled, "aria-disabled") if last => Some("true".to_string()),
            (_, "aria-disabled") => Some("false".to_string()),
            _ => None,
        };
        Ok(value)
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        self.record("window_handles".to_string());
        Ok(self.open_windows())
    }

    async fn close_window(&self, handle: &WindowHandle) -> Result<()> {
        self.record(format!("close_window {}", handle));
        self.state.lock().unwrap().windows.retain(|w| w != handle);
        Ok(())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        self.record(format!("switch_to_window {}", handle));
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        self.record("quit".to_string());
        self.state.lock().unwrap().quits += 1;
        Ok(())
    }
}

pub fn config_for(download_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.start_url = Some(START_URL.to_string());
    config.export.download_dir = download_dir.to_path_buf();
    config
}

/// Names of files in `dir` with the given extension, sorted.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|e| e == extension))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}
