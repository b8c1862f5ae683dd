use crate::driver::{ActivationMode, Locator};
use crate::{ExportError, Result, timeouts};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user_data_dir: Option<PathBuf>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

/// Locators and URL of the search-results site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub start_url: Option<String>,
    #[serde(default = "default_consent_button")]
    pub consent_button: Locator,
    #[serde(default = "default_select_all")]
    pub select_all: Locator,
    #[serde(default = "default_blocking_overlay")]
    pub blocking_overlay: Locator,
    #[serde(default = "default_export_menu")]
    pub export_menu: Locator,
    #[serde(default = "default_export_panel")]
    pub export_panel: Locator,
    #[serde(default = "default_export_option")]
    pub export_option: Locator,
    #[serde(default = "default_next_page")]
    pub next_page: Locator,
    /// Class token marking the next-page control as disabled.
    #[serde(default = "default_disabled_class")]
    pub disabled_class: String,
    #[serde(default)]
    pub activation: ActivationMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
    #[serde(default = "default_rename_attempts")]
    pub rename_attempts: u32,
}

/// Every bound is in whole seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_consent_secs")]
    pub consent_secs: u64,
    #[serde(default = "default_consent_settle_secs")]
    pub consent_settle_secs: u64,
    #[serde(default = "default_select_all_secs")]
    pub select_all_secs: u64,
    #[serde(default = "default_export_menu_secs")]
    pub export_menu_secs: u64,
    #[serde(default = "default_export_panel_secs")]
    pub export_panel_secs: u64,
    #[serde(default = "default_export_option_secs")]
    pub export_option_secs: u64,
    #[serde(default = "default_download_secs")]
    pub download_secs: u64,
    #[serde(default = "default_download_poll_secs")]
    pub download_poll_secs: u64,
    #[serde(default = "default_rename_backoff_secs")]
    pub rename_backoff_secs: u64,
    #[serde(default = "default_next_page_secs")]
    pub next_page_secs: u64,
    #[serde(default = "default_page_load_secs")]
    pub page_load_secs: u64,
    #[serde(default = "default_page_settle_secs")]
    pub page_settle_secs: u64,
    #[serde(default = "default_navigation_secs")]
    pub navigation_secs: u64,
}

impl TimeoutConfig {
    pub fn consent(&self) -> Duration {
        Duration::from_secs(self.consent_secs)
    }
    pub fn consent_settle(&self) -> Duration {
        Duration::from_secs(self.consent_settle_secs)
    }
    pub fn select_all(&self) -> Duration {
        Duration::from_secs(self.select_all_secs)
    }
    pub fn export_menu(&self) -> Duration {
        Duration::from_secs(self.export_menu_secs)
    }
    pub fn export_panel(&self) -> Duration {
        Duration::from_secs(self.export_panel_secs)
    }
    pub fn export_option(&self) -> Duration {
        Duration::from_secs(self.export_option_secs)
    }
    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }
    pub fn download_poll(&self) -> Duration {
        Duration::from_secs(self.download_poll_secs)
    }
    pub fn rename_backoff(&self) -> Duration {
        Duration::from_secs(self.rename_backoff_secs)
    }
    pub fn next_page(&self) -> Duration {
        Duration::from_secs(self.next_page_secs)
    }
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }
    pub fn page_settle(&self) -> Duration {
        Duration::from_secs(self.page_settle_secs)
    }
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }
}

fn default_headless() -> bool {
    true
}
fn default_port() -> u16 {
    9222
}
fn default_window_width() -> u32 {
    1920
}
fn default_window_height() -> u32 {
    1080
}

fn default_consent_button() -> Locator {
    Locator::xpath("//button[contains(., 'Aceitar')]")
}
fn default_select_all() -> Locator {
    Locator::css("input#checkbox-all")
}
fn default_blocking_overlay() -> Locator {
    Locator::css("div.blockUI")
}
fn default_export_menu() -> Locator {
    Locator::xpath("//a[@role='button' and contains(., 'Exportar')]")
}
fn default_export_panel() -> Locator {
    Locator::css("div.dropdown-menu.show")
}
fn default_export_option() -> Locator {
    Locator::id("exportRIS")
}
fn default_next_page() -> Locator {
    Locator::xpath("//button[@aria-label='Página seguinte']")
}
fn default_disabled_class() -> String {
    "disabled".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("citation_exports")
}
fn default_file_extension() -> String {
    "ris".to_string()
}
fn default_filename_prefix() -> String {
    "page".to_string()
}
fn default_rename_attempts() -> u32 {
    timeouts::RENAME_ATTEMPTS
}

fn default_consent_secs() -> u64 {
    timeouts::secs::CONSENT
}
fn default_consent_settle_secs() -> u64 {
    timeouts::secs::CONSENT_SETTLE
}
fn default_select_all_secs() -> u64 {
    timeouts::secs::SELECT_ALL
}
fn default_export_menu_secs() -> u64 {
    timeouts::secs::EXPORT_MENU
}
fn default_export_panel_secs() -> u64 {
    timeouts::secs::EXPORT_PANEL
}
fn default_export_option_secs() -> u64 {
    timeouts::secs::EXPORT_OPTION
}
fn default_download_secs() -> u64 {
    timeouts::secs::DOWNLOAD
}
fn default_download_poll_secs() -> u64 {
    timeouts::secs::DOWNLOAD_POLL
}
fn default_rename_backoff_secs() -> u64 {
    timeouts::secs::RENAME_BACKOFF
}
fn default_next_page_secs() -> u64 {
    timeouts::secs::NEXT_PAGE
}
fn default_page_load_secs() -> u64 {
    timeouts::secs::PAGE_LOAD
}
fn default_page_settle_secs() -> u64 {
    timeouts::secs::PAGE_SETTLE
}
fn default_navigation_secs() -> u64 {
    timeouts::secs::NAVIGATION
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            port: default_port(),
            user_data_dir: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            start_url: None,
            consent_button: default_consent_button(),
            select_all: default_select_all(),
            blocking_overlay: default_blocking_overlay(),
            export_menu: default_export_menu(),
            export_panel: default_export_panel(),
            export_option: default_export_option(),
            next_page: default_next_page(),
            disabled_class: default_disabled_class(),
            activation: ActivationMode::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_extension: default_file_extension(),
            filename_prefix: default_filename_prefix(),
            rename_attempts: default_rename_attempts(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            consent_secs: default_consent_secs(),
            consent_settle_secs: default_consent_settle_secs(),
            select_all_secs: default_select_all_secs(),
            export_menu_secs: default_export_menu_secs(),
            export_panel_secs: default_export_panel_secs(),
            export_option_secs: default_export_option_secs(),
            download_secs: default_download_secs(),
            download_poll_secs: default_download_poll_secs(),
            rename_backoff_secs: default_rename_backoff_secs(),
            next_page_secs: default_next_page_secs(),
            page_load_secs: default_page_load_secs(),
            page_settle_secs: default_page_settle_secs(),
            navigation_secs: default_navigation_secs(),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("citation-export"))
        .ok_or_else(|| ExportError::ConfigError("Could not determine config directory".into()))
}

pub const PROJECT_CONFIG_FILE: &str = ".citation-export.toml";

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let layers = [default_config_path()?, PathBuf::from(PROJECT_CONFIG_FILE)];
        let mut config = Self::from_layers(&layers)?;
        config.load_from_env();

        Ok(config)
    }

    /// Reads each existing file in order, later files overriding earlier ones
    /// key by key. Keys no layer sets keep their defaults.
    pub fn from_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();

        for path in paths.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path)?;
            let layer: toml::Table = toml::from_str(&content)?;
            merge_tables(&mut merged, layer);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.load_from_env();
        Ok(config)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(port) = cli_overrides.port {
            config.browser.port = port;
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(url) = cli_overrides.start_url {
            config.site.start_url = Some(url);
        }
        if let Some(dir) = cli_overrides.download_dir {
            config.export.download_dir = dir;
        }
        if let Some(secs) = cli_overrides.download_timeout {
            config.timeouts.download_secs = secs;
        }

        config
    }

    fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("CITATION_EXPORT_URL")
            && !url.is_empty()
        {
            self.site.start_url = Some(url);
        }
        if let Ok(dir) = std::env::var("CITATION_EXPORT_DIR")
            && !dir.is_empty()
        {
            self.export.download_dir = PathBuf::from(dir);
        }
        if let Ok(timeout) = std::env::var("CITATION_EXPORT_DOWNLOAD_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.timeouts.download_secs = timeout;
        }
        if let Ok(port) = std::env::var("CHROME_DEBUG_PORT")
            && let Ok(port) = port.parse()
        {
            self.browser.port = port;
        }
        if let Ok(headless) = std::env::var("CHROME_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.browser.port < 1024 {
            return Err(ExportError::InvalidPort(self.browser.port));
        }

        let start_url = self.site.start_url.as_deref().ok_or_else(|| {
            ExportError::ConfigError(
                "start_url is not set (use --url, CITATION_EXPORT_URL or [site] start_url)".into(),
            )
        })?;
        let parsed =
            url::Url::parse(start_url).map_err(|e| ExportError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExportError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        if self.export.file_extension.trim_start_matches('.').is_empty() {
            return Err(ExportError::ConfigError(
                "file_extension must not be empty".into(),
            ));
        }

        if self.export.rename_attempts == 0 {
            return Err(ExportError::ConfigError(
                "rename_attempts must be greater than 0".into(),
            ));
        }

        let t = &self.timeouts;
        let bounds = [
            ("consent_secs", t.consent_secs),
            ("select_all_secs", t.select_all_secs),
            ("export_menu_secs", t.export_menu_secs),
            ("export_panel_secs", t.export_panel_secs),
            ("export_option_secs", t.export_option_secs),
            ("download_secs", t.download_secs),
            ("download_poll_secs", t.download_poll_secs),
            ("next_page_secs", t.next_page_secs),
            ("page_load_secs", t.page_load_secs),
            ("navigation_secs", t.navigation_secs),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, secs)| *secs == 0) {
            return Err(ExportError::ConfigError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(ExportError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn show_masked(&self) -> String {
        format!(
            r#"Browser:
  Chrome Path: {}
  Headless: {}
  Port: {}

Site:
  Start URL: {}
  Select All: {}
  Export Option: {}
  Next Page: {}
  Activation: {:?}

Export:
  Download Dir: {}
  Extension: .{}
  Rename Attempts: {}

Timeouts:
  Download: {}s
  Page Load: {}s
"#,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            self.browser.port,
            self.site.start_url.as_deref().unwrap_or("not set"),
            self.site.select_all,
            self.site.export_option,
            self.site.next_page,
            self.site.activation,
            self.export.download_dir.display(),
            self.export.file_extension.trim_start_matches('.'),
            self.export.rename_attempts,
            self.timeouts.download_secs,
            self.timeouts.page_load_secs,
        )
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub port: Option<u16>,
    pub chrome_path: Option<PathBuf>,
    pub start_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub download_timeout: Option<u64>,
}
