//! Browser contract consumed by the export core.
//!
//! The export state machine never talks to Chrome directly. It goes through
//! [`BrowserDriver`], which the Chromium backend implements over CDP and which
//! tests implement with a scripted in-memory page.

pub mod chrome;

use crate::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use chrome::ChromeDriver;

/// Declarative element locator, written as `css:<selector>`, `xpath:<expr>` or
/// `id:<id>`. A string without a prefix is a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// The selector, expression or id without its kind prefix.
    pub fn expression(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Id(s) => s,
        }
    }

    /// Equivalent CSS selector, when one exists.
    pub fn as_css(&self) -> Option<String> {
        match self {
            Self::Css(selector) => Some(selector.clone()),
            Self::Id(id) => Some(format!("[id=\"{}\"]", id.replace('"', "\\\""))),
            Self::XPath(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{}", s),
            Self::XPath(s) => write!(f, "xpath:{}", s),
            Self::Id(s) => write!(f, "id:{}", s),
        }
    }
}

impl FromStr for Locator {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (kind, value) = match s.split_once(':') {
            Some((kind @ ("css" | "xpath" | "id"), value)) => (kind, value.trim()),
            _ => ("css", s),
        };

        if value.is_empty() {
            return Err(ExportError::InvalidLocator(s.to_string()));
        }

        Ok(match kind {
            "xpath" => Self::XPath(value.to_string()),
            "id" => Self::Id(value.to_string()),
            _ => Self::Css(value.to_string()),
        })
    }
}

impl TryFrom<String> for Locator {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

/// How far along an element must be before an action may use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Attached to the DOM.
    Present,
    /// Attached, rendered and non-zero in size.
    Visible,
    /// Visible and not disabled.
    Clickable,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Present => "present",
            Self::Visible => "visible",
            Self::Clickable => "clickable",
        };
        f.write_str(name)
    }
}

/// How an element gets activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Synthetic `click()` dispatched from page script; ignores overlays.
    #[default]
    Dispatch,
    /// Visibility-respecting mouse click through the protocol.
    Native,
    /// Dispatch first, native click if dispatch fails.
    Auto,
}

impl FromStr for ActivationMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dispatch" | "js" => Ok(Self::Dispatch),
            "native" | "cdp" => Ok(Self::Native),
            "auto" => Ok(Self::Auto),
            _ => Err(format!("Invalid activation mode: {}", s)),
        }
    }
}

/// Opaque handle of a browser tab/window.
pub type WindowHandle = String;

#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Polls until `locator` reaches `readiness`, failing with
    /// [`ExportError::ElementTimeout`] once `timeout` elapses.
    async fn wait_for(&self, locator: &Locator, readiness: Readiness, timeout: Duration)
    -> Result<()>;

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()>;

    /// Activates the element by dispatching a synthetic click event, bypassing
    /// hit-testing and visibility checks.
    async fn force_click(&self, locator: &Locator) -> Result<()>;

    /// Standard interaction: scrolls, hit-tests and clicks like a user would.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Detaches every element matching `locator`, returning how many were removed.
    async fn remove_all(&self, locator: &Locator) -> Result<usize>;

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Open windows, primary first.
    async fn window_handles(&self) -> Result<Vec<WindowHandle>>;

    async fn close_window(&self, handle: &WindowHandle) -> Result<()>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()>;

    async fn quit(&self) -> Result<()>;

    /// Activates an element according to `mode`.
    async fn activate(&self, locator: &Locator, mode: ActivationMode) -> Result<()> {
        match mode {
            ActivationMode::Dispatch => self.force_click(locator).await,
            ActivationMode::Native => self.click(locator).await,
            ActivationMode::Auto => match self.force_click(locator).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::debug!("Dispatch click on {} failed ({}), trying native", locator, e);
                    self.click(locator).await
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_parse_prefixes() {
        assert_eq!(
            "css:input#checkbox-all".parse::<Locator>().unwrap(),
            Locator::css("input#checkbox-all")
        );
        assert_eq!(
            "xpath://button[contains(., 'Aceitar')]".parse::<Locator>().unwrap(),
            Locator::xpath("//button[contains(., 'Aceitar')]")
        );
        assert_eq!("id:exportRIS".parse::<Locator>().unwrap(), Locator::id("exportRIS"));
    }

    #[test]
    fn test_locator_without_prefix_is_css() {
        assert_eq!(
            "div.dropdown-menu.show".parse::<Locator>().unwrap(),
            Locator::css("div.dropdown-menu.show")
        );
        // pseudo-classes must not be mistaken for a prefix
        assert_eq!(
            "a:hover".parse::<Locator>().unwrap(),
            Locator::css("a:hover")
        );
    }

    #[test]
    fn test_locator_empty_is_rejected() {
        assert!("".parse::<Locator>().is_err());
        assert!("xpath:".parse::<Locator>().is_err());
    }

    #[test]
    fn test_locator_display_roundtrip() {
        let locator = Locator::xpath("//a[@role='button']");
        assert_eq!(locator.to_string().parse::<Locator>().unwrap(), locator);
    }

    #[test]
    fn test_locator_as_css() {
        assert_eq!(Locator::id("exportRIS").as_css().unwrap(), "[id=\"exportRIS\"]");
        assert!(Locator::xpath("//a").as_css().is_none());
    }

    #[test]
    fn test_activation_mode_from_str() {
        assert_eq!("dispatch".parse::<ActivationMode>().unwrap(), ActivationMode::Dispatch);
        assert_eq!("CDP".parse::<ActivationMode>().unwrap(), ActivationMode::Native);
        assert_eq!("auto".parse::<ActivationMode>().unwrap(), ActivationMode::Auto);
        assert!("mouse".parse::<ActivationMode>().is_err());
    }
}
