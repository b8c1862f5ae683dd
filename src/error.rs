use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Chrome connection lost")]
    ConnectionLost,

    #[error("Navigation timeout after {0}s")]
    NavigationTimeout(u64),

    #[error("Element {locator} not ready after {secs}s")]
    ElementTimeout { locator: String, secs: u64 },

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("No new .{extension} file appeared within {secs}s")]
    DownloadTimeout { extension: String, secs: u64 },

    #[error("{} still locked after {attempts} rename attempts", path.display())]
    LockTimeout { path: PathBuf, attempts: u32 },

    #[error("Unexpected fault: {0}")]
    UnexpectedFault(String),

    #[error("Run aborted on page {page}: {reason}")]
    RunAborted { page: u32, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("General error: {0}")]
    General(String),
}

impl ExportError {
    /// Timeouts are expected outcomes of a bounded wait rather than driver faults.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout(_)
                | Self::ElementTimeout { .. }
                | Self::DownloadTimeout { .. }
                | Self::LockTimeout { .. }
        )
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Check if another Chrome instance is using the debugging port".into(),
                "Try specifying Chrome path with --chrome-path".into(),
            ],
            Self::ConnectionLost => vec![
                "Check if Chrome was closed manually".into(),
                "Restart the run from page 1".into(),
            ],
            Self::NavigationTimeout(timeout) => vec![
                format!(
                    "Increase [timeouts] navigation_secs (currently {})",
                    timeout
                ),
                "Check network connectivity".into(),
                "Verify the start URL is accessible".into(),
            ],
            Self::ElementTimeout { locator, .. } | Self::ElementNotFound { locator } => vec![
                format!("Check that '{}' still matches the site markup", locator),
                "Run with --headless false to watch the page".into(),
                "Adjust the locator in the [site] config section".into(),
            ],
            Self::DownloadTimeout { .. } => vec![
                "Increase the timeout with --download-timeout".into(),
                "Check that the export option still produces a file".into(),
                "Verify the download directory is writable".into(),
            ],
            Self::LockTimeout { .. } => vec![
                "Another process may be holding the downloaded file open".into(),
                "Increase [export] rename_attempts".into(),
            ],
            Self::ConfigError(_) | Self::InvalidLocator(_) => vec![
                "Check configuration file syntax".into(),
                "Run with --verbose to see detailed error".into(),
                "Use --config to specify a different config file".into(),
            ],
            Self::InvalidUrl(_) => vec![
                "Ensure URL includes protocol (http:// or https://)".into(),
                "Pass the search results URL with --url".into(),
            ],
            Self::InvalidPort(port) => vec![
                format!("Port {} is out of valid range (1024-65535)", port),
                "Use --port to specify a different port".into(),
            ],
            Self::RunAborted { .. } => vec![
                "A failed run must be restarted from page 1".into(),
                "Run with --verbose for more details".into(),
            ],
            _ => vec![
                "Run with --verbose for more details".into(),
                "Check the documentation for help".into(),
            ],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_) | Self::Connection(_) | Self::ConnectionLost => 3,
            Self::NavigationTimeout(_) | Self::DownloadTimeout { .. } => 4,
            Self::ElementTimeout { .. } | Self::ElementNotFound { .. } => 5,
            Self::IoError(_) | Self::LockTimeout { .. } => 6,
            Self::ConfigError(_)
            | Self::InvalidLocator(_)
            | Self::TomlDeError(_)
            | Self::TomlSerError(_)
            | Self::InvalidPort(_) => 7,
            Self::InvalidUrl(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_classified() {
        assert!(ExportError::NavigationTimeout(30).is_timeout());
        assert!(
            ExportError::ElementTimeout {
                locator: "css:#x".into(),
                secs: 20
            }
            .is_timeout()
        );
        assert!(!ExportError::EvaluationError("boom".into()).is_timeout());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExportError::InvalidUrl("x".into()).exit_code(), 2);
        assert_eq!(ExportError::LaunchFailed("x".into()).exit_code(), 3);
        assert_eq!(
            ExportError::DownloadTimeout {
                extension: "ris".into(),
                secs: 60
            }
            .exit_code(),
            4
        );
        assert_eq!(ExportError::ConfigError("x".into()).exit_code(), 7);
        assert_eq!(
            ExportError::RunAborted {
                page: 2,
                reason: "x".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_lock_timeout_message() {
        let err = ExportError::LockTimeout {
            path: PathBuf::from("/tmp/export.ris"),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "/tmp/export.ris still locked after 5 rename attempts"
        );
    }

    #[test]
    fn test_suggestions_not_empty() {
        let err = ExportError::ElementTimeout {
            locator: "css:input#checkbox-all".into(),
            secs: 20,
        };
        assert!(
            err.suggestions()
                .iter()
                .any(|s| s.contains("input#checkbox-all"))
        );
    }
}
