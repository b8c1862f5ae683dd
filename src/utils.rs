use crate::{ExportError, Result};
use std::path::PathBuf;

pub fn find_chrome_executable() -> Result<PathBuf> {
    if let Some(path) = standard_locations().into_iter().find(|p| p.exists()) {
        return Ok(path);
    }

    if let Some(path) = find_in_path() {
        return Ok(path);
    }

    Err(ExportError::LaunchFailed(
        "Could not find Chrome/Chromium executable. Please specify with --chrome-path".into(),
    ))
}

#[cfg(target_os = "macos")]
fn standard_locations() -> Vec<PathBuf> {
    [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "linux")]
fn standard_locations() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "windows")]
fn standard_locations() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(local) = dirs::data_local_dir() {
        paths.push(local.join(r"Google\Chrome\Application\chrome.exe"));
    }

    paths
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn standard_locations() -> Vec<PathBuf> {
    Vec::new()
}

fn find_in_path() -> Option<PathBuf> {
    let binaries: &[&str] = if cfg!(windows) {
        &["chrome.exe", "chromium.exe"]
    } else {
        &["google-chrome", "chromium", "chromium-browser", "chrome"]
    };

    binaries.iter().find_map(|binary| which::which(binary).ok())
}

/// Process-wide stop request raised by Ctrl-C / SIGTERM.
///
/// The run loop polls [`is_shutdown`](signal::is_shutdown) between pages, so an
/// interrupt never cuts a page export in half and teardown still runs.
pub mod signal {
    use std::sync::atomic::{AtomicBool, Ordering};

    static SHUTDOWN: AtomicBool = AtomicBool::new(false);

    pub fn is_shutdown() -> bool {
        SHUTDOWN.load(Ordering::Relaxed)
    }

    pub fn set_shutdown() {
        SHUTDOWN.store(true, Ordering::Relaxed);
    }

    pub fn setup_handlers() -> crate::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::warn!("Received SIGINT, stopping after the current page");
                    }
                    _ = sigterm.recv() => {
                        tracing::warn!("Received SIGTERM, stopping after the current page");
                    }
                }
                set_shutdown();
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Received Ctrl+C, stopping after the current page");
                    set_shutdown();
                }
            });
        }

        Ok(())
    }
}
