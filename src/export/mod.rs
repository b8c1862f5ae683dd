//! Page-by-page export of search results to RIS files.
//!
//! Control flows from [`ExportRun`] into [`ExportOrchestrator`] once per page,
//! which composes [`PageActions`], [`DownloadWatcher`] and [`FileMaterializer`];
//! [`Paginator`] then moves the browser to the next results page.

pub mod actions;
pub mod materializer;
pub mod orchestrator;
pub mod pagination;
pub mod run_loop;
pub mod watcher;

use serde::Serialize;
use std::fmt;

pub use actions::{ConsentOutcome, PageActions};
pub use materializer::{FileMaterializer, RenameFn, destination_name};
pub use orchestrator::{ExportOrchestrator, ExportState};
pub use pagination::{PageAdvance, Paginator};
pub use run_loop::{ExportRun, RunReport, RunStage, RunStatus, SavedPage};
pub use watcher::{DirectorySnapshot, DownloadWatcher};

/// 1-based index of the results page being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PageCursor(u32);

impl PageCursor {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
