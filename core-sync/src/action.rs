//! Deferred library and UI edits.

use std::fmt;
use std::path::PathBuf;

use core_runtime::logging::file_label;

use crate::download::DownloadReport;

/// One deferred mutation, applied only by the edit-queue consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    Delete {
        path: PathBuf,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
    },
    /// `destination` has no extension; the downloader appends `.mp3`.
    Download {
        query: String,
        destination: PathBuf,
    },
    /// Replace `live` with `staging`. Always the last action of a sync.
    SwapDirectories {
        staging: PathBuf,
        live: PathBuf,
    },
    RefreshStatus,
}

impl EditAction {
    pub fn kind(&self) -> &'static str {
        match self {
            EditAction::Delete { .. } => "delete",
            EditAction::Rename { .. } => "rename",
            EditAction::Download { .. } => "download",
            EditAction::SwapDirectories { .. } => "swap",
            EditAction::RefreshStatus => "refresh_status",
        }
    }

    pub fn is_download(&self) -> bool {
        matches!(self, EditAction::Download { .. })
    }
}

/// File names only, so the rendering is safe to log.
impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditAction::Delete { path } => write!(f, "delete {}", file_label(path)),
            EditAction::Rename { from, to } => {
                write!(f, "rename {} -> {}", file_label(from), file_label(to))
            }
            EditAction::Download { query, destination } => {
                write!(f, "download '{}' -> {}", query, file_label(destination))
            }
            EditAction::SwapDirectories { staging, live } => {
                write!(f, "swap {} -> {}", file_label(staging), file_label(live))
            }
            EditAction::RefreshStatus => f.write_str("refresh status"),
        }
    }
}

/// Result of applying one [`EditAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Nothing to do, e.g. the file was already gone.
    Skipped(String),
    /// Deliberately not applied now; a later sync redoes it.
    Deferred(String),
    Downloaded(DownloadReport),
}
