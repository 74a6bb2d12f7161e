//! Async subprocess support.
//!
//! External tools (downloader, transcoder) run as child processes awaited on
//! the runtime rather than blocking a worker thread.

pub use std::process::{ExitStatus, Output, Stdio};
pub use tokio::process::{Child, Command};

/// Renders the trailing part of a failed tool's stderr for error messages.
///
/// Keeps only the last `max_lines` non-empty lines, since tools like ffmpeg
/// print long banners before the actual failure.
pub fn stderr_tail(output: &Output, max_lines: usize) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
