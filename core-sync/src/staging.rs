//! Staging directory operations.
//!
//! A sync mutates a copy of the live library and swaps it in at the end, so
//! the player never sees a half-updated directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use core_async::fs;
use core_runtime::logging::file_label;
use tracing::{debug, info, instrument};

use crate::codec;
use crate::error::{Result, SyncError};

/// Replaces `staging` with a fresh copy of `live` (or an empty directory
/// when there is no live library yet).
#[instrument(skip_all, fields(live = %file_label(live), staging = %file_label(staging)))]
pub async fn prepare_staging(live: &Path, staging: &Path) -> Result<()> {
    remove_dir_if_exists(staging)
        .await
        .map_err(|e| SyncError::Staging(format!("removing old staging directory: {}", e)))?;

    if fs::try_exists(live).await? {
        let copied = copy_tree(live, staging)
            .await
            .map_err(|e| SyncError::Staging(format!("copying library: {}", e)))?;
        info!(files = copied, "Staged copy of the library");
    } else {
        fs::create_dir_all(staging)
            .await
            .map_err(|e| SyncError::Staging(format!("creating staging directory: {}", e)))?;
        info!("No live library yet, staging from empty");
    }
    Ok(())
}

/// File names directly inside `dir`, sorted. Subdirectories are ignored.
pub async fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!(name = ?raw, "Skipping non UTF-8 file name"),
        }
    }
    names.sort();
    Ok(names)
}

/// Playable files in the live library, ordered by position prefix.
/// A missing directory yields an empty list.
pub async fn list_audio_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = match list_files(dir).await {
        Ok(names) => names,
        Err(SyncError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    names.retain(|name| codec::is_audio_file(name));
    names.sort_by_key(|name| (codec::position_of(name).unwrap_or(0), name.clone()));
    Ok(names)
}

/// Removes `live` and moves `staging` into its place.
#[instrument(skip_all, fields(live = %file_label(live), staging = %file_label(staging)))]
pub async fn swap_directories(staging: &Path, live: &Path) -> Result<()> {
    remove_dir_if_exists(live).await?;
    fs::rename(staging, live).await?;
    info!("Swapped in new library directory");
    Ok(())
}

async fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Recursive copy; returns the number of files copied.
async fn copy_tree(from: &Path, to: &Path) -> std::io::Result<usize> {
    let mut copied = 0;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((source, target)) = pending.pop() {
        fs::create_dir_all(&target).await?;
        let mut entries = fs::read_dir(&source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let destination = target.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), destination));
            } else {
                fs::copy(entry.path(), destination).await?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}
