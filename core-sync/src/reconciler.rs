//! # Reconciler
//!
//! Diffs the remote playlist against the staged library and produces the
//! ordered list of edits that turns the staging directory into the ideal
//! state.
//!
//! ## Algorithm
//!
//! 1. Derive the ideal filenames from the playlist and split them by content
//!    key into *unique* keys and *duplicate* keys (two or more tracks with the
//!    same sanitized title).
//! 2. Unique keys: a staged file whose key is not wanted is deleted; a staged
//!    file whose key is wanted under a different filename is renamed, unless
//!    the target name is already taken, in which case the stale copy is
//!    deleted.
//! 3. Duplicate keys: matched by exact filename only. A staged file with a
//!    duplicate key that is not one of the ideal filenames is deleted; such
//!    files are never renamed.
//! 4. Every ideal filename missing from the listing as it will look after the
//!    queued deletes and renames gets a download.
//! 5. One final directory swap.
//!
//! Files without a numeric position prefix are not managed and are left
//! alone.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use bridge_traits::playlist::PlaylistTrack;

use crate::action::EditAction;
use crate::codec;

/// One wanted library file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdealEntry {
    pub filename: String,
    pub content_key: String,
    pub query: String,
}

impl IdealEntry {
    fn from_track(track: &PlaylistTrack) -> Self {
        Self {
            filename: codec::encode(track),
            content_key: codec::content_key(track),
            query: codec::search_query(track),
        }
    }

    /// Filename without the `.mp3` extension.
    pub fn stem(&self) -> &str {
        codec::display_stem(&self.filename)
    }
}

/// Ideal library contents derived from the playlist.
#[derive(Debug, Clone, Default)]
pub struct IdealState {
    /// Playlist order.
    entries: Vec<IdealEntry>,
    /// Content key to ideal filename, for keys owned by exactly one track.
    unique: HashMap<String, String>,
    duplicate_keys: HashSet<String>,
    duplicate_filenames: HashSet<String>,
}

impl IdealState {
    pub fn from_tracks(tracks: &[PlaylistTrack]) -> Self {
        let entries: Vec<IdealEntry> = tracks.iter().map(IdealEntry::from_track).collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in &entries {
            *counts.entry(entry.content_key.as_str()).or_default() += 1;
        }

        let mut unique = HashMap::new();
        let mut duplicate_keys = HashSet::new();
        let mut duplicate_filenames = HashSet::new();
        for entry in &entries {
            if counts[entry.content_key.as_str()] > 1 {
                duplicate_keys.insert(entry.content_key.clone());
                duplicate_filenames.insert(entry.filename.clone());
            } else {
                unique.insert(entry.content_key.clone(), entry.filename.clone());
            }
        }

        Self {
            entries,
            unique,
            duplicate_keys,
            duplicate_filenames,
        }
    }

    pub fn entries(&self) -> &[IdealEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ideal filename for a content key owned by a single track.
    pub fn unique_filename(&self, content_key: &str) -> Option<&str> {
        self.unique.get(content_key).map(String::as_str)
    }

    pub fn is_duplicate_key(&self, content_key: &str) -> bool {
        self.duplicate_keys.contains(content_key)
    }

    pub fn is_ideal_duplicate(&self, filename: &str) -> bool {
        self.duplicate_filenames.contains(filename)
    }
}

/// Ordered edits for one sync plus counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub actions: Vec<EditAction>,
    pub deletes: u32,
    pub renames: u32,
    pub downloads: u32,
}

impl SyncPlan {
    /// True when the plan only swaps the directories.
    pub fn is_noop(&self) -> bool {
        self.deletes == 0 && self.renames == 0 && self.downloads == 0
    }
}

/// Computes [`SyncPlan`]s for one staging/live directory pair.
#[derive(Debug, Clone)]
pub struct Reconciler {
    staging: PathBuf,
    live: PathBuf,
}

impl Reconciler {
    pub fn new(staging: impl Into<PathBuf>, live: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
            live: live.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Plans the edits for `tracks` against the staged `listing`
    /// (file names only).
    pub fn plan(&self, tracks: &[PlaylistTrack], listing: &[String]) -> SyncPlan {
        let ideal = IdealState::from_tracks(tracks);
        let mut plan = SyncPlan::default();

        let physical: BTreeSet<&str> = listing.iter().map(String::as_str).collect();
        let mut projected: HashSet<String> = physical.iter().map(|s| s.to_string()).collect();

        // Unique keys
        for &filename in &physical {
            let Some(decoded) = codec::decode(filename) else {
                continue;
            };
            if ideal.is_duplicate_key(&decoded.content_key) {
                continue;
            }

            match ideal.unique_filename(&decoded.content_key) {
                None => self.delete(&mut plan, &mut projected, filename),
                Some(target) if target == filename => {}
                Some(target) if projected.contains(target) => {
                    self.delete(&mut plan, &mut projected, filename)
                }
                Some(target) => {
                    projected.remove(filename);
                    projected.insert(target.to_string());
                    plan.actions.push(EditAction::Rename {
                        from: self.staging.join(filename),
                        to: self.staging.join(target),
                    });
                    plan.renames += 1;
                }
            }
        }

        // Duplicate keys: exact filename match only
        for &filename in &physical {
            let Some(decoded) = codec::decode(filename) else {
                continue;
            };
            if ideal.is_duplicate_key(&decoded.content_key) && !ideal.is_ideal_duplicate(filename)
            {
                self.delete(&mut plan, &mut projected, filename);
            }
        }

        for entry in ideal.entries() {
            if !projected.contains(&entry.filename) {
                plan.actions.push(EditAction::Download {
                    query: entry.query.clone(),
                    destination: self.staging.join(entry.stem()),
                });
                plan.downloads += 1;
            }
        }

        plan.actions.push(EditAction::SwapDirectories {
            staging: self.staging.clone(),
            live: self.live.clone(),
        });
        plan
    }

    fn delete(&self, plan: &mut SyncPlan, projected: &mut HashSet<String>, filename: &str) {
        projected.remove(filename);
        plan.actions.push(EditAction::Delete {
            path: self.staging.join(filename),
        });
        plan.deletes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, position: u32) -> PlaylistTrack {
        PlaylistTrack {
            title: title.to_string(),
            artists: vec!["Artist".to_string()],
            duration_ms: 1000,
            album_art_url: None,
            added_by: None,
            position,
        }
    }

    fn listing(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new("songs_temp", "songs")
    }

    fn staged(name: &str) -> PathBuf {
        Path::new("songs_temp").join(name)
    }

    fn swap() -> EditAction {
        EditAction::SwapDirectories {
            staging: PathBuf::from("songs_temp"),
            live: PathBuf::from("songs"),
        }
    }

    #[test]
    fn test_ideal_state_partitions_duplicates() {
        let ideal = IdealState::from_tracks(&[
            track("Song A", 1),
            track("Song B", 2),
            track("Song A", 3),
        ]);

        assert_eq!(ideal.len(), 3);
        assert_eq!(ideal.unique_filename("Song B"), Some("2 - Song B.mp3"));
        assert_eq!(ideal.unique_filename("Song A"), None);
        assert!(ideal.is_duplicate_key("Song A"));
        assert!(ideal.is_ideal_duplicate("1 - Song A.mp3"));
        assert!(ideal.is_ideal_duplicate("3 - Song A.mp3"));
        assert!(!ideal.is_ideal_duplicate("2 - Song A.mp3"));
    }

    #[test]
    fn test_ideal_library_yields_only_swap() {
        let tracks = [track("Song A", 1), track("Song B", 2), track("Song A", 3)];
        let names = listing(&["1 - Song A.mp3", "2 - Song B.mp3", "3 - Song A.mp3"]);

        let plan = reconciler().plan(&tracks, &names);

        assert!(plan.is_noop());
        assert_eq!(plan.actions, vec![swap()]);
    }

    #[test]
    fn test_moved_track_is_renamed_not_redownloaded() {
        let plan = reconciler().plan(&[track("Old Title", 5)], &listing(&["3 - Old Title.mp3"]));

        assert_eq!(
            plan.actions,
            vec![
                EditAction::Rename {
                    from: staged("3 - Old Title.mp3"),
                    to: staged("5 - Old Title.mp3"),
                },
                swap(),
            ]
        );
        assert_eq!((plan.deletes, plan.renames, plan.downloads), (0, 1, 0));
    }

    #[test]
    fn test_removed_track_is_deleted() {
        let plan = reconciler().plan(
            &[track("Keep", 1)],
            &listing(&["1 - Keep.mp3", "2 - Gone.mp3"]),
        );

        assert_eq!(
            plan.actions,
            vec![
                EditAction::Delete {
                    path: staged("2 - Gone.mp3")
                },
                swap()
            ]
        );
    }

    #[test]
    fn test_duplicate_titles_download_each_exact_name() {
        let plan = reconciler().plan(&[track("Song A", 1), track("Song A", 2)], &[]);

        assert_eq!(
            plan.actions,
            vec![
                EditAction::Download {
                    query: "Song A by Artist audio".to_string(),
                    destination: staged("1 - Song A"),
                },
                EditAction::Download {
                    query: "Song A by Artist audio".to_string(),
                    destination: staged("2 - Song A"),
                },
                swap(),
            ]
        );
    }

    #[test]
    fn test_duplicates_are_never_renamed() {
        // "Song A" moved from positions 1/2 to 2/3.
        let plan = reconciler().plan(
            &[track("Intro", 1), track("Song A", 2), track("Song A", 3)],
            &listing(&["1 - Song A.mp3", "2 - Song A.mp3"]),
        );

        assert!(!plan
            .actions
            .iter()
            .any(|a| matches!(a, EditAction::Rename { .. })));
        assert!(plan.actions.contains(&EditAction::Delete {
            path: staged("1 - Song A.mp3")
        }));
        assert!(!plan.actions.contains(&EditAction::Delete {
            path: staged("2 - Song A.mp3")
        }));
        assert_eq!(plan.downloads, 2); // "1 - Intro" and "3 - Song A"
    }

    #[test]
    fn test_rename_onto_existing_name_deletes_stale_copy() {
        let plan = reconciler().plan(
            &[track("Song", 4)],
            &listing(&["2 - Song.mp3", "4 - Song.mp3", "9 - Song.mp3"]),
        );

        assert_eq!(
            plan.actions,
            vec![
                EditAction::Delete {
                    path: staged("2 - Song.mp3")
                },
                EditAction::Delete {
                    path: staged("9 - Song.mp3")
                },
                swap(),
            ]
        );
    }

    #[test]
    fn test_two_stale_copies_rename_once() {
        let plan = reconciler().plan(
            &[track("Song", 7)],
            &listing(&["2 - Song.mp3", "3 - Song.mp3"]),
        );

        assert_eq!(
            plan.actions,
            vec![
                EditAction::Rename {
                    from: staged("2 - Song.mp3"),
                    to: staged("7 - Song.mp3"),
                },
                EditAction::Delete {
                    path: staged("3 - Song.mp3")
                },
                swap(),
            ]
        );
    }

    #[test]
    fn test_partial_downloads_are_cleaned_up() {
        let plan = reconciler().plan(&[track("X", 4)], &listing(&["4 - X.mp3.part"]));

        assert_eq!(plan.deletes, 1);
        assert_eq!(plan.downloads, 1);
        assert_eq!(
            plan.actions[0],
            EditAction::Delete {
                path: staged("4 - X.mp3.part")
            }
        );
    }

    #[test]
    fn test_unmanaged_files_are_untouched() {
        let plan = reconciler().plan(&[track("A", 1)], &listing(&["1 - A.mp3", "cover.jpg"]));
        assert_eq!(plan.actions, vec![swap()]);
    }

    #[test]
    fn test_download_count_matches_missing_names() {
        let tracks: Vec<_> = (1..=6).map(|i| track(&format!("T{}", i), i)).collect();
        let names = listing(&["1 - T1.mp3", "4 - T3.mp3", "6 - T6.mp3"]);

        let plan = reconciler().plan(&tracks, &names);

        // T3 is renamed to position 3; T2, T4 and T5 are missing.
        assert_eq!(plan.renames, 1);
        assert_eq!(plan.downloads, 3);
        let downloads: Vec<_> = plan
            .actions
            .iter()
            .filter_map(|a| match a {
                EditAction::Download { destination, .. } => Some(destination.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            downloads,
            vec![staged("2 - T2"), staged("4 - T4"), staged("5 - T5")]
        );
    }

    #[test]
    fn test_swap_is_always_last() {
        let plan = reconciler().plan(
            &[track("A", 1), track("B", 2)],
            &listing(&["5 - A.mp3", "7 - Z.mp3"]),
        );
        assert_eq!(plan.actions.last(), Some(&swap()));
        assert_eq!(
            plan.actions
                .iter()
                .filter(|a| matches!(a, EditAction::SwapDirectories { .. }))
                .count(),
            1
        );
    }
}
