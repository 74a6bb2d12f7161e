//! # Playlist Sync Module
//!
//! Mirrors the remote playlist into the local song library.
//!
//! ## Overview
//!
//! A sync cycle reads the playlist, stages a copy of the library, computes the
//! minimal set of deletes, renames and downloads that turns the staged copy
//! into the playlist's ideal state, and swaps the result in. Every mutation is
//! an [`EditAction`] applied by the single [`EditQueueConsumer`].
//!
//! ## Components
//!
//! - **Filename codec** (`codec`): `"<position> - <title>.mp3"` names
//! - **Reconciler** (`reconciler`): pure planning from playlist + listing
//! - **Edit queue** (`edit_queue`): FIFO, drained every few seconds
//! - **Download worker** (`download`): bounded fetch pool
//! - **Post-processor** (`post_process`): silence trim + loudness normalization
//! - **Executor** (`executor`): applies edits to the filesystem
//! - **Coordinator** (`coordinator`): one end-to-end cycle
//! - **Catalog** (`catalog`): the playlist as of the last sync
//! - **Library gate** (`gate`): keeps the player out of the library during a swap

pub mod action;
pub mod catalog;
pub mod codec;
pub mod coordinator;
pub mod download;
pub mod edit_queue;
pub mod error;
pub mod executor;
pub mod gate;
pub mod post_process;
pub mod reconciler;
pub mod staging;

pub use action::{EditAction, EditOutcome};
pub use catalog::TrackCatalog;
pub use coordinator::{
    PostponeReason, SwapStatus, SyncCoordinator, SyncOutcome, SyncReport, SyncTrigger,
};
pub use download::{DownloadReport, DownloadWorker};
pub use edit_queue::{BatchReport, EditExecutor, EditQueue, EditQueueConsumer, EditTicket};
pub use error::{Result, SyncError};
pub use executor::{LibraryEditExecutor, PlaybackProbe, RefreshOutcome, StatusRefresher};
pub use gate::LibraryGate;
pub use post_process::{
    LoudnessTarget, PostProcessConfig, PostProcessOutcome, PostProcessor, SilenceTrim,
};
pub use reconciler::{IdealEntry, IdealState, Reconciler, SyncPlan};
