//! Async filesystem helpers re-exported from tokio.
//!
//! Library staging, swaps and the document store all go through these calls so
//! no blocking `std::fs` work runs on the event loop.

pub use tokio::fs::{
    copy, create_dir, create_dir_all, metadata, read, read_dir, read_to_string, remove_dir_all,
    remove_file, rename, try_exists, write, DirEntry, File, OpenOptions,
};
