//! Autoplay track selection.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::history::RecentlyPlayed;

/// Random draws before giving up on avoiding the history.
pub const MAX_PICK_ATTEMPTS: usize = 50;

/// Picks the next song uniformly from `library`, avoiding `history`.
///
/// When the library has no more distinct songs than the history holds, any
/// pick is accepted. After [`MAX_PICK_ATTEMPTS`] misses the pick is
/// unconstrained. Returns `None` only for an empty library.
pub fn select_next<R>(library: &[String], history: &RecentlyPlayed, rng: &mut R) -> Option<String>
where
    R: Rng + ?Sized,
{
    let distinct = library.iter().collect::<HashSet<_>>().len();
    let unconstrained = distinct <= history.len();

    for _ in 0..MAX_PICK_ATTEMPTS {
        let candidate = library.choose(rng)?;
        if unconstrained || !history.contains(candidate) {
            return Some(candidate.clone());
        }
    }
    library.choose(rng).cloned()
}
