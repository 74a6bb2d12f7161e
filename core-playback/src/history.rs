use std::collections::VecDeque;

/// Number of recent songs autoplay tries to avoid.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Bounded list of recently played filenames; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct RecentlyPlayed {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecentlyPlayed {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, filename: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(filename.into());
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.iter().any(|entry| entry == filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for RecentlyPlayed {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
