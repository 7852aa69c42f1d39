//! Rate-budgeted circular polling queue.
//!
//! Symbols rotate through a FIFO ring; each carries a polling cost (its
//! recent headline volume) and a skip flag. [`PollQueue::traverse`] selects
//! symbols round-robin until the configured budget threshold is nearly
//! spent, parking any single symbol too expensive for the remaining budget
//! in an overflow set for individual follow-up.
//!
//! All state lives behind one mutex, so a queue shared across tasks stays
//! consistent without external locking. Persistence is a small JSON file
//! written atomically (temp file then rename), so a crash mid-save never
//! leaves a truncated queue behind.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive lower bound for the budget threshold.
pub const MIN_THRESHOLD: u32 = 90;
/// Inclusive upper bound for the budget threshold.
pub const MAX_THRESHOLD: u32 = 100;
/// Traversal stops once the remaining budget drops to this margin or below.
const BUDGET_MARGIN: u32 = 5;

/// One entry in the polling rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollItem {
    pub symbol: String,
    /// Polling cost, derived from recent headline volume. Zero means
    /// "unknown"; selection still charges a minimum of one unit.
    #[serde(default)]
    pub cost: u32,
    /// Skipped items stay in rotation but are never selected.
    #[serde(default)]
    pub skip: bool,
}

impl PollItem {
    /// Builds a fresh entry with unknown cost and the skip flag clear.
    /// The symbol is canonicalized (trimmed, uppercased).
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: newswire_core::canonical_symbol(symbol),
            cost: 0,
            skip: false,
        }
    }

    /// Builds an entry with an explicit cost and skip state, canonicalizing
    /// the symbol. Used when restoring or seeding with known state.
    #[must_use]
    pub fn with_state(symbol: &str, cost: u32, skip: bool) -> Self {
        Self {
            symbol: newswire_core::canonical_symbol(symbol),
            cost,
            skip,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(
        "budget threshold must be between {MIN_THRESHOLD} and {MAX_THRESHOLD} inclusive, got {value}"
    )]
    InvalidThreshold { value: u32 },

    #[error("failed to access queue file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed queue file {path}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Mutable queue state, guarded by the mutex in [`PollQueue`].
#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<PollItem>,
    /// Budget consumed by the traversal in progress (or just finished).
    cumulative_cost: u32,
    /// Symbols whose cost exceeded the remaining budget during the last
    /// traversal. Each appears at most once.
    overflow: Vec<String>,
    /// Symbols already selected during the traversal in progress. Guards
    /// against charging the same symbol twice in one pass.
    staged: Vec<String>,
}

/// On-disk representation. `maxsize` and `threshold` travel with the items
/// so a reload reconstructs the queue's configuration, not just its contents.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedQueue {
    maxsize: usize,
    threshold: u32,
    items: Vec<PollItem>,
}

/// Bounded circular queue with per-item polling cost and a budget threshold.
#[derive(Debug)]
pub struct PollQueue {
    inner: Mutex<Inner>,
    threshold: u32,
    /// Maximum number of entries; zero means unbounded.
    maxsize: usize,
}

impl PollQueue {
    /// Creates an empty unbounded queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidThreshold`] if `threshold` falls outside
    /// `[MIN_THRESHOLD, MAX_THRESHOLD]`.
    pub fn new(threshold: u32) -> Result<Self, QueueError> {
        Self::with_maxsize(0, threshold)
    }

    /// Creates an empty queue holding at most `maxsize` entries (zero for
    /// unbounded).
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidThreshold`] if `threshold` falls outside
    /// `[MIN_THRESHOLD, MAX_THRESHOLD]`.
    pub fn with_maxsize(maxsize: usize, threshold: u32) -> Result<Self, QueueError> {
        validate_threshold(threshold)?;
        Ok(Self {
            inner: Mutex::new(Inner::default()),
            threshold,
            maxsize,
        })
    }

    /// Restores a queue from a file previously written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// - [`QueueError::Io`] — the file cannot be read.
    /// - [`QueueError::Malformed`] — the file is not a valid queue snapshot.
    /// - [`QueueError::InvalidThreshold`] — the persisted threshold is out
    ///   of range.
    pub fn load(path: &Path) -> Result<Self, QueueError> {
        let raw = fs::read_to_string(path).map_err(|e| QueueError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let persisted: PersistedQueue =
            serde_json::from_str(&raw).map_err(|e| QueueError::Malformed {
                path: path.display().to_string(),
                source: e,
            })?;

        let queue = Self::with_maxsize(persisted.maxsize, persisted.threshold)?;
        {
            let mut inner = queue.lock();
            for item in persisted.items {
                if !inner.items.iter().any(|i| i.symbol == item.symbol) {
                    inner.items.push_back(item);
                }
            }
        }
        Ok(queue)
    }

    /// Writes the queue to `path` atomically: the snapshot goes to a
    /// temporary file in the same directory, then replaces the target with
    /// a rename.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the directory, temp file, or rename
    /// fails.
    pub fn save(&self, path: &Path) -> Result<(), QueueError> {
        let persisted = {
            let inner = self.lock();
            PersistedQueue {
                maxsize: self.maxsize,
                threshold: self.threshold,
                items: inner.items.iter().cloned().collect(),
            }
        };

        let io_err = |e: std::io::Error| QueueError::Io {
            path: path.display().to_string(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        // serde_json::to_vec on a plain struct cannot fail, but the error
        // type forces handling anyway.
        let body = serde_json::to_vec_pretty(&persisted).map_err(|e| QueueError::Malformed {
            path: path.display().to_string(),
            source: e,
        })?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Budget threshold this queue traverses against by default.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Budget consumed by the most recent traversal (zero after a traversal
    /// that reached the threshold, or after a reset).
    #[must_use]
    pub fn cumulative_cost(&self) -> u32 {
        self.lock().cumulative_cost
    }

    /// Symbols parked during the last traversal because their cost exceeded
    /// the remaining budget.
    #[must_use]
    pub fn overflow(&self) -> Vec<String> {
        self.lock().overflow.clone()
    }

    /// Adds a symbol to the back of the rotation. Returns `false` without
    /// modifying the queue if the symbol is already present or the queue is
    /// full.
    pub fn enqueue(&self, item: PollItem) -> bool {
        let mut inner = self.lock();
        if inner.items.iter().any(|i| i.symbol == item.symbol) {
            return false;
        }
        if self.maxsize > 0 && inner.items.len() >= self.maxsize {
            return false;
        }
        inner.items.push_back(item);
        true
    }

    /// Enqueues each item in order, skipping duplicates. Returns how many
    /// were actually added.
    pub fn bulk_enqueue(&self, items: impl IntoIterator<Item = PollItem>) -> usize {
        items.into_iter().filter(|i| self.enqueue(i.clone())).count()
    }

    /// Removes and returns the front item, or `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<PollItem> {
        self.lock().items.pop_front()
    }

    /// Current rotation order, front first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PollItem> {
        self.lock().items.iter().cloned().collect()
    }

    /// Returns `true` if `symbol` (canonicalized) is in the rotation.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = newswire_core::canonical_symbol(symbol);
        self.lock().items.iter().any(|i| i.symbol == symbol)
    }

    /// Sets the skip flag on `symbol`. Returns `false` if the symbol is not
    /// in the rotation.
    pub fn set_skip(&self, symbol: &str, skip: bool) -> bool {
        let symbol = newswire_core::canonical_symbol(symbol);
        let mut inner = self.lock();
        match inner.items.iter_mut().find(|i| i.symbol == symbol) {
            Some(item) => {
                item.skip = skip;
                true
            }
            None => false,
        }
    }

    /// Sets the polling cost on `symbol`. Returns `false` if the symbol is
    /// not in the rotation.
    pub fn set_cost(&self, symbol: &str, cost: u32) -> bool {
        let symbol = newswire_core::canonical_symbol(symbol);
        let mut inner = self.lock();
        match inner.items.iter_mut().find(|i| i.symbol == symbol) {
            Some(item) => {
                item.cost = cost;
                true
            }
            None => false,
        }
    }

    /// Rotates through the queue looking for the next selectable symbol.
    ///
    /// Every examined item returns to the back of the rotation, so one full
    /// call visits each item at most once and leaves the ring intact.
    /// Skipped items and items already selected in the current traversal
    /// are passed over silently. An item whose cost meets or exceeds
    /// `max_cost` is recorded in the overflow set (once) and passed over.
    /// A selected item charges `max(cost, 1)` against the cumulative cost,
    /// so unknown-cost symbols still consume budget.
    ///
    /// Returns `None` when no item qualifies within `max_cost`.
    pub fn select_next(&self, max_cost: u32) -> Option<String> {
        if max_cost == 0 {
            return None;
        }
        let mut inner = self.lock();
        let rotation = inner.items.len();
        for _ in 0..rotation {
            let Some(item) = inner.items.pop_front() else {
                break;
            };
            if item.skip || inner.staged.contains(&item.symbol) {
                inner.items.push_back(item);
                continue;
            }
            if item.cost >= max_cost {
                if !inner.overflow.contains(&item.symbol) {
                    inner.overflow.push(item.symbol.clone());
                }
                inner.items.push_back(item);
                continue;
            }
            inner.cumulative_cost += item.cost.max(1);
            let symbol = item.symbol.clone();
            inner.staged.push(symbol.clone());
            inner.items.push_back(item);
            return Some(symbol);
        }
        None
    }

    /// Selects a batch of symbols for one polling pass.
    ///
    /// Resets the cumulative cost and overflow set, then repeatedly selects
    /// the next affordable symbol until the remaining budget drops to a
    /// small safety margin or nothing else qualifies. Afterwards the
    /// overflow set holds every symbol that was scanned but could not fit.
    ///
    /// An empty queue yields an empty batch. If the traversal spends the
    /// whole threshold, the cumulative cost resets to zero so the next pass
    /// starts fresh.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidThreshold`] if `threshold_override` is
    /// out of range.
    pub fn traverse(&self, threshold_override: Option<u32>) -> Result<Vec<String>, QueueError> {
        let threshold = match threshold_override {
            Some(value) => {
                validate_threshold(value)?;
                value
            }
            None => self.threshold,
        };

        {
            let mut inner = self.lock();
            inner.cumulative_cost = 0;
            inner.overflow.clear();
            inner.staged.clear();
            if inner.items.is_empty() {
                return Ok(Vec::new());
            }
        }

        let mut selected = Vec::new();
        loop {
            let remaining = threshold.saturating_sub(self.cumulative_cost());
            if remaining <= BUDGET_MARGIN {
                break;
            }
            match self.select_next(remaining) {
                Some(symbol) => selected.push(symbol),
                None => break,
            }
        }

        {
            let mut inner = self.lock();
            if inner.cumulative_cost >= threshold {
                inner.cumulative_cost = 0;
            }
        }

        Ok(selected)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the queue data itself stays structurally valid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_threshold(value: u32) -> Result<(), QueueError> {
    if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
        return Err(QueueError::InvalidThreshold { value });
    }
    Ok(())
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
