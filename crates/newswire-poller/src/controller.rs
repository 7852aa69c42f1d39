//! The polling controller: drives the queue, the provider, and storage.
//!
//! One cycle refreshes skip flags from fingerprints, asks the queue for a
//! budgeted batch, fetches the whole batch in a single provider call,
//! dedupes and stores per symbol, then individually follows up on symbols
//! the budget rejected. A session repeats cycles until the queue yields
//! nothing or a wall-clock ceiling is hit, persisting the queue on every
//! exit path.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use newswire_core::{canonical_symbol, Headline};

use crate::activity::ActivityLog;
use crate::queue::PollQueue;
use crate::source::HeadlineSource;
use crate::store::HeadlineStore;

/// How many recent stored rows to dedupe new fetches against.
const DEDUP_WINDOW: i64 = 100;
/// Per-item cost bounds; the provider export caps out near 100 rows.
const MAX_COST: u32 = 100;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Where the queue snapshot persists between runs.
    pub queue_path: PathBuf,
    /// Where the recent-activity log lives.
    pub activity_path: PathBuf,
    /// Pause between provider requests.
    pub rate_limit: Duration,
    /// Wall-clock ceiling for one polling session.
    pub session_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_path: PathBuf::from("state/poll_queue.json"),
            activity_path: PathBuf::from("state/activity.log"),
            rate_limit: Duration::from_secs(5),
            session_max: Duration::from_secs(4 * 60 * 60),
        }
    }
}

/// What one cycle accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Symbols the traversal selected (batch plus none of the overflow).
    pub selected: usize,
    /// Symbols that received at least one newly stored row.
    pub updated: u64,
}

/// What a whole session accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub cycles: u32,
    pub symbols_updated: u64,
    /// True when the session ended on the stop flag rather than coverage
    /// or the time ceiling.
    pub interrupted: bool,
}

/// Polling loop over a [`HeadlineSource`] and a [`HeadlineStore`].
pub struct Controller<S, St> {
    source: S,
    store: St,
    queue: PollQueue,
    activity: ActivityLog,
    config: ControllerConfig,
    /// Cached fingerprints (ticker → last stored news URL), hydrated from
    /// the store at init and updated after every successful symbol pass.
    fingerprints: HashMap<String, String>,
    /// The provider's listing, fetched lazily once per process.
    listing: Option<HashMap<String, String>>,
    stop: Arc<AtomicBool>,
}

impl<S: HeadlineSource, St: HeadlineStore> Controller<S, St> {
    /// Builds a controller, hydrating the fingerprint cache from the store.
    ///
    /// # Errors
    ///
    /// Fails if the fingerprint cache cannot be loaded.
    pub async fn init(
        source: S,
        store: St,
        queue: PollQueue,
        config: ControllerConfig,
        stop: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let fingerprints = store.load_fingerprints().await?;
        debug!(cached = fingerprints.len(), "fingerprint cache hydrated");
        let activity = ActivityLog::new(&config.activity_path);
        Ok(Self {
            source,
            store,
            queue,
            activity,
            config,
            fingerprints,
            listing: None,
            stop,
        })
    }

    #[must_use]
    pub fn queue(&self) -> &PollQueue {
        &self.queue
    }

    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Runs polling cycles until the queue yields nothing, the session
    /// ceiling passes, or the stop flag is raised. The queue is persisted
    /// before every exit path.
    ///
    /// # Errors
    ///
    /// Fails only on queue persistence errors; provider and storage
    /// failures are logged per symbol and do not end the session.
    pub async fn run_session(&mut self) -> anyhow::Result<SessionSummary> {
        let started = Instant::now();
        let mut summary = SessionSummary::default();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!("stop requested, ending session");
                summary.interrupted = true;
                break;
            }
            if started.elapsed() >= self.config.session_max {
                info!(
                    elapsed_secs = started.elapsed().as_secs(),
                    "session ceiling reached"
                );
                break;
            }

            let outcome = self.run_cycle().await?;
            summary.cycles += 1;
            summary.symbols_updated += outcome.updated;

            if outcome.selected == 0 {
                info!(cycles = summary.cycles, "queue exhausted, full coverage");
                break;
            }
            tokio::time::sleep(self.config.rate_limit).await;
        }

        self.queue.save(&self.config.queue_path)?;
        Ok(summary)
    }

    /// Runs one polling cycle: skip refresh, budgeted batch fetch, then the
    /// individual overflow pass.
    ///
    /// # Errors
    ///
    /// Fails only on queue persistence errors raised outside the per-symbol
    /// isolation (traversal itself cannot fail with the configured
    /// threshold).
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleOutcome> {
        if let Err(e) = self.refresh_skip_status().await {
            // No listing means no skips, which is the conservative default.
            warn!(error = %e, "skip refresh failed, polling everything");
        }

        let batch = self.queue.traverse(None)?;
        if batch.is_empty() {
            return Ok(CycleOutcome {
                selected: 0,
                updated: 0,
            });
        }
        info!(batch = batch.len(), "polling batch selected");

        let mut updated = 0u64;
        match self.source.fetch_headlines(&batch).await {
            Ok(rows) => {
                let mut by_symbol: HashMap<String, Vec<Headline>> = HashMap::new();
                for row in rows {
                    by_symbol.entry(row.ticker.clone()).or_default().push(row);
                }
                for symbol in &batch {
                    if self.stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let rows = by_symbol.get(symbol).map_or(&[][..], Vec::as_slice);
                    match self.store_rows_for(symbol, rows).await {
                        Ok(written) if written > 0 => updated += 1,
                        Ok(_) => {}
                        Err(e) => warn!(symbol = %symbol, error = %e, "symbol update failed, continuing"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "batch fetch failed, cycle makes no progress"),
        }

        // Budget-rejected symbols get their own fetch each, since they were
        // excluded precisely for being too big to share the batch.
        for symbol in self.queue.overflow() {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.config.rate_limit).await;
            match self.poll_single(&symbol).await {
                Ok(written) if written > 0 => updated += 1,
                Ok(_) => {}
                Err(e) => warn!(symbol = %symbol, error = %e, "overflow fetch failed, continuing"),
            }
        }

        Ok(CycleOutcome {
            selected: batch.len(),
            updated,
        })
    }

    /// Fetches and stores one symbol outside the batch path.
    async fn poll_single(&mut self, symbol: &str) -> anyhow::Result<u64> {
        let batch = [symbol.to_string()];
        let rows = self.source.fetch_headlines(&batch).await?;
        let rows: Vec<Headline> = rows.into_iter().filter(|r| r.ticker == symbol).collect();
        self.store_rows_for(symbol, &rows).await
    }

    /// Dedupes, stores, and accounts for one symbol's fetched rows, then
    /// persists the queue so a crash loses at most this symbol's progress.
    ///
    /// `rows` must already be filtered to this symbol. Returns how many new
    /// rows were written.
    async fn store_rows_for(&mut self, symbol: &str, rows: &[Headline]) -> anyhow::Result<u64> {
        self.store.ensure_symbol(symbol).await?;
        let stored = self.store.recent_urls(symbol, DEDUP_WINDOW).await?;
        let fresh = dedupe(rows, &stored);

        let written = if fresh.is_empty() {
            0
        } else {
            self.store.append_headlines(symbol, &fresh).await?
        };
        if written > 0 {
            if let Err(e) = self.activity.record(symbol, written) {
                warn!(symbol = %symbol, error = %e, "activity log write failed");
            }
        }

        // Cost reflects fetch volume, not stored volume: it must move even
        // when every row deduped away.
        self.queue.set_cost(symbol, daily_cost(rows));

        if let Some(url) = self
            .listing
            .as_ref()
            .and_then(|l| l.get(symbol))
            .cloned()
        {
            self.store.upsert_fingerprint(symbol, &url).await?;
            self.fingerprints.insert(symbol.to_string(), url);
        }

        self.queue.save(&self.config.queue_path)?;
        debug!(symbol = %symbol, fetched = rows.len(), written, "symbol pass complete");
        Ok(written)
    }

    /// Marks queued symbols whose provider fingerprint matches the cached
    /// one as skippable. Symbols missing from either side are never
    /// skipped.
    async fn refresh_skip_status(&mut self) -> anyhow::Result<()> {
        self.ensure_listing().await?;
        let Some(listing) = &self.listing else {
            return Ok(());
        };

        for item in self.queue.snapshot() {
            let skip = match (listing.get(&item.symbol), self.fingerprints.get(&item.symbol)) {
                (Some(current), Some(cached)) => current == cached,
                _ => false,
            };
            self.queue.set_skip(&item.symbol, skip);
        }
        Ok(())
    }

    /// Fetches the provider listing once per process.
    async fn ensure_listing(&mut self) -> anyhow::Result<()> {
        if self.listing.is_some() {
            return Ok(());
        }
        let entries = self.source.fetch_listing().await?;
        debug!(entries = entries.len(), "provider listing fetched");
        self.listing = Some(
            entries
                .into_iter()
                .map(|e| (canonical_symbol(&e.ticker), e.news_url))
                .collect(),
        );
        Ok(())
    }
}

/// Keeps rows whose trimmed URL is not already in the stored window.
fn dedupe(rows: &[Headline], stored: &[String]) -> Vec<Headline> {
    let seen: HashSet<&str> = stored.iter().map(|u| u.trim()).collect();
    rows.iter()
        .filter(|r| !seen.contains(r.url.trim()))
        .cloned()
        .collect()
}

/// Derives a symbol's polling cost from its fetched rows: how many were
/// published in the last 24 hours, clamped into `[1, MAX_COST]`.
fn daily_cost(rows: &[Headline]) -> u32 {
    let cutoff = Utc::now().naive_utc() - chrono::Duration::hours(24);
    let recent = rows.iter().filter(|r| r.published_at > cutoff).count();
    u32::try_from(recent).unwrap_or(MAX_COST).clamp(1, MAX_COST)
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
