//! `seed` command: populate the polling queue from the watchlist.

use std::path::Path;

use newswire_core::AppConfig;
use newswire_poller::{PollItem, PollQueue};

/// Seeds the queue from `watchlist_path`, merging into any existing saved
/// queue, and persists the result. Already-queued symbols are left alone,
/// so re-seeding is harmless.
///
/// # Errors
///
/// Returns an error if the watchlist fails to load or validate, or if the
/// queue file cannot be read or written.
pub(crate) fn seed_queue(config: &AppConfig, watchlist_path: &Path) -> anyhow::Result<PollQueue> {
    let watchlist = newswire_core::load_watchlist(watchlist_path)?;

    let queue = if config.queue_path.exists() {
        PollQueue::load(&config.queue_path)?
    } else {
        PollQueue::new(config.queue_threshold)?
    };

    let added = queue.bulk_enqueue(watchlist.symbols.iter().map(|s| PollItem::new(s)));
    queue.save(&config.queue_path)?;
    tracing::info!(
        added,
        total = queue.len(),
        watchlist = %watchlist_path.display(),
        "queue seeded"
    );
    Ok(queue)
}

/// # Errors
///
/// See [`seed_queue`].
pub(crate) fn run_seed(config: &AppConfig, watchlist: Option<&Path>) -> anyhow::Result<()> {
    let path = watchlist.unwrap_or(&config.watchlist_path);
    let queue = seed_queue(config, path)?;
    println!("queue seeded: {} symbols total", queue.len());
    Ok(())
}
