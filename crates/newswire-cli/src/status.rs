//! `status` command: inspect queue state and recent activity.

use newswire_core::AppConfig;
use newswire_db::PoolConfig;
use newswire_poller::{ActivityLog, PollQueue};

const ACTIVITY_TAIL: usize = 10;

/// Prints the saved queue, each symbol's most recent stored headline
/// timestamp, and the tail of the activity log.
///
/// # Errors
///
/// Returns an error if the queue file is unreadable or malformed, or if the
/// database cannot be reached.
pub(crate) async fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    if !config.queue_path.exists() {
        println!(
            "no saved queue at {}; run `newswire-cli seed` first",
            config.queue_path.display()
        );
        return Ok(());
    }

    let queue = PollQueue::load(&config.queue_path)?;
    let pool = newswire_db::connect_pool(
        &config.database_url,
        PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await?;

    println!(
        "queue: {} symbols, threshold {}",
        queue.len(),
        queue.threshold()
    );
    for item in queue.snapshot() {
        let latest = newswire_db::headlines::latest_published_at(&pool, &item.symbol).await?;
        let latest = latest.map_or_else(
            || "no rows".to_string(),
            |t| t.format("%Y-%m-%d %H:%M").to_string(),
        );
        println!(
            "  {:<8} cost {:>3}  {}  latest {}",
            item.symbol,
            item.cost,
            if item.skip { "skip" } else { "poll" },
            latest
        );
    }

    let activity = ActivityLog::new(&config.activity_log_path);
    let lines = activity.tail(ACTIVITY_TAIL)?;
    if !lines.is_empty() {
        println!("recent activity:");
        for line in lines {
            println!("  {line}");
        }
    }
    Ok(())
}
