//! `poll` command: run a polling session against the live provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use newswire_core::AppConfig;
use newswire_db::PoolConfig;
use newswire_poller::{Controller, ControllerConfig, PgHeadlineStore, PollQueue};
use newswire_provider::ExportClient;

/// Runs polling cycles until the queue converges, the ceiling passes, or
/// Ctrl-C is pressed. The queue persists across all of those exits, so an
/// interrupted session resumes where it left off.
///
/// # Errors
///
/// Returns an error on configuration or database-connection failure, or if
/// the queue state cannot be persisted. Per-symbol provider failures are
/// logged and absorbed.
pub(crate) async fn run_poll(
    config: &AppConfig,
    max_hours: Option<u64>,
    threshold: Option<u32>,
) -> anyhow::Result<()> {
    let pool = newswire_db::connect_pool(
        &config.database_url,
        PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await?;
    newswire_db::ping(&pool).await?;

    let queue = load_or_seed_queue(config)?;
    let queue = apply_threshold(queue, threshold)?;

    let client = ExportClient::new(
        &config.export_base_url,
        &config.export_auth_token,
        config.provider_request_timeout_secs,
        &config.provider_user_agent,
        config.provider_max_retries,
        config.provider_retry_backoff_base_secs,
    )?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, finishing the in-flight symbol");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let controller_config = ControllerConfig {
        queue_path: config.queue_path.clone(),
        activity_path: config.activity_log_path.clone(),
        rate_limit: Duration::from_secs(config.rate_limit_secs),
        session_max: Duration::from_secs(
            max_hours.map_or(config.session_max_secs, |h| h * 3600),
        ),
    };

    let store = PgHeadlineStore::new(pool);
    let mut controller = Controller::init(client, store, queue, controller_config, stop).await?;
    let summary = controller.run_session().await?;

    println!("symbols updated: {}", summary.symbols_updated);
    if summary.interrupted {
        println!("session interrupted; queue state saved");
    }
    Ok(())
}

/// Restores the saved queue, or seeds a fresh one from the watchlist when no
/// saved state exists yet.
fn load_or_seed_queue(config: &AppConfig) -> anyhow::Result<PollQueue> {
    if config.queue_path.exists() {
        Ok(PollQueue::load(&config.queue_path)?)
    } else {
        tracing::info!(
            path = %config.queue_path.display(),
            "no saved queue, seeding from watchlist"
        );
        crate::seed::seed_queue(config, &config.watchlist_path)
    }
}

/// Rebuilds the queue under an overridden threshold, keeping item order and
/// state. A `None` override returns the queue untouched.
fn apply_threshold(queue: PollQueue, threshold: Option<u32>) -> anyhow::Result<PollQueue> {
    let Some(value) = threshold else {
        return Ok(queue);
    };
    let rebuilt = PollQueue::new(value)?;
    rebuilt.bulk_enqueue(queue.snapshot());
    Ok(rebuilt)
}
