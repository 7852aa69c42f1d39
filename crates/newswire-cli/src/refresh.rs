//! `refresh-fingerprints` command: bulk-sync the fingerprint cache.

use newswire_core::AppConfig;
use newswire_db::PoolConfig;
use newswire_provider::ExportClient;

/// Fetches the provider's current listing and replaces the whole
/// fingerprint cache with it. Every symbol in the listing is then
/// considered "seen", so the next poll skips anything without newer news.
///
/// # Errors
///
/// Returns an error if the listing fetch or the cache replacement fails.
pub(crate) async fn run_refresh(config: &AppConfig) -> anyhow::Result<()> {
    let pool = newswire_db::connect_pool(
        &config.database_url,
        PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await?;

    let client = ExportClient::new(
        &config.export_base_url,
        &config.export_auth_token,
        config.provider_request_timeout_secs,
        &config.provider_user_agent,
        config.provider_max_retries,
        config.provider_retry_backoff_base_secs,
    )?;

    let listing = client.fetch_listing().await?;
    newswire_db::replace_fingerprints(&pool, &listing).await?;

    println!("fingerprint cache refreshed: {} symbols", listing.len());
    Ok(())
}
