//! The fingerprint cache: ticker → most recent known news URL.
//!
//! The controller compares these cached fingerprints against the provider's
//! live listing to decide which symbols can be skipped without a fetch.

use std::collections::HashMap;

use newswire_core::{canonical_symbol, ListingEntry};
use sqlx::PgPool;

use crate::DbError;

/// Creates the `fingerprint_cache` table if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the DDL fails.
pub async fn ensure_fingerprint_table(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS fingerprint_cache ( \
             ticker VARCHAR(32) PRIMARY KEY, \
             news_url TEXT NOT NULL, \
             updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW() \
         )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Loads the whole fingerprint cache as a ticker → URL map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_fingerprints(pool: &PgPool) -> Result<HashMap<String, String>, DbError> {
    ensure_fingerprint_table(pool).await?;
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT ticker, news_url FROM fingerprint_cache")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

/// Inserts or updates the cached fingerprint for one ticker.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_fingerprint(pool: &PgPool, ticker: &str, news_url: &str) -> Result<(), DbError> {
    ensure_fingerprint_table(pool).await?;
    sqlx::query(
        "INSERT INTO fingerprint_cache (ticker, news_url, updated_at) \
         VALUES ($1, $2, NOW()) \
         ON CONFLICT (ticker) DO UPDATE SET \
             news_url   = EXCLUDED.news_url, \
             updated_at = NOW()",
    )
    .bind(canonical_symbol(ticker))
    .bind(news_url)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replaces the whole fingerprint cache with the given listing, in one
/// transaction. Used after a full listing refresh from the provider.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the transaction fails; on failure the
/// previous cache contents are left intact.
pub async fn replace_fingerprints(pool: &PgPool, entries: &[ListingEntry]) -> Result<(), DbError> {
    ensure_fingerprint_table(pool).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM fingerprint_cache")
        .execute(&mut *tx)
        .await?;
    for entry in entries {
        sqlx::query(
            "INSERT INTO fingerprint_cache (ticker, news_url, updated_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (ticker) DO UPDATE SET \
                 news_url   = EXCLUDED.news_url, \
                 updated_at = NOW()",
        )
        .bind(canonical_symbol(&entry.ticker))
        .bind(&entry.news_url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(())
}
