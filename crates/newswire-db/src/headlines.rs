//! Per-symbol headline tables.
//!
//! Storage is one table per ticker, created on first use. Table names are
//! derived from the symbol, and sqlx cannot bind identifiers, so every entry
//! point validates the symbol against a strict charset before the name is
//! interpolated into SQL — that validation is the injection guard.

use chrono::NaiveDateTime;
use newswire_core::watchlist::is_valid_symbol;
use newswire_core::{canonical_symbol, Headline};
use sqlx::PgPool;

use crate::DbError;

/// Derives the Postgres table name for a symbol.
///
/// Lowercased, with `.` and `-` (legal in tickers, awkward in identifiers)
/// mapped to `_`: `BRK.B` stores into `"brk_b"`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] if the symbol fails charset validation.
pub fn table_name(symbol: &str) -> Result<String, DbError> {
    let canonical = canonical_symbol(symbol);
    if !is_valid_symbol(&canonical) {
        return Err(DbError::InvalidSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(canonical
        .to_ascii_lowercase()
        .replace(['.', '-'], "_"))
}

/// Returns `true` if the per-symbol headline table already exists.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] for malformed symbols, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn headline_table_exists(pool: &PgPool, symbol: &str) -> Result<bool, DbError> {
    let table = table_name(symbol)?;
    let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(&table)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Creates the per-symbol headline table (and its ticker index) if absent.
///
/// Columns mirror the provider export: title, source, date, url, category,
/// ticker.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] for malformed symbols, or
/// [`DbError::Sqlx`] if the DDL fails.
pub async fn ensure_headline_table(pool: &PgPool, symbol: &str) -> Result<(), DbError> {
    let table = table_name(symbol)?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" ( \
             title TEXT, \
             source VARCHAR(255), \
             date TIMESTAMP, \
             url TEXT, \
             category VARCHAR(255), \
             ticker VARCHAR(32) \
         )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS \"{table}_ticker_idx\" ON \"{table}\" (ticker)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Appends headline rows to the symbol's table, creating it on first use.
///
/// Returns the number of rows written. Performs no deduplication; callers
/// filter against [`recent_urls`] first.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] for malformed symbols, or
/// [`DbError::Sqlx`] if any insert fails.
pub async fn insert_headlines(
    pool: &PgPool,
    symbol: &str,
    rows: &[Headline],
) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }

    ensure_headline_table(pool, symbol).await?;
    let table = table_name(symbol)?;
    let insert = format!(
        "INSERT INTO \"{table}\" (title, source, date, url, category, ticker) \
         VALUES ($1, $2, $3, $4, $5, $6)"
    );

    let mut written = 0u64;
    for row in rows {
        sqlx::query(&insert)
            .bind(&row.title)
            .bind(&row.source)
            .bind(row.published_at)
            .bind(&row.url)
            .bind(&row.category)
            .bind(&row.ticker)
            .execute(pool)
            .await?;
        written += 1;
    }

    Ok(written)
}

/// Returns the URLs of the most recent `limit` stored rows for a symbol,
/// newest first. This is the bounded window the controller dedupes against.
///
/// A symbol whose table does not exist yet yields an empty list.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] for malformed symbols, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn recent_urls(pool: &PgPool, symbol: &str, limit: i64) -> Result<Vec<String>, DbError> {
    if !headline_table_exists(pool, symbol).await? {
        return Ok(Vec::new());
    }

    let table = table_name(symbol)?;
    let urls: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT url FROM \"{table}\" \
         WHERE url IS NOT NULL \
         ORDER BY date DESC NULLS LAST \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(urls)
}

/// Returns the most recent stored publish timestamp for a symbol, if any.
///
/// # Errors
///
/// Returns [`DbError::InvalidSymbol`] for malformed symbols, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn latest_published_at(
    pool: &PgPool,
    symbol: &str,
) -> Result<Option<NaiveDateTime>, DbError> {
    if !headline_table_exists(pool, symbol).await? {
        return Ok(None);
    }

    let table = table_name(symbol)?;
    let latest: Option<NaiveDateTime> =
        sqlx::query_scalar(&format!("SELECT MAX(date) FROM \"{table}\""))
            .fetch_one(pool)
            .await?;

    Ok(latest)
}
