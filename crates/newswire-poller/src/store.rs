//! Storage abstraction consumed by the controller.

use std::collections::HashMap;

use newswire_core::Headline;
use sqlx::PgPool;

/// Where headlines and fingerprints go.
///
/// Mirrors the operations the polling loop needs: create-on-first-use
/// per-symbol storage, a bounded recent-URL window for dedup, and the
/// fingerprint cache used for skip decisions.
#[allow(async_fn_in_trait)]
pub trait HeadlineStore {
    /// Makes sure the symbol's storage exists; idempotent.
    async fn ensure_symbol(&self, symbol: &str) -> anyhow::Result<()>;

    /// URLs of the most recent `limit` stored rows for a symbol, newest
    /// first. A symbol with no storage yet yields an empty list.
    async fn recent_urls(&self, symbol: &str, limit: i64) -> anyhow::Result<Vec<String>>;

    /// Appends rows to the symbol's storage, returning how many were
    /// written.
    async fn append_headlines(&self, symbol: &str, rows: &[Headline]) -> anyhow::Result<u64>;

    /// Loads the whole fingerprint cache as a ticker → URL map.
    async fn load_fingerprints(&self) -> anyhow::Result<HashMap<String, String>>;

    /// Inserts or updates the cached fingerprint for one ticker.
    async fn upsert_fingerprint(&self, symbol: &str, news_url: &str) -> anyhow::Result<()>;
}

/// Postgres-backed store over the shared connection pool.
#[derive(Debug, Clone)]
pub struct PgHeadlineStore {
    pool: PgPool,
}

impl PgHeadlineStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl HeadlineStore for PgHeadlineStore {
    async fn ensure_symbol(&self, symbol: &str) -> anyhow::Result<()> {
        Ok(newswire_db::headlines::ensure_headline_table(&self.pool, symbol).await?)
    }

    async fn recent_urls(&self, symbol: &str, limit: i64) -> anyhow::Result<Vec<String>> {
        Ok(newswire_db::headlines::recent_urls(&self.pool, symbol, limit).await?)
    }

    async fn append_headlines(&self, symbol: &str, rows: &[Headline]) -> anyhow::Result<u64> {
        Ok(newswire_db::headlines::insert_headlines(&self.pool, symbol, rows).await?)
    }

    async fn load_fingerprints(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(newswire_db::fingerprints::load_fingerprints(&self.pool).await?)
    }

    async fn upsert_fingerprint(&self, symbol: &str, news_url: &str) -> anyhow::Result<()> {
        Ok(newswire_db::fingerprints::upsert_fingerprint(&self.pool, symbol, news_url).await?)
    }
}
