use super::*;

use std::sync::Mutex;

use newswire_core::ListingEntry;
use tempfile::TempDir;

use crate::queue::PollItem;

// ------------------------------------------------------------------
// In-memory fakes
// ------------------------------------------------------------------

#[derive(Default)]
struct FakeSource {
    headlines: HashMap<String, Vec<Headline>>,
    listing: Vec<ListingEntry>,
    fail_listing: bool,
    fetch_calls: Mutex<Vec<Vec<String>>>,
}

impl HeadlineSource for &FakeSource {
    async fn fetch_headlines(&self, symbols: &[String]) -> anyhow::Result<Vec<Headline>> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push(symbols.to_vec());
        let mut rows = Vec::new();
        for symbol in symbols {
            if let Some(r) = self.headlines.get(symbol) {
                rows.extend(r.iter().cloned());
            }
        }
        Ok(rows)
    }

    async fn fetch_listing(&self) -> anyhow::Result<Vec<ListingEntry>> {
        if self.fail_listing {
            anyhow::bail!("listing unavailable");
        }
        Ok(self.listing.clone())
    }
}

#[derive(Default)]
struct FakeStore {
    rows: Mutex<HashMap<String, Vec<Headline>>>,
    fingerprints: Mutex<HashMap<String, String>>,
    fail_append_for: Vec<String>,
}

impl HeadlineStore for &FakeStore {
    async fn ensure_symbol(&self, symbol: &str) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default();
        Ok(())
    }

    async fn recent_urls(&self, symbol: &str, limit: i64) -> anyhow::Result<Vec<String>> {
        let rows = self.rows.lock().unwrap();
        let urls = rows
            .get(symbol)
            .map(|r| {
                r.iter()
                    .rev()
                    .take(usize::try_from(limit).unwrap())
                    .map(|h| h.url.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }

    async fn append_headlines(&self, symbol: &str, new: &[Headline]) -> anyhow::Result<u64> {
        if self.fail_append_for.iter().any(|s| s == symbol) {
            anyhow::bail!("storage rejected {symbol}");
        }
        let mut rows = self.rows.lock().unwrap();
        rows.entry(symbol.to_string())
            .or_default()
            .extend(new.iter().cloned());
        Ok(new.len() as u64)
    }

    async fn load_fingerprints(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.fingerprints.lock().unwrap().clone())
    }

    async fn upsert_fingerprint(&self, symbol: &str, news_url: &str) -> anyhow::Result<()> {
        self.fingerprints
            .lock()
            .unwrap()
            .insert(symbol.to_string(), news_url.to_string());
        Ok(())
    }
}

// ------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------

fn headline(ticker: &str, url: &str, hours_ago: i64) -> Headline {
    Headline {
        title: format!("{ticker} story"),
        source: "Wire".to_string(),
        published_at: (Utc::now() - chrono::Duration::hours(hours_ago)).naive_utc(),
        url: url.to_string(),
        category: "Stock News".to_string(),
        ticker: ticker.to_string(),
    }
}

fn test_config(dir: &TempDir) -> ControllerConfig {
    ControllerConfig {
        queue_path: dir.path().join("queue.json"),
        activity_path: dir.path().join("activity.log"),
        rate_limit: Duration::ZERO,
        session_max: Duration::from_secs(60),
    }
}

fn queue_of(items: &[(&str, u32)]) -> PollQueue {
    let queue = PollQueue::new(95).unwrap();
    for (symbol, cost) in items {
        assert!(queue.enqueue(PollItem::with_state(symbol, *cost, false)));
    }
    queue
}

async fn controller_for<'a>(
    source: &'a FakeSource,
    store: &'a FakeStore,
    queue: PollQueue,
    config: ControllerConfig,
) -> Controller<&'a FakeSource, &'a FakeStore> {
    Controller::init(
        source,
        store,
        queue,
        config,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap()
}

fn stored_count(store: &FakeStore, symbol: &str) -> usize {
    store.rows.lock().unwrap().get(symbol).map_or(0, Vec::len)
}

// ------------------------------------------------------------------
// Cycle behavior
// ------------------------------------------------------------------

#[tokio::test]
async fn cycle_fetches_stores_and_updates_cost() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default();
    source.headlines.insert(
        "AAPL".to_string(),
        vec![
            headline("AAPL", "https://n/a1", 1),
            headline("AAPL", "https://n/a2", 2),
            headline("AAPL", "https://n/a3", 30),
        ],
    );
    let store = FakeStore::default();

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;
    let outcome = ctrl.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome { selected: 1, updated: 1 });
    assert_eq!(stored_count(&store, "AAPL"), 3);
    // Cost counts only the two rows from the last 24 hours.
    assert_eq!(ctrl.queue().snapshot()[0].cost, 2);
}

#[tokio::test]
async fn refetch_with_unchanged_response_stores_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default();
    source.headlines.insert(
        "AAPL".to_string(),
        vec![headline("AAPL", "https://n/a1", 1)],
    );
    let store = FakeStore::default();

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;

    let first = ctrl.run_cycle().await.unwrap();
    assert_eq!(first.updated, 1);

    // AAPL is absent from the (empty) listing, so it is polled again; the
    // unchanged response must dedupe away entirely.
    let second = ctrl.run_cycle().await.unwrap();
    assert_eq!(second, CycleOutcome { selected: 1, updated: 0 });
    assert_eq!(stored_count(&store, "AAPL"), 1);
}

#[tokio::test]
async fn whitespace_variant_urls_are_deduped() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default();
    source.headlines.insert(
        "AAPL".to_string(),
        vec![headline("AAPL", "  https://n/a1  ", 1)],
    );
    let store = FakeStore::default();
    store
        .rows
        .lock()
        .unwrap()
        .insert("AAPL".to_string(), vec![headline("AAPL", "https://n/a1", 5)]);

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;
    let outcome = ctrl.run_cycle().await.unwrap();

    assert_eq!(outcome.updated, 0);
    assert_eq!(stored_count(&store, "AAPL"), 1);
}

#[tokio::test]
async fn symbol_with_no_rows_still_gets_minimum_cost() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let store = FakeStore::default();

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("QUIET", 0)]), test_config(&dir)).await;
    ctrl.run_cycle().await.unwrap();

    assert_eq!(ctrl.queue().snapshot()[0].cost, 1);
}

#[tokio::test]
async fn one_symbol_failure_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default();
    source
        .headlines
        .insert("BAD".to_string(), vec![headline("BAD", "https://n/b1", 1)]);
    source
        .headlines
        .insert("GOOD".to_string(), vec![headline("GOOD", "https://n/g1", 1)]);
    let store = FakeStore {
        fail_append_for: vec!["BAD".to_string()],
        ..FakeStore::default()
    };

    let mut ctrl = controller_for(
        &source,
        &store,
        queue_of(&[("BAD", 0), ("GOOD", 0)]),
        test_config(&dir),
    )
    .await;
    let outcome = ctrl.run_cycle().await.unwrap();

    assert_eq!(outcome.updated, 1);
    assert_eq!(stored_count(&store, "GOOD"), 1);
}

#[tokio::test]
async fn overflow_symbols_are_fetched_individually() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default();
    source
        .headlines
        .insert("A".to_string(), vec![headline("A", "https://n/a1", 1)]);
    source
        .headlines
        .insert("BIG".to_string(), vec![headline("BIG", "https://n/big1", 1)]);
    let store = FakeStore::default();

    let mut ctrl = controller_for(
        &source,
        &store,
        queue_of(&[("A", 10), ("BIG", 99)]),
        test_config(&dir),
    )
    .await;
    let outcome = ctrl.run_cycle().await.unwrap();

    // BIG exceeded the batch budget but still got stored via the follow-up.
    assert_eq!(outcome.updated, 2);
    assert_eq!(stored_count(&store, "BIG"), 1);

    let calls = source.fetch_calls.lock().unwrap();
    assert_eq!(calls.as_slice(), [vec!["A".to_string()], vec!["BIG".to_string()]]);
}

#[tokio::test]
async fn matching_fingerprint_skips_the_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        listing: vec![ListingEntry {
            ticker: "AAPL".to_string(),
            news_url: "https://n/a1".to_string(),
        }],
        ..FakeSource::default()
    };
    let store = FakeStore::default();
    store
        .fingerprints
        .lock()
        .unwrap()
        .insert("AAPL".to_string(), "https://n/a1".to_string());

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;
    let outcome = ctrl.run_cycle().await.unwrap();

    // Everything skippable: empty batch, and no headline fetch at all.
    assert_eq!(outcome, CycleOutcome { selected: 0, updated: 0 });
    assert!(source.fetch_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn listing_failure_means_nothing_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        fail_listing: true,
        ..FakeSource::default()
    };
    let store = FakeStore::default();
    store
        .fingerprints
        .lock()
        .unwrap()
        .insert("AAPL".to_string(), "https://n/a1".to_string());

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;
    let outcome = ctrl.run_cycle().await.unwrap();

    assert_eq!(outcome.selected, 1);
}

#[tokio::test]
async fn cycle_persists_the_queue_after_each_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let queue_path = config.queue_path.clone();

    let mut source = FakeSource::default();
    source.headlines.insert(
        "AAPL".to_string(),
        vec![headline("AAPL", "https://n/a1", 1)],
    );
    let store = FakeStore::default();

    let mut ctrl = controller_for(&source, &store, queue_of(&[("AAPL", 0)]), config).await;
    ctrl.run_cycle().await.unwrap();

    let restored = PollQueue::load(&queue_path).unwrap();
    assert_eq!(restored.snapshot()[0].cost, 1);
}

// ------------------------------------------------------------------
// Session behavior
// ------------------------------------------------------------------

#[tokio::test]
async fn session_ends_once_every_symbol_is_skippable() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource {
        headlines: HashMap::from([(
            "AAPL".to_string(),
            vec![headline("AAPL", "https://n/a1", 1)],
        )]),
        listing: vec![ListingEntry {
            ticker: "AAPL".to_string(),
            news_url: "https://n/a1".to_string(),
        }],
        ..FakeSource::default()
    };
    let store = FakeStore::default();

    let mut ctrl =
        controller_for(&source, &store, queue_of(&[("AAPL", 0)]), test_config(&dir)).await;
    let summary = ctrl.run_session().await.unwrap();

    // Cycle one stores and advances the fingerprint to match the listing;
    // cycle two finds AAPL skippable and the session converges.
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.symbols_updated, 1);
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn session_honors_the_stop_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let queue_path = config.queue_path.clone();
    let source = FakeSource::default();
    let store = FakeStore::default();

    let stop = Arc::new(AtomicBool::new(true));
    let mut ctrl = Controller::init(
        &source,
        &store,
        queue_of(&[("AAPL", 0)]),
        config,
        Arc::clone(&stop),
    )
    .await
    .unwrap();

    let summary = ctrl.run_session().await.unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.cycles, 0);
    // The queue is persisted even on an interrupted exit.
    assert!(queue_path.exists());
}

#[tokio::test]
async fn session_honors_the_time_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let config = ControllerConfig {
        session_max: Duration::ZERO,
        ..test_config(&dir)
    };
    let source = FakeSource::default();
    let store = FakeStore::default();

    let mut ctrl = controller_for(&source, &store, queue_of(&[("AAPL", 0)]), config).await;
    let summary = ctrl.run_session().await.unwrap();

    assert_eq!(summary.cycles, 0);
    assert!(!summary.interrupted);
}

// ------------------------------------------------------------------
// Pure helpers
// ------------------------------------------------------------------

#[test]
fn dedupe_matches_on_trimmed_url() {
    let rows = vec![
        headline("A", " https://n/1 ", 1),
        headline("A", "https://n/2", 1),
    ];
    let stored = vec!["https://n/1".to_string()];
    let fresh = dedupe(&rows, &stored);
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].url, "https://n/2");
}

#[test]
fn daily_cost_clamps_into_unit_range() {
    assert_eq!(daily_cost(&[]), 1);

    let old = vec![headline("A", "https://n/1", 48)];
    assert_eq!(daily_cost(&old), 1);

    let many: Vec<Headline> = (0..250)
        .map(|i| headline("A", &format!("https://n/{i}"), 1))
        .collect();
    assert_eq!(daily_cost(&many), 100);
}
