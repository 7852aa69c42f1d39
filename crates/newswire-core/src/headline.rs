//! Shared domain types for the headline pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One headline row as exported by the provider.
///
/// Every field is required; rows missing any of them are rejected at the
/// provider boundary rather than carried through the pipeline half-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    /// Provider-local timestamp; the export carries no timezone.
    pub published_at: NaiveDateTime,
    pub url: String,
    pub category: String,
    /// Uppercase ticker symbol this row belongs to.
    pub ticker: String,
}

/// One entry from the provider's screener listing: a symbol and the URL of
/// its most recent news item. Used as the change-detection fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub ticker: String,
    pub news_url: String,
}

/// Canonical form of a ticker symbol: trimmed and uppercased.
///
/// Every map key and queue entry in the system uses this form so that
/// `aapl`, ` AAPL ` and `AAPL` all refer to the same symbol.
#[must_use]
pub fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_symbol_trims_and_uppercases() {
        assert_eq!(canonical_symbol(" aapl "), "AAPL");
        assert_eq!(canonical_symbol("BRK.b"), "BRK.B");
        assert_eq!(canonical_symbol("TSLA"), "TSLA");
    }
}
