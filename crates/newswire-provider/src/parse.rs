//! CSV parsing for the export endpoints.
//!
//! The export API returns CSV with a header row. Rows are validated into
//! strongly-typed structs here, at the boundary: a row missing a required
//! field or carrying an unparseable date is logged and dropped rather than
//! propagated half-formed into storage.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use newswire_core::{canonical_symbol, Headline, ListingEntry};

use crate::error::ProviderError;

/// Date formats observed in export responses, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Parses an export `Date` value against the known formats.
///
/// Date-only values parse to midnight.
#[must_use]
pub fn parse_export_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Locates a column index by exact header name.
fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ProviderError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ProviderError::MissingColumn {
            column: name.to_string(),
        })
}

/// Parses a headline export CSV body into typed rows.
///
/// Columns are located by header name (`Title`, `Source`, `Date`, `Url`,
/// `Category`, `Ticker`), so extra columns and reordering are tolerated.
/// Malformed rows are dropped with a warning; the row count of dropped rows
/// is logged once at the end.
///
/// # Errors
///
/// Returns [`ProviderError::Csv`] if the body is not readable as CSV at all,
/// or [`ProviderError::MissingColumn`] if a required column is absent from
/// the header row.
pub fn parse_headline_csv(body: &str, context: &str) -> Result<Vec<Headline>, ProviderError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ProviderError::Csv {
            context: context.to_string(),
            source: e,
        })?
        .clone();

    let title_idx = column_index(&headers, "Title")?;
    let source_idx = column_index(&headers, "Source")?;
    let date_idx = column_index(&headers, "Date")?;
    let url_idx = column_index(&headers, "Url")?;
    let category_idx = column_index(&headers, "Category")?;
    let ticker_idx = column_index(&headers, "Ticker")?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(context, error = %e, "unreadable CSV record dropped");
                dropped += 1;
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

        let title = field(title_idx);
        let url = field(url_idx);
        let ticker = field(ticker_idx);
        if title.is_empty() || url.is_empty() || ticker.is_empty() {
            tracing::warn!(context, "row missing title/url/ticker dropped");
            dropped += 1;
            continue;
        }

        let Some(published_at) = parse_export_date(field(date_idx)) else {
            tracing::warn!(
                context,
                date = field(date_idx),
                "row with unparseable date dropped"
            );
            dropped += 1;
            continue;
        };

        rows.push(Headline {
            title: title.to_string(),
            source: field(source_idx).to_string(),
            published_at,
            url: url.to_string(),
            category: field(category_idx).to_string(),
            ticker: canonical_symbol(ticker),
        });
    }

    if dropped > 0 {
        tracing::warn!(context, dropped, kept = rows.len(), "dropped malformed rows");
    }

    Ok(rows)
}

/// Parses a screener export CSV body into listing entries.
///
/// Only the `Ticker` and `News URL` columns are read; the screener export
/// carries many other columns that are ignored. Rows without a news URL are
/// skipped (a symbol with no news has no fingerprint).
///
/// # Errors
///
/// Returns [`ProviderError::Csv`] if the body is not readable as CSV, or
/// [`ProviderError::MissingColumn`] if either required column is absent.
pub fn parse_listing_csv(body: &str, context: &str) -> Result<Vec<ListingEntry>, ProviderError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ProviderError::Csv {
            context: context.to_string(),
            source: e,
        })?
        .clone();

    let ticker_idx = column_index(&headers, "Ticker")?;
    let url_idx = column_index(&headers, "News URL")?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        let ticker = record.get(ticker_idx).map(str::trim).unwrap_or_default();
        let news_url = record.get(url_idx).map(str::trim).unwrap_or_default();
        if ticker.is_empty() || news_url.is_empty() {
            continue;
        }
        entries.push(ListingEntry {
            ticker: canonical_symbol(ticker),
            news_url: news_url.to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
