use super::*;
use chrono::{NaiveDate, Timelike};

const HEADLINE_CSV: &str = "\
Title,Source,Date,Url,Category,Ticker
\"Apple unveils new chip\",Reuters,2026-08-28 09:30:00,https://example.com/a,Stock News,AAPL
\"Tesla recalls vehicles\",AP,2026-08-28 10:00:00,https://example.com/t,Stock News,tsla
";

#[test]
fn parses_well_formed_headline_rows() {
    let rows = parse_headline_csv(HEADLINE_CSV, "test").unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].title, "Apple unveils new chip");
    assert_eq!(rows[0].source, "Reuters");
    assert_eq!(rows[0].url, "https://example.com/a");
    assert_eq!(rows[0].ticker, "AAPL");
    assert_eq!(
        rows[0].published_at.date(),
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    );

    // Tickers are canonicalized on the way in.
    assert_eq!(rows[1].ticker, "TSLA");
}

#[test]
fn tolerates_reordered_and_extra_columns() {
    let csv = "\
Ticker,Extra,Url,Title,Source,Date,Category
AAPL,x,https://example.com/a,Some title,Reuters,2026-08-28 09:30:00,Stock News
";
    let rows = parse_headline_csv(csv, "test").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Some title");
}

#[test]
fn drops_rows_with_missing_required_fields() {
    let csv = "\
Title,Source,Date,Url,Category,Ticker
,Reuters,2026-08-28 09:30:00,https://example.com/a,Stock News,AAPL
Good title,Reuters,2026-08-28 09:30:00,https://example.com/b,Stock News,AAPL
Good title,Reuters,2026-08-28 09:30:00,,Stock News,AAPL
";
    let rows = parse_headline_csv(csv, "test").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "https://example.com/b");
}

#[test]
fn drops_rows_with_unparseable_dates() {
    let csv = "\
Title,Source,Date,Url,Category,Ticker
Bad date,Reuters,yesterday-ish,https://example.com/a,Stock News,AAPL
Good date,Reuters,2026-08-28 09:30:00,https://example.com/b,Stock News,AAPL
";
    let rows = parse_headline_csv(csv, "test").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Good date");
}

#[test]
fn missing_column_is_an_error() {
    let csv = "Title,Source,Date,Category,Ticker\na,b,2026-08-28 09:30:00,c,AAPL\n";
    let result = parse_headline_csv(csv, "test");
    assert!(
        matches!(result, Err(ProviderError::MissingColumn { ref column }) if column == "Url"),
        "expected MissingColumn(Url), got: {result:?}"
    );
}

#[test]
fn parse_export_date_accepts_known_formats() {
    assert!(parse_export_date("2026-08-28 09:30:00").is_some());
    assert!(parse_export_date("2026-08-28 09:30").is_some());
    assert!(parse_export_date("8/28/2026 09:30:00 AM").is_some());
    assert!(parse_export_date("8/28/2026 21:15").is_some());

    let midnight = parse_export_date("2026-08-28").unwrap();
    assert_eq!(midnight.hour(), 0);

    assert!(parse_export_date("not a date").is_none());
}

#[test]
fn parses_listing_rows_and_skips_symbols_without_news() {
    let csv = "\
No.,Ticker,Company,Sector,News URL
1,AAPL,Apple Inc,Technology,https://example.com/a
2,NONEWS,Quiet Corp,Technology,
3,msft,Microsoft,Technology,https://example.com/m
";
    let entries = parse_listing_csv(csv, "test").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].ticker, "AAPL");
    assert_eq!(entries[1].ticker, "MSFT");
    assert_eq!(entries[1].news_url, "https://example.com/m");
}

#[test]
fn listing_missing_news_url_column_is_an_error() {
    let csv = "Ticker,Company\nAAPL,Apple\n";
    let result = parse_listing_csv(csv, "test");
    assert!(matches!(
        result,
        Err(ProviderError::MissingColumn { .. })
    ));
}
