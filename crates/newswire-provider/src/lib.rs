pub mod client;
pub mod error;
pub mod parse;
mod rate_limit;

pub use client::ExportClient;
pub use error::ProviderError;
pub use parse::{parse_headline_csv, parse_listing_csv};
