//! Provider abstraction consumed by the controller.

use newswire_core::{Headline, ListingEntry};
use newswire_provider::ExportClient;

/// Where headlines come from.
///
/// The controller is generic over this trait so polling logic can be tested
/// against an in-memory source. The batch form is the primary operation; a
/// single symbol is just a one-element batch.
#[allow(async_fn_in_trait)]
pub trait HeadlineSource {
    /// Fetches headline rows for the given symbols in one call.
    async fn fetch_headlines(&self, symbols: &[String]) -> anyhow::Result<Vec<Headline>>;

    /// Fetches the provider's full listing of symbol → most recent news URL.
    async fn fetch_listing(&self) -> anyhow::Result<Vec<ListingEntry>>;
}

impl HeadlineSource for ExportClient {
    async fn fetch_headlines(&self, symbols: &[String]) -> anyhow::Result<Vec<Headline>> {
        Ok(ExportClient::fetch_headlines(self, symbols).await?)
    }

    async fn fetch_listing(&self) -> anyhow::Result<Vec<ListingEntry>> {
        Ok(ExportClient::fetch_listing(self).await?)
    }
}
