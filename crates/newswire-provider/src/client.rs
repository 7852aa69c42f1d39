use std::time::Duration;

use newswire_core::{Headline, ListingEntry};
use reqwest::{Client, Url};

use crate::error::ProviderError;
use crate::parse::{parse_headline_csv, parse_listing_csv};
use crate::rate_limit::retry_with_backoff;

/// HTTP client for the headline export API.
///
/// The provider exposes two CSV-over-HTTP endpoints: `news_export.ashx`
/// (headline rows for one or more symbols) and `export.ashx` (the screener
/// listing, carrying each symbol's most recent news URL). Rate limiting
/// (429), not-found (404), and other non-2xx responses surface as typed
/// errors; transient failures are retried with exponential backoff.
pub struct ExportClient {
    client: Client,
    base: Url,
    auth_token: String,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl ExportClient {
    /// Creates an `ExportClient` with configured timeout, `User-Agent`, and
    /// retry policy. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`ProviderError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        base_url: &str,
        auth_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ProviderError> {
        let base = Url::parse(base_url).map_err(|e| ProviderError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base,
            auth_token: auth_token.to_string(),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches headline rows for the given symbols in one export call.
    ///
    /// The export endpoint accepts a comma-joined symbol list, so a batch
    /// costs the same single request as one symbol; an empty batch returns
    /// an empty `Vec` without touching the network.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`ProviderError::NotFound`] — HTTP 404 (not retried).
    /// - [`ProviderError::UnexpectedStatus`] — any other non-2xx status (not retried).
    /// - [`ProviderError::Http`] — network or TLS failure after all retries exhausted.
    /// - [`ProviderError::Csv`] / [`ProviderError::MissingColumn`] — body does
    ///   not parse as a headline export (not retried).
    pub async fn fetch_headlines(&self, symbols: &[String]) -> Result<Vec<Headline>, ProviderError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint_url("news_export.ashx", &[("v", "3"), ("t", &symbols.join(","))])?;
        let body = self.fetch_csv_body(&url).await?;
        parse_headline_csv(&body, "headline export")
    }

    /// Fetches the screener listing: every symbol's most recent news URL.
    ///
    /// # Errors
    ///
    /// Same error surface as [`Self::fetch_headlines`].
    pub async fn fetch_listing(&self) -> Result<Vec<ListingEntry>, ProviderError> {
        let url = self.endpoint_url("export.ashx", &[("v", "152")])?;
        let body = self.fetch_csv_body(&url).await?;
        parse_listing_csv(&body, "screener export")
    }

    /// Performs a GET with retry and maps status codes to typed errors.
    async fn fetch_csv_body(&self, url: &Url) -> Result<String, ProviderError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ProviderError::RateLimited { retry_after_secs });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ProviderError::NotFound {
                        url: display_url(&url),
                    });
                }

                if !status.is_success() {
                    return Err(ProviderError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: display_url(&url),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }

    /// Builds an endpoint URL with the given query pairs plus the auth token.
    fn endpoint_url(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ProviderError::InvalidBaseUrl {
                base_url: self.base.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
            query.append_pair("auth", &self.auth_token);
        }
        Ok(url)
    }
}

/// Renders a URL for error messages with the query string (which carries the
/// auth token) stripped.
fn display_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
