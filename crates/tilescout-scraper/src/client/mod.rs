//! HTTP client for the listings site and the city boundary API.

mod boundary;
mod probe;

use std::time::Duration;

use reqwest::{Client, Url};
use scraper::Html;
use tilescout_core::{AppConfig, Region};

use crate::error::ScraperError;
use crate::pagination::page_url;
use crate::rate_limit::Throttle;

pub use probe::{ListingCountResult, ViewportCounts};

/// Client for the listings site's viewport search pages.
///
/// All requests go through one shared throttle, so each request (probe,
/// result page, boundary lookup) starts at least the configured spacing
/// after the previous one finished. Non-2xx responses surface as
/// [`ScraperError::UnexpectedStatus`]; nothing is retried.
pub struct ListingsClient {
    client: Client,
    search_base_url: String,
    listing_base_url: Url,
    throttle: Throttle,
}

impl ListingsClient {
    /// Creates a client.
    ///
    /// `search_base_url` is the city search root, e.g.
    /// `https://www.redfin.ca/bc/vancouver`; `listing_base_url` is the origin
    /// that relative detail-page links on result cards are resolved against.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScraperError::InvalidBaseUrl`] if either
    /// base URL does not parse.
    pub fn new(
        search_base_url: &str,
        listing_base_url: &str,
        user_agent: &str,
        timeout_secs: u64,
        min_request_spacing: Duration,
    ) -> Result<Self, ScraperError> {
        Url::parse(search_base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            url: search_base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let listing_base_url =
            Url::parse(listing_base_url).map_err(|e| ScraperError::InvalidBaseUrl {
                url: listing_base_url.to_owned(),
                reason: e.to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            search_base_url: search_base_url.trim_end_matches('/').to_owned(),
            listing_base_url,
            throttle: Throttle::new(min_request_spacing),
        })
    }

    /// Creates a client from the application config.
    ///
    /// # Errors
    ///
    /// See [`ListingsClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            &config.search_base_url,
            &config.listing_base_url,
            &config.user_agent,
            config.request_timeout_secs,
            Duration::from_millis(config.inter_request_delay_ms),
        )
    }

    /// Origin used to absolutize card detail links.
    #[must_use]
    pub fn listing_base_url(&self) -> &Url {
        &self.listing_base_url
    }

    #[must_use]
    pub fn min_request_spacing(&self) -> Duration {
        self.throttle.min_spacing()
    }

    /// The viewport-filtered search URL for `region`:
    /// `{search_base_url}/filter/viewport={region}`.
    #[must_use]
    pub fn viewport_url(&self, region: &Region) -> String {
        format!("{}/filter/viewport={region}", self.search_base_url)
    }

    /// Fetches results page `page` (1-based) of a viewport and parses it.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] on any non-2xx response.
    /// - [`ScraperError::Http`] on network failure.
    pub async fn fetch_page(&self, viewport_url: &str, page: u32) -> Result<Html, ScraperError> {
        let url = page_url(viewport_url, page);
        tracing::debug!(url, page, "fetching results page");
        let body = self.get_text(&url).await?;
        Ok(Html::parse_document(&body))
    }

    /// Waits for the next request slot, issues a GET, and returns the body of
    /// a 2xx response. The spacing to the following request starts once this
    /// one has finished, successfully or not.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String, ScraperError> {
        self.throttle.wait_turn().await;
        let result = self.send_get(url).await;
        self.throttle.finish();
        result
    }

    async fn send_get(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
