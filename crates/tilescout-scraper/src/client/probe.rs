use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use tilescout_core::Region;

use super::ListingsClient;
use crate::error::ScraperError;

static NO_RESULTS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.HomeViews.reversePosition h2").expect("valid no-results selector")
});
static SUMMARY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.homes.summary.reversePosition").expect("valid summary selector")
});
static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,10}(?:,\d{1,10})*").expect("valid count regex"));

/// Visible and total listing counts reported for one viewport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewportCounts {
    pub viewport_url: String,
    /// Listings the site will actually page through for this viewport.
    pub visible: u32,
    /// Listings that exist inside the viewport.
    pub total: u32,
}

impl ViewportCounts {
    /// A viewport is clean when every listing in it is reachable through
    /// pagination. Otherwise the site is truncating and the region must be
    /// split.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.visible == self.total
    }
}

/// Outcome of probing one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ListingCountResult {
    NoListings,
    Counts(ViewportCounts),
}

impl ListingsClient {
    /// Asks the listings site how many listings the region's viewport shows
    /// against how many it holds.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] on any non-2xx response.
    /// - [`ScraperError::Http`] on network failure.
    /// - [`ScraperError::SummaryParse`] if the page has neither the
    ///   "no listings" marker nor a two-number summary.
    pub async fn probe(&self, region: &Region) -> Result<ListingCountResult, ScraperError> {
        let viewport_url = self.viewport_url(region);
        let body = self.get_text(&viewport_url).await?;

        match parse_listing_summary(&body) {
            Ok(None) => Ok(ListingCountResult::NoListings),
            Ok(Some((visible, total))) => Ok(ListingCountResult::Counts(ViewportCounts {
                viewport_url,
                visible,
                total,
            })),
            Err(reason) => Err(ScraperError::SummaryParse {
                url: viewport_url,
                reason,
            }),
        }
    }
}

/// Reads `(visible, total)` out of a viewport search page.
///
/// Returns `Ok(None)` when the page carries the "no listings" marker (the
/// results container with a sub-heading in place of cards). Otherwise the
/// summary element must contain exactly two integers, optionally with
/// thousands separators.
pub(crate) fn parse_listing_summary(body: &str) -> Result<Option<(u32, u32)>, String> {
    let document = Html::parse_document(body);

    if document.select(&NO_RESULTS_SELECTOR).next().is_some() {
        return Ok(None);
    }

    let summary = document
        .select(&SUMMARY_SELECTOR)
        .next()
        .ok_or_else(|| "listing summary element not found".to_owned())?;
    let text: String = summary.text().collect();

    let counts = COUNT_RE
        .find_iter(&text)
        .map(|m| {
            m.as_str()
                .replace(',', "")
                .parse::<u32>()
                .map_err(|e| format!("count \"{}\" out of range: {e}", m.as_str()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match counts.as_slice() {
        [visible, total] => Ok(Some((*visible, *total))),
        other => Err(format!(
            "expected two counts in summary \"{}\", found {}",
            text.trim(),
            other.len()
        )),
    }
}
