//! Page-number arithmetic for viewport result listings.
//!
//! The listings site shows a fixed number of cards per results page and
//! addresses pages as a path suffix:
//!
//! ```text
//! {viewport_url}/page-1
//! {viewport_url}/page-2
//! ```

/// Listings shown per results page on the target site.
pub const DEFAULT_PAGE_CAPACITY: u32 = 9;

/// Number of result pages needed to show `visible` listings,
/// i.e. `ceil(visible / page_capacity)`.
///
/// A zero `page_capacity` is treated as 1.
#[must_use]
pub fn pages_needed(visible: u32, page_capacity: u32) -> u32 {
    visible.div_ceil(page_capacity.max(1))
}

/// Builds the URL of results page `page` (1-based) for a viewport.
#[must_use]
pub fn page_url(viewport_url: &str, page: u32) -> String {
    format!("{}/page-{page}", viewport_url.trim_end_matches('/'))
}
