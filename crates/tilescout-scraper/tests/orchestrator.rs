//! Integration tests for `BatchOrchestrator` over a local `wiremock` server.
//!
//! Each test mounts viewport summaries and results pages for a few regions
//! and checks how the orchestrator classifies, paginates, and recovers.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tilescout_core::{partition, GridSpec, RecordKind, Region, RegionErrorPolicy};
use tilescout_scraper::{
    BatchOrchestrator, BatchSettings, CardExtractor, FailureStage, ListingsClient,
    MetadataExtractor, ScraperError,
};

const REGION: &str = "49.2:49.3:-123.2:-123.1";
const OTHER_REGION: &str = "49.3:49.4:-123.2:-123.1";

fn test_client(server: &MockServer) -> ListingsClient {
    ListingsClient::new(
        &format!("{}/bc/vancouver", server.uri()),
        &server.uri(),
        "tilescout-test/0.1",
        5,
        Duration::ZERO,
    )
    .expect("failed to build test ListingsClient")
}

fn cards(client: &ListingsClient) -> CardExtractor {
    CardExtractor::new(client.listing_base_url().clone())
}

fn settings(policy: RegionErrorPolicy) -> BatchSettings {
    BatchSettings {
        batch_count: 2,
        page_capacity: 9,
        on_region_error: policy,
    }
}

fn viewport_path(region: &str) -> String {
    format!("/bc/vancouver/filter/viewport={region}")
}

fn summary_html(visible: u32, total: u32) -> String {
    format!(
        r#"<html><body>
        <div class="HomeViews reversePosition"><div class="HomeCardsContainer"></div></div>
        <div class="homes summary reversePosition">Showing {visible} of {total} homes</div>
        </body></html>"#
    )
}

fn no_listings_html() -> &'static str {
    r#"<html><body><div class="HomeViews reversePosition"><h2>No results</h2></div></body></html>"#
}

const CARD: &str = r#"<div class="HomeCardContainer">
        <a href="/BC/Vancouver/2750-Oak-St/home/1">
          <span class="bp-Homecard__Price--value">$1,249,000</span>
          <span class="bp-Homecard__Stats--beds text-nowrap">3 beds</span>
          <span class="bp-Homecard__Stats--baths text-nowrap">2 baths</span>
          <span class="bp-Homecard__LockedStat--value">1,450</span>
          <address>2750 Oak St, Vancouver, BC V6H 2K6</address>
        </a></div>"#;

fn cards_page(count: usize) -> String {
    format!("<html><body>{}</body></html>", CARD.repeat(count))
}

async fn mount_summary(server: &MockServer, region: &str, visible: u32, total: u32) {
    Mock::given(method("GET"))
        .and(path(viewport_path(region)))
        .respond_with(ResponseTemplate::new(200).set_body_string(summary_html(visible, total)))
        .with_priority(1)
        .mount(server)
        .await;
}

async fn mount_pages(server: &MockServer, region: &str, cards_per_page: usize) {
    Mock::given(method("GET"))
        .and(path_regex(format!(
            r"^{}/page-\d+$",
            regex_escape(&viewport_path(region))
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards_page(cards_per_page)))
        .with_priority(1)
        .mount(server)
        .await;
}

fn regex_escape(s: &str) -> String {
    s.replace('.', r"\.")
}

fn page_requests(requests: &[wiremock::Request]) -> usize {
    requests
        .iter()
        .filter(|r| r.url.path().contains("/page-"))
        .count()
}

fn parse(region: &str) -> Region {
    region.parse().expect("valid region")
}

// ---------------------------------------------------------------------------
// Single pass
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_region_is_paginated_through_last_page() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 40, 40).await;
    mount_pages(&server, REGION, 9).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator
        .run_pass(&[parse(REGION)])
        .await
        .expect("pass should succeed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(page_requests(&requests), 5);
    assert_eq!(run.pages_fetched, 5);
    assert_eq!(run.records.len(), 45);
    assert!(run.oversized.is_empty());
    assert!(run.incomplete.is_empty());
    assert_eq!(run.regions_probed, 1);
    assert!(requests
        .iter()
        .any(|r| r.url.path().ends_with("/page-5")));
    assert!(!requests
        .iter()
        .any(|r| r.url.path().ends_with("/page-6")));
}

#[tokio::test]
async fn oversized_region_fetches_no_pages() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 40, 260).await;
    mount_pages(&server, REGION, 9).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator.run_pass(&[parse(REGION)]).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(run.oversized, vec![parse(REGION)]);
    assert!(run.records.is_empty());
    assert_eq!(run.pages_fetched, 0);
}

#[tokio::test]
async fn region_without_listings_is_recorded_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(viewport_path(REGION)))
        .respond_with(ResponseTemplate::new(200).set_body_string(no_listings_html()))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator.run_pass(&[parse(REGION)]).await.unwrap();

    assert_eq!(run.empty, vec![parse(REGION)]);
    assert!(run.records.is_empty());
    assert!(run.oversized.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn skip_policy_moves_past_failed_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(viewport_path(REGION)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_summary(&server, OTHER_REGION, 9, 9).await;
    mount_pages(&server, OTHER_REGION, 9).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator
        .run_pass(&[parse(REGION), parse(OTHER_REGION)])
        .await
        .expect("skip policy should not fail the pass");

    assert_eq!(run.failed.len(), 1);
    assert_eq!(run.failed[0].region, parse(REGION));
    assert_eq!(run.failed[0].stage, FailureStage::Probe);
    assert!(run.failed[0].message.contains("500"));
    assert_eq!(run.records.len(), 9);
    assert_eq!(run.regions_probed, 2);
}

#[tokio::test]
async fn abort_policy_propagates_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(viewport_path(REGION)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_summary(&server, OTHER_REGION, 9, 9).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Abort));
    let result = orchestrator
        .run_pass(&[parse(REGION), parse(OTHER_REGION)])
        .await;

    assert!(
        matches!(result, Err(ScraperError::UnexpectedStatus { status: 500, .. })),
        "expected UnexpectedStatus(500), got: {:?}",
        result.map(|r| r.records.len())
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_page_keeps_earlier_pages() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 18, 18).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/page-1", viewport_path(REGION))))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards_page(9)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/page-2", viewport_path(REGION))))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator.run_pass(&[parse(REGION)]).await.unwrap();

    assert_eq!(run.records.len(), 9);
    assert_eq!(run.pages_fetched, 1);
    assert_eq!(run.failed.len(), 1);
    assert_eq!(run.failed[0].stage, FailureStage::Page(2));
}

#[tokio::test]
async fn incomplete_cards_are_keyed_by_region_and_page() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 2, 2).await;
    let page = format!(
        "<html><body>{}{}</body></html>",
        CARD,
        r#"<div class="HomeCardContainer"><address>1 Short</address></div>"#
    );
    Mock::given(method("GET"))
        .and(path(format!("{}/page-1", viewport_path(REGION))))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator.run_pass(&[parse(REGION)]).await.unwrap();

    assert_eq!(run.records.len(), 2);
    assert_eq!(run.incomplete[REGION][&1], vec![1]);
    assert_eq!(run.incomplete_count(), 1);
}

#[tokio::test]
async fn metadata_strategy_collects_records_and_review_items() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 3, 3).await;
    let property = json!([
        {
            "address": { "streetAddress": "2750 Oak St", "postalCode": "V6H 2K6" },
            "geo": { "latitude": 49.26, "longitude": -123.13 },
            "floorSize": { "value": 1450 },
            "numberOfRooms": 3,
            "url": "https://www.redfin.ca/home/1"
        },
        { "offers": { "price": 1_249_000 } }
    ]);
    let broken_event = json!({ "@type": "Event", "location": { "name": "1 Main St" } });
    let page = format!(
        r#"<html><head>
        <script type="application/ld+json">{{"@type":"Organization"}}</script>
        <script type="application/ld+json">{property}</script>
        <script type="application/ld+json">{broken_event}</script>
        </head><body></body></html>"#
    );
    Mock::given(method("GET"))
        .and(path(format!("{}/page-1", viewport_path(REGION))))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let extractor = MetadataExtractor::new();
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let run = orchestrator.run_pass(&[parse(REGION)]).await.unwrap();

    assert_eq!(run.records_of(RecordKind::Property).count(), 1);
    assert_eq!(run.needs_review.len(), 1);
    assert_eq!(run.needs_review[0].page, 1);
    assert_eq!(run.needs_review[0].block.index, 2);
}

// ---------------------------------------------------------------------------
// Adaptive refinement
// ---------------------------------------------------------------------------

async fn mount_no_listings_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"/filter/viewport=[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(no_listings_html()))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn oversized_region_is_refined_in_next_pass() {
    let server = MockServer::start().await;
    let refine = GridSpec::new(2, 2).unwrap();
    let quarters = partition(&parse(REGION), refine).unwrap();
    let first_quarter = quarters[0].to_string();

    mount_summary(&server, REGION, 350, 1204).await;
    mount_summary(&server, &first_quarter, 9, 9).await;
    mount_pages(&server, &first_quarter, 9).await;
    mount_no_listings_fallback(&server).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let result = orchestrator
        .run_adaptive(&[parse(REGION)], refine, 1)
        .await
        .expect("adaptive run should succeed");

    assert_eq!(result.passes.len(), 2);
    assert_eq!(result.passes[0].oversized, vec![parse(REGION)]);
    assert_eq!(result.passes[1].regions_probed, 4);
    assert_eq!(result.passes[1].records.len(), 9);
    assert_eq!(result.passes[1].empty.len(), 3);
    assert!(result.unresolved.is_empty());
    assert_eq!(result.total_records(), 9);
    assert_eq!(result.incomplete_records(), 0);
}

#[tokio::test]
async fn depth_cap_leaves_oversized_regions_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/filter/viewport=[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(summary_html(350, 1204)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let refine = GridSpec::new(2, 2).unwrap();
    let result = orchestrator
        .run_adaptive(&[parse(REGION)], refine, 1)
        .await
        .unwrap();

    assert_eq!(result.passes.len(), 2);
    assert_eq!(result.unresolved.len(), 4);
    assert!(result
        .unresolved
        .iter()
        .all(|r| parse(REGION).contains(r)));
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
}

#[tokio::test]
async fn zero_depth_runs_a_single_pass() {
    let server = MockServer::start().await;
    mount_summary(&server, REGION, 40, 260).await;

    let client = test_client(&server);
    let extractor = cards(&client);
    let orchestrator =
        BatchOrchestrator::new(&client, &extractor, settings(RegionErrorPolicy::Skip));
    let result = orchestrator
        .run_adaptive(&[parse(REGION)], GridSpec::new(2, 2).unwrap(), 0)
        .await
        .unwrap();

    assert_eq!(result.passes.len(), 1);
    assert_eq!(result.unresolved, vec![parse(REGION)]);
}
