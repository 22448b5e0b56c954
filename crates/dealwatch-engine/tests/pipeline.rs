//! End-to-end pipeline tests over an in-memory store, a recording
//! transport, and a scripted HTTP catalog.

use async_trait::async_trait;
use dealwatch_core::deal::DealType;
use dealwatch_core::destination::{Destination, DestinationKind, Preferences};
use dealwatch_core::ids::Asin;
use dealwatch_engine::prelude::*;
use dealwatch_scrape::{FetchError, HttpResponse, HttpTransport, Identity};
use std::sync::{Arc, Mutex};

/// Catalog fake: search requests pop responses from a script; the deals
/// page is always an empty 200.
struct ScriptedCatalog {
    search_script: Mutex<Vec<(u16, String)>>,
}

impl ScriptedCatalog {
    fn new(mut search_script: Vec<(u16, String)>) -> Self {
        search_script.reverse();
        Self {
            search_script: Mutex::new(search_script),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedCatalog {
    async fn get(&self, url: &str, _identity: &Identity) -> Result<HttpResponse, FetchError> {
        if url.contains("/deals") {
            return Ok(HttpResponse {
                status: 200,
                body: "<html><body></body></html>".to_string(),
            });
        }
        let (status, body) = self
            .search_script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or((200, "<html><body></body></html>".to_string()));
        Ok(HttpResponse { status, body })
    }
}

fn container(asin: &str, current: &str, was: &str) -> String {
    format!(
        r#"<div data-component-type="s-search-result" data-asin="{asin}">
            <h2><a href="/dp/{asin}"><span>Discounted widget</span></a></h2>
            <span class="a-price-whole">{current}</span>
            <span class="a-price-was">{was}</span>
        </div>"#
    )
}

fn page(containers: &[String]) -> String {
    format!("<html><body>{}</body></html>", containers.join(""))
}

fn config() -> Config {
    Config {
        scraping: ScrapingConfig {
            base_url: "https://catalog.test".to_string(),
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_retries: 3,
            backoff_base_ms: 1,
            backoff_floor_ms: 1,
            backoff_max_ms: 2,
            ..ScrapingConfig::default()
        },
        scheduling: SchedulingConfig {
            max_concurrent_workers: 1,
            max_search_terms: 1,
            base_phrases: vec!["deals".to_string()],
            extra_phrases: vec![],
            followup_terms: vec![],
            ..SchedulingConfig::default()
        },
        messaging: MessagingConfig {
            pacing_delay_ms: 0,
            ..MessagingConfig::default()
        },
        deals: DealsConfig {
            categories: vec!["electronics".to_string()],
            ..DealsConfig::default()
        },
    }
}

fn build(
    catalog: ScriptedCatalog,
) -> (
    DealsEngine<ScriptedCatalog>,
    Arc<MemoryStore>,
    Arc<RecordingTransport>,
) {
    let store = Arc::new(MemoryStore::new());
    let outbound = Arc::new(RecordingTransport::new());
    let engine = DealsEngine::new(
        config(),
        catalog,
        store.clone(),
        outbound.clone(),
        Arc::new(SystemClock),
    );
    (engine, store, outbound)
}

#[tokio::test]
async fn test_derived_discount_dedup_and_preference_filtering() {
    // three identical containers plus one expensive item
    let markup = page(&[
        container("B0SCENAR10", "100", "150"),
        container("B0SCENAR10", "100", "150"),
        container("B0SCENAR10", "100", "150"),
        container("B0EXPENSIV", "150", "300"),
    ]);
    let (engine, store, outbound) = build(ScriptedCatalog::new(vec![(200, markup)]));

    let mut picky = Destination::new("chan-1", "Picky", DestinationKind::Channel);
    picky.preferences = Preferences {
        max_price: Some(100.0),
        ..Preferences::default()
    };
    store.add_destination(picky);

    engine.initialize().await.unwrap();
    let metrics = engine.run_once().await;

    assert_eq!(metrics.products_scraped, 4);
    // identical identifiers collapse to one deal
    assert_eq!(metrics.deals_found, 2);
    assert_eq!(metrics.errors, 0);

    let deals = engine.get_active_deals(10).await.unwrap();
    let widget = deals
        .iter()
        .find(|d| d.asin.as_str() == "B0SCENAR10")
        .unwrap();
    // 100 current / 150 was
    assert_eq!(widget.discount_percentage, 33.33);
    assert_eq!(widget.deal_type, DealType::Daily);
    // 0.4 * 4.76 discount + 0.25 * 5 neutral rating + 0.2 * 8 price band
    assert_eq!(widget.quality_score, 4.75);

    // the 150-priced deal is filtered by the price ceiling, whatever its score
    assert_eq!(metrics.messages_sent, 1);
    assert_eq!(outbound.sent_to(&"chan-1".into()), 1);
    let deliveries = store.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].asin.as_str(), "B0SCENAR10");

    // both observations of the widget recorded price samples
    let asin = Asin::new("B0SCENAR10").unwrap();
    assert_eq!(store.recorded_prices(&asin).len(), 3);
}

#[tokio::test]
async fn test_throttled_search_recovers_within_retry_ceiling() {
    // two 429s then a healthy page, inside the 3-attempt ceiling
    let markup = page(&[container("B0RECOVERD", "80", "160")]);
    let (engine, _store, _outbound) = build(ScriptedCatalog::new(vec![
        (429, String::new()),
        (429, String::new()),
        (200, markup),
    ]));

    let metrics = engine.run_once().await;
    assert_eq!(metrics.errors, 0);
    assert_eq!(metrics.products_scraped, 1);
    assert_eq!(metrics.deals_found, 1);
}

#[tokio::test]
async fn test_persistent_throttle_counts_one_error_and_continues() {
    let (engine, _store, _outbound) = build(ScriptedCatalog::new(vec![
        (429, String::new()),
        (429, String::new()),
        (429, String::new()),
        (429, String::new()),
    ]));

    let metrics = engine.run_once().await;
    // the search worker failed; the cycle still completed
    assert_eq!(metrics.errors, 1);
    assert_eq!(metrics.products_scraped, 0);
    assert_eq!(metrics.deals_found, 0);

    let stats = engine.stats();
    assert_eq!(stats.cycles_completed, 1);
    assert_eq!(stats.errors_count, 1);
}
