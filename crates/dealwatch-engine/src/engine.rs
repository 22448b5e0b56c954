//! Cycle orchestrator.
//!
//! Drives one discovery cycle: fans the search worklist out to a bounded
//! worker pool, aggregates the extracted products, persists outcomes, and
//! hands the committed batch to the broadcast stage. The continuous loop
//! picks each inter-cycle delay from the peak-hour schedule and observes a
//! cooperative stop signal at every suspension point.

use crate::analyzer::DealAnalyzer;
use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::error::EngineError;
use crate::metrics::{CycleMetrics, SessionStats};
use crate::schedule::{Clock, Schedule};
use crate::store::{DealStore, StoreError};
use crate::transport::Transport;
use dealwatch_core::deal::Deal;
use dealwatch_core::ids::Asin;
use dealwatch_core::product::Product;
use dealwatch_scrape::{Extractor, Fetcher, FetchError, HttpTransport};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Price samples consulted for the trend label.
const TREND_WINDOW: usize = 10;

/// One unit of the per-cycle search worklist.
#[derive(Debug, Clone)]
struct WorkItem {
    term: String,
    category: Option<String>,
    followup: bool,
}

/// The deal-discovery engine.
pub struct DealsEngine<T: HttpTransport + 'static> {
    fetcher: Arc<Fetcher<T>>,
    extractor: Arc<Extractor>,
    analyzer: DealAnalyzer,
    broadcaster: Broadcaster,
    store: Arc<dyn DealStore>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    config: Config,
    stats: Mutex<SessionStats>,
}

impl<T: HttpTransport + 'static> DealsEngine<T> {
    pub fn new(
        config: Config,
        http: T,
        store: Arc<dyn DealStore>,
        outbound: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fetcher = Arc::new(Fetcher::new(
            http,
            config.scraping.identity_rotator(),
            config.scraping.retry_policy(),
            config.scraping.pacing_window(),
        ));
        let extractor = Arc::new(Extractor::new(config.scraping.base_url.clone()));
        let analyzer = DealAnalyzer::new(
            config.deals.clone(),
            config.messaging.max_message_length,
        );
        let broadcaster = Broadcaster::new(outbound, store.clone(), config.messaging.clone());
        let schedule = Schedule::from_config(&config.scheduling);

        Self {
            fetcher,
            extractor,
            analyzer,
            broadcaster,
            store,
            schedule,
            clock,
            config,
            stats: Mutex::new(SessionStats::default()),
        }
    }

    /// Verify the storage collaborator is reachable. A failure here is
    /// fatal and belongs to the process supervisor.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        self.store
            .log_activity("system", "deal engine initialized", json!({}))
            .await?;
        info!("deal engine initialized");
        Ok(())
    }

    /// Run discovery cycles until the stop signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting continuous deal monitoring");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let metrics = self.run_cycle(&shutdown).await;
            self.absorb(&metrics);

            if *shutdown.borrow() {
                break;
            }
            let delay = self.schedule.interval_at(self.clock.now());
            info!(delay_secs = delay.as_secs(), "next cycle scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("deal monitoring stopped");
    }

    /// Run a single cycle and fold it into the session stats.
    pub async fn run_once(&self) -> CycleMetrics {
        let (_tx, rx) = watch::channel(false);
        let metrics = self.run_cycle(&rx).await;
        self.absorb(&metrics);
        metrics
    }

    /// One full dispatch, aggregate, persist, broadcast pass.
    ///
    /// Failures inside any stage are logged and counted; the cycle always
    /// runs to completion rather than aborting the loop.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleMetrics {
        let cycle_start = self.clock.now();
        let mut metrics = CycleMetrics::default();
        info!("starting discovery cycle");

        let (products, aggregation_complete) = self.dispatch(shutdown, &mut metrics).await;
        metrics.products_scraped = products.len();

        let committed = self.persist(&products, &mut metrics).await;
        metrics.deals_found = committed.len();

        // never publish a partially aggregated cycle after cancellation
        if !committed.is_empty() && aggregation_complete {
            let outcome = self.broadcaster.broadcast(&committed).await;
            metrics.messages_sent = outcome.messages_sent;
            metrics.errors += outcome.messages_failed;
        }

        let elapsed = (self.clock.now() - cycle_start).num_seconds();
        info!(
            products = metrics.products_scraped,
            deals = metrics.deals_found,
            sent = metrics.messages_sent,
            errors = metrics.errors,
            elapsed_secs = elapsed,
            "discovery cycle finished"
        );
        metrics
    }

    /// Fan the worklist out to the bounded worker pool and collect every
    /// worker's products. Returns the aggregated batch and whether
    /// aggregation ran to completion (false when the stop signal cut
    /// dispatch short).
    async fn dispatch(
        &self,
        shutdown: &watch::Receiver<bool>,
        metrics: &mut CycleMetrics,
    ) -> (Vec<Product>, bool) {
        let worklist = self.build_worklist();
        let semaphore = Arc::new(Semaphore::new(
            self.config.scheduling.max_concurrent_workers.max(1),
        ));
        let mut workers: JoinSet<Result<Vec<Product>, FetchError>> = JoinSet::new();
        let mut aggregation_complete = true;

        for item in worklist {
            if *shutdown.borrow() {
                warn!("stop signal observed, no further worklist items dispatched");
                aggregation_complete = false;
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let fetcher = self.fetcher.clone();
            let extractor = self.extractor.clone();
            let base_url = self.config.scraping.base_url.clone();
            let threshold = self.config.scheduling.followup_threshold;
            workers.spawn(async move {
                let _permit = permit;
                scrape_term(&fetcher, &extractor, &base_url, &item, threshold).await
            });
        }

        let mut products = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(mut batch)) => products.append(&mut batch),
                Ok(Err(e)) => {
                    metrics.record_error();
                    warn!(error = %e, "search worker failed");
                }
                Err(e) => {
                    metrics.record_error();
                    error!(error = %e, "search worker did not complete");
                }
            }
        }

        if *shutdown.borrow() {
            aggregation_complete = false;
        } else {
            match self.scrape_deals_page().await {
                Ok(mut batch) => {
                    debug!(count = batch.len(), "deals page scraped");
                    products.append(&mut batch);
                }
                Err(e) => {
                    metrics.record_error();
                    warn!(error = %e, "deals page fetch failed");
                }
            }
        }

        (products, aggregation_complete)
    }

    /// Analyze and persist every product; commit the deduped, ranked deal
    /// batch. A product that does not qualify still gets its price sample
    /// recorded for trend history.
    async fn persist(&self, products: &[Product], metrics: &mut CycleMetrics) -> Vec<Deal> {
        let mut product_ids: HashMap<Asin, i64> = HashMap::new();
        let mut candidates = Vec::new();

        for product in products {
            match self.process_product(product).await {
                Ok((product_id, deal)) => {
                    product_ids.insert(product.asin.clone(), product_id);
                    if let Some(deal) = deal {
                        candidates.push(deal);
                    }
                }
                Err(e) => {
                    metrics.record_error();
                    error!(asin = %product.asin, error = %e, "product persistence failed");
                }
            }
        }

        let batch = self.analyzer.rank(self.analyzer.dedup(candidates));
        let mut committed = Vec::with_capacity(batch.len());
        for deal in batch {
            let Some(product_id) = product_ids.get(&deal.asin).copied() else {
                continue;
            };
            match self.store.insert_deal(&deal, product_id).await {
                Ok(_) => {
                    let _ = self
                        .store
                        .log_activity(
                            "deal_found",
                            &format!("discovered deal, {}% off", deal.discount_percentage),
                            json!({
                                "asin": deal.asin.as_str(),
                                "quality_score": deal.quality_score,
                                "deal_type": deal.deal_type.as_str(),
                            }),
                        )
                        .await;
                    committed.push(deal);
                }
                Err(e) => {
                    metrics.record_error();
                    error!(asin = %deal.asin, error = %e, "deal commit failed");
                }
            }
        }
        committed
    }

    async fn process_product(
        &self,
        product: &Product,
    ) -> Result<(i64, Option<Deal>), StoreError> {
        let history = self.store.price_history(&product.asin, TREND_WINDOW).await?;
        let prices: Vec<f64> = history.iter().map(|sample| sample.price).collect();
        let deal = self.analyzer.evaluate(product, &prices, self.clock.now());

        let product_id = self.store.insert_or_update_product(product).await?;
        if let Some(observation) = product.price_observation() {
            self.store.insert_price_observation(&observation).await?;
        }
        Ok((product_id, deal))
    }

    async fn scrape_deals_page(&self) -> Result<Vec<Product>, FetchError> {
        let url = format!("{}/deals", self.config.scraping.base_url);
        let markup = self.fetcher.fetch(&url).await?;
        Ok(self.extractor.parse_deals_page(&markup))
    }

    /// Search terms for one cycle: categories crossed with the base
    /// phrases, then the standalone phrases, capped at the worklist limit.
    fn build_worklist(&self) -> Vec<WorkItem> {
        let scheduling = &self.config.scheduling;
        let mut items = Vec::new();

        for category in &self.config.deals.categories {
            for phrase in &scheduling.base_phrases {
                items.push(WorkItem {
                    term: format!("{category} {phrase}"),
                    category: Some(category.clone()),
                    followup: false,
                });
            }
        }
        for phrase in &scheduling.extra_phrases {
            items.push(WorkItem {
                term: phrase.clone(),
                category: None,
                followup: false,
            });
        }
        items.truncate(scheduling.max_search_terms);
        for item in &mut items {
            item.followup = scheduling.followup_terms.contains(&item.term);
        }
        items
    }

    /// Active deals for the command front end, best ranked first.
    pub async fn get_active_deals(&self, limit: usize) -> Result<Vec<Deal>, StoreError> {
        let mut deals = self.store.get_active_deals(limit).await?;
        for deal in &mut deals {
            if deal.summary.is_empty() {
                deal.summary = self.analyzer.compose_summary(deal);
            }
        }
        Ok(deals)
    }

    /// Aggregate counters for status and report commands.
    pub fn stats(&self) -> SessionStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn absorb(&self, metrics: &CycleMetrics) {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .absorb(metrics, self.clock.now());
    }
}

/// Fetch and extract one search term; a high-yield term from the
/// follow-up set earns a second page.
async fn scrape_term<T: HttpTransport>(
    fetcher: &Fetcher<T>,
    extractor: &Extractor,
    base_url: &str,
    item: &WorkItem,
    followup_threshold: usize,
) -> Result<Vec<Product>, FetchError> {
    let mut products = scrape_page(fetcher, extractor, base_url, item, 1).await?;

    if item.followup && products.len() >= followup_threshold {
        match scrape_page(fetcher, extractor, base_url, item, 2).await {
            Ok(mut more) => products.append(&mut more),
            Err(e) => warn!(term = %item.term, error = %e, "follow-up page fetch failed"),
        }
    }

    debug!(term = %item.term, count = products.len(), "search term scraped");
    Ok(products)
}

async fn scrape_page<T: HttpTransport>(
    fetcher: &Fetcher<T>,
    extractor: &Extractor,
    base_url: &str,
    item: &WorkItem,
    page: u32,
) -> Result<Vec<Product>, FetchError> {
    let url = format!("{base_url}/s");
    let page_param = page.to_string();
    let reference = format!("sr_pg_{page}");
    let markup = fetcher
        .fetch_with_params(
            &url,
            &[
                ("k", item.term.as_str()),
                ("page", page_param.as_str()),
                ("ref", reference.as_str()),
            ],
        )
        .await?;

    let mut products = extractor.parse_search_page(&markup);
    for product in &mut products {
        product.category = item.category.clone();
    }
    Ok(products)
}
