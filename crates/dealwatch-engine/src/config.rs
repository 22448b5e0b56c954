//! Engine configuration.
//!
//! Every tunable of the pipeline lives here. The tree deserializes from a
//! TOML file; every field carries a default so a partial file is enough.

use dealwatch_scrape::{BackoffStrategy, IdentityRotator, PacingWindow, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the discovery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scraping: ScrapingConfig,
    pub deals: DealsConfig,
    pub scheduling: SchedulingConfig,
    pub messaging: MessagingConfig,
}

/// Fetch-layer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Catalog base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Lower bound of the post-fetch pacing window, milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the post-fetch pacing window, milliseconds.
    pub max_delay_ms: u64,
    /// Total attempt ceiling for throttled/unavailable responses.
    pub max_retries: u32,
    /// Base of the exponential retry backoff, milliseconds.
    pub backoff_base_ms: u64,
    /// Floor on any retry delay, milliseconds.
    pub backoff_floor_ms: u64,
    /// Ceiling on any retry delay, milliseconds.
    pub backoff_max_ms: u64,
    /// User-agent pool; empty falls back to the built-in list.
    pub user_agents: Vec<String>,
    /// Proxy pool; empty means direct connections.
    pub proxies: Vec<String>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.sa".to_string(),
            timeout_secs: 30,
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
            max_retries: 3,
            backoff_base_ms: 1_000,
            backoff_floor_ms: 1_000,
            backoff_max_ms: 30_000,
            user_agents: Vec::new(),
            proxies: Vec::new(),
        }
    }
}

impl ScrapingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries).with_backoff(BackoffStrategy::Exponential {
            base: Duration::from_millis(self.backoff_base_ms),
            floor: Duration::from_millis(self.backoff_floor_ms),
            max: Duration::from_millis(self.backoff_max_ms),
        })
    }

    pub fn pacing_window(&self) -> PacingWindow {
        PacingWindow::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    pub fn identity_rotator(&self) -> IdentityRotator {
        IdentityRotator::new(self.user_agents.clone(), self.proxies.clone())
    }
}

/// Weights applied to the quality sub-scores. They sum to 1.0 in the
/// default configuration but are not required to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub discount: f64,
    pub rating: f64,
    pub review_count: f64,
    pub price_range: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            discount: 0.4,
            rating: 0.25,
            review_count: 0.15,
            price_range: 0.2,
        }
    }
}

/// Deal qualification and scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DealsConfig {
    /// Minimum discount percentage for a Product to qualify at all.
    pub min_discount_percentage: f64,
    /// Lower bound of the acceptable deal price band.
    pub min_price: f64,
    /// Upper bound of the acceptable deal price band.
    pub max_price: f64,
    /// Search categories crossed with the base query phrases.
    pub categories: Vec<String>,
    /// Title keywords marking clearance items.
    pub clearance_keywords: Vec<String>,
    /// Brands granting the known-brand score bonus.
    pub known_brands: Vec<String>,
    pub quality_weights: QualityWeights,
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            min_discount_percentage: 20.0,
            min_price: 10.0,
            max_price: 5_000.0,
            categories: vec![
                "electronics".to_string(),
                "home".to_string(),
                "fashion".to_string(),
            ],
            clearance_keywords: vec![
                "clearance".to_string(),
                "outlet".to_string(),
                "last chance".to_string(),
                "final sale".to_string(),
            ],
            known_brands: vec![
                "samsung".to_string(),
                "apple".to_string(),
                "sony".to_string(),
                "lg".to_string(),
                "hp".to_string(),
                "dell".to_string(),
                "nike".to_string(),
                "adidas".to_string(),
            ],
            quality_weights: QualityWeights::default(),
        }
    }
}

/// Cycle timing and worker-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Inter-cycle delay outside peak hours, seconds.
    pub interval_secs: u64,
    /// Inter-cycle delay inside peak hours, seconds.
    pub peak_interval_secs: u64,
    /// First hour of the peak range, inclusive.
    pub peak_start_hour: u32,
    /// Last hour of the peak range, inclusive.
    pub peak_end_hour: u32,
    /// Worker ceiling for concurrent search fetches.
    pub max_concurrent_workers: usize,
    /// Cap on the per-cycle worklist.
    pub max_search_terms: usize,
    /// Phrases crossed with every category.
    pub base_phrases: Vec<String>,
    /// Standalone phrases appended to the worklist.
    pub extra_phrases: Vec<String>,
    /// Terms whose first page earns a page-2 follow-up when it yields
    /// at least `followup_threshold` products.
    pub followup_terms: Vec<String>,
    pub followup_threshold: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            peak_interval_secs: 1_800,
            peak_start_hour: 18,
            peak_end_hour: 23,
            max_concurrent_workers: 5,
            max_search_terms: 20,
            base_phrases: vec![
                "deals".to_string(),
                "offers".to_string(),
                "discount".to_string(),
                "sale".to_string(),
            ],
            extra_phrases: vec![
                "lightning deals".to_string(),
                "daily deals".to_string(),
                "clearance".to_string(),
                "best sellers discount".to_string(),
            ],
            followup_terms: vec!["deals".to_string(), "offers".to_string()],
            followup_threshold: 15,
        }
    }
}

/// Broadcast fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Per-destination send cap per batch.
    pub max_deals_per_destination: usize,
    /// Fixed pause between sends to one destination, milliseconds.
    pub pacing_delay_ms: u64,
    /// Cumulative throttle-wait budget per delivery, seconds.
    pub max_retry_wait_secs: u64,
    /// Outbound message length cap.
    pub max_message_length: usize,
    /// Attach the item image when one is known.
    pub include_image: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_deals_per_destination: 5,
            pacing_delay_ms: 1_000,
            max_retry_wait_secs: 300,
            max_message_length: 4_096,
            include_image: true,
        }
    }
}

impl MessagingConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn max_retry_wait(&self) -> Duration {
        Duration::from_secs(self.max_retry_wait_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = QualityWeights::default();
        let sum = w.discount + w.rating + w.review_count + w.price_range;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = ScrapingConfig::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert!(config.deals.min_price < config.deals.max_price);
        assert!(config.scheduling.peak_interval_secs <= config.scheduling.interval_secs);
        assert_eq!(config.messaging.max_deals_per_destination, 5);
    }
}
