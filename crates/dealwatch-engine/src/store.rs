//! Storage collaborator interface.
//!
//! Persistence is an external collaborator; the pipeline only depends on
//! this trait. [`MemoryStore`] backs tests and the CLI dry-run.

use async_trait::async_trait;
use chrono::Utc;
use dealwatch_core::deal::{Deal, DealStatus};
use dealwatch_core::delivery::DeliveryRecord;
use dealwatch_core::destination::Destination;
use dealwatch_core::ids::Asin;
use dealwatch_core::product::{PriceObservation, Product};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Failure reported by the storage collaborator.
///
/// Logged and counted by the pipeline; never aborts a cycle.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Persistence operations consumed by the pipeline.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Upsert a product observation, returning its storage id.
    async fn insert_or_update_product(&self, product: &Product) -> Result<i64, StoreError>;

    /// Record one price sample.
    async fn insert_price_observation(&self, observation: &PriceObservation)
        -> Result<(), StoreError>;

    /// Commit a deal against a stored product, returning the deal id.
    async fn insert_deal(&self, deal: &Deal, product_id: i64) -> Result<i64, StoreError>;

    /// Price samples for an item, oldest to newest, at most `limit`.
    async fn price_history(&self, asin: &Asin, limit: usize) -> Result<Vec<PriceObservation>, StoreError>;

    /// Currently active deals, best ranked first.
    async fn get_active_deals(&self, limit: usize) -> Result<Vec<Deal>, StoreError>;

    /// Destinations eligible for broadcast.
    async fn active_destinations(&self) -> Result<Vec<Destination>, StoreError>;

    /// Record one delivery attempt.
    async fn insert_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError>;

    /// Append to the activity log.
    async fn log_activity(
        &self,
        kind: &str,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    next_id: i64,
    products: HashMap<Asin, (i64, Product)>,
    price_history: HashMap<Asin, Vec<PriceObservation>>,
    deals: Vec<(i64, Deal)>,
    destinations: Vec<Destination>,
    deliveries: Vec<DeliveryRecord>,
    activity: Vec<(String, String, serde_json::Value)>,
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination for broadcast.
    pub fn add_destination(&self, destination: Destination) {
        self.lock().destinations.push(destination);
    }

    /// Snapshot of all recorded delivery attempts.
    pub fn deliveries(&self) -> Vec<DeliveryRecord> {
        self.lock().deliveries.clone()
    }

    /// Snapshot of all recorded price samples for an item.
    pub fn recorded_prices(&self, asin: &Asin) -> Vec<f64> {
        self.lock()
            .price_history
            .get(asin)
            .map(|samples| samples.iter().map(|s| s.price).collect())
            .unwrap_or_default()
    }

    /// Number of committed deals.
    pub fn deal_count(&self) -> usize {
        self.lock().deals.len()
    }

    /// Activity log entries of a given kind.
    pub fn activity_of_kind(&self, kind: &str) -> usize {
        self.lock()
            .activity
            .iter()
            .filter(|(k, _, _)| k == kind)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn insert_or_update_product(&self, product: &Product) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        if let Some((id, stored)) = inner.products.get_mut(&product.asin) {
            let id = *id;
            *stored = product.clone();
            return Ok(id);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .products
            .insert(product.asin.clone(), (id, product.clone()));
        Ok(id)
    }

    async fn insert_price_observation(
        &self,
        observation: &PriceObservation,
    ) -> Result<(), StoreError> {
        self.lock()
            .price_history
            .entry(observation.asin.clone())
            .or_default()
            .push(observation.clone());
        Ok(())
    }

    async fn insert_deal(&self, deal: &Deal, _product_id: i64) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.deals.push((id, deal.clone()));
        Ok(id)
    }

    async fn price_history(&self, asin: &Asin, limit: usize) -> Result<Vec<PriceObservation>, StoreError> {
        let inner = self.lock();
        let samples = inner.price_history.get(asin).cloned().unwrap_or_default();
        let start = samples.len().saturating_sub(limit);
        Ok(samples[start..].to_vec())
    }

    async fn get_active_deals(&self, limit: usize) -> Result<Vec<Deal>, StoreError> {
        let now = Utc::now();
        let mut deals: Vec<Deal> = self
            .lock()
            .deals
            .iter()
            .map(|(_, deal)| deal.clone())
            .filter(|deal| deal.status == DealStatus::Active && deal.is_current(now))
            .collect();
        deals.sort_by_key(|deal| deal.priority_rank);
        deals.truncate(limit);
        Ok(deals)
    }

    async fn active_destinations(&self) -> Result<Vec<Destination>, StoreError> {
        Ok(self
            .lock()
            .destinations
            .iter()
            .filter(|d| d.active)
            .cloned()
            .collect())
    }

    async fn insert_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        self.lock().deliveries.push(record.clone());
        Ok(())
    }

    async fn log_activity(
        &self,
        kind: &str,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.lock()
            .activity
            .push((kind.to_string(), description.to_string(), metadata));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dealwatch_core::product::Product;

    fn product(asin: &str, price: f64) -> Product {
        let mut p = Product::new(
            Asin::new(asin).unwrap(),
            "Stored item",
            format!("https://example.com/dp/{asin}"),
            Utc::now(),
        );
        p.current_price = Some(price);
        p
    }

    #[tokio::test]
    async fn test_upsert_keeps_id() {
        let store = MemoryStore::new();
        let first = store
            .insert_or_update_product(&product("B0TEST0001", 100.0))
            .await
            .unwrap();
        let second = store
            .insert_or_update_product(&product("B0TEST0001", 90.0))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_price_history_limit_and_order() {
        let store = MemoryStore::new();
        let asin = Asin::new("B0TEST0001").unwrap();
        for price in [100.0, 95.0, 90.0, 85.0] {
            let p = product("B0TEST0001", price);
            store
                .insert_price_observation(&p.price_observation().unwrap())
                .await
                .unwrap();
        }
        let history = store.price_history(&asin, 3).await.unwrap();
        let prices: Vec<f64> = history.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![95.0, 90.0, 85.0]);
    }

    #[tokio::test]
    async fn test_active_destinations_filters_inactive() {
        use dealwatch_core::destination::{Destination, DestinationKind};
        let store = MemoryStore::new();
        store.add_destination(Destination::new("a", "A", DestinationKind::Channel));
        let mut off = Destination::new("b", "B", DestinationKind::User);
        off.active = false;
        store.add_destination(off);

        let active = store.active_destinations().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.as_str(), "a");
    }
}
