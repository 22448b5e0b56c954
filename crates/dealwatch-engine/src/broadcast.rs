//! Broadcast fan-out.
//!
//! Sends a ranked deal batch to every active destination, one message at a
//! time per destination, honoring transport throttle signals up to a
//! bounded cumulative wait.

use crate::config::MessagingConfig;
use crate::store::DealStore;
use crate::transport::{OutboundMessage, Transport, TransportError};
use chrono::Utc;
use dealwatch_core::deal::Deal;
use dealwatch_core::delivery::DeliveryRecord;
use dealwatch_core::destination::Destination;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result counters for one broadcast pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Destinations that received at least one message.
    pub destinations_reached: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

/// Fans a ranked batch out to subscribed destinations.
pub struct Broadcaster {
    transport: Arc<dyn Transport>,
    store: Arc<dyn DealStore>,
    config: MessagingConfig,
}

impl Broadcaster {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn DealStore>,
        config: MessagingConfig,
    ) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    /// Broadcast a ranked batch to every active destination.
    ///
    /// Per-destination sends are strictly sequential with a fixed pacing
    /// delay between them; a single failed delivery never aborts the
    /// destination's remaining sends, and a failing destination never
    /// aborts its siblings.
    pub async fn broadcast(&self, deals: &[Deal]) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        if deals.is_empty() {
            return outcome;
        }

        let destinations = match self.store.active_destinations().await {
            Ok(destinations) => destinations,
            Err(e) => {
                error!(error = %e, "could not list destinations for broadcast");
                return outcome;
            }
        };
        if destinations.is_empty() {
            warn!("no active destinations to broadcast to");
            return outcome;
        }

        for destination in &destinations {
            let batch: Vec<&Deal> = deals
                .iter()
                .filter(|deal| destination.preferences.accepts(deal))
                .take(self.config.max_deals_per_destination)
                .collect();
            if batch.is_empty() {
                continue;
            }

            let mut sent_here = 0;
            for deal in batch {
                if self.deliver(destination, deal).await {
                    sent_here += 1;
                    outcome.messages_sent += 1;
                } else {
                    outcome.messages_failed += 1;
                }
                tokio::time::sleep(self.config.pacing_delay()).await;
            }
            if sent_here > 0 {
                outcome.destinations_reached += 1;
                info!(destination = %destination.id, sent = sent_here, "broadcast to destination");
            }
        }

        info!(
            destinations = outcome.destinations_reached,
            sent = outcome.messages_sent,
            failed = outcome.messages_failed,
            "broadcast finished"
        );
        outcome
    }

    /// Attempt one delivery, retrying on throttle signals until the
    /// cumulative wait budget runs out. Exactly one DeliveryRecord is
    /// written per attempted delivery, success or failure.
    async fn deliver(&self, destination: &Destination, deal: &Deal) -> bool {
        let message = OutboundMessage::for_deal(deal, self.config.include_image);
        let budget = self.config.max_retry_wait();
        let mut waited = Duration::ZERO;

        let record = loop {
            match self.transport.send(&destination.id, &message).await {
                Ok(handle) => {
                    break DeliveryRecord::sent(
                        deal.asin.clone(),
                        destination.id.clone(),
                        handle,
                        Utc::now(),
                    );
                }
                Err(TransportError::Throttled { retry_after }) => {
                    let remaining = budget.saturating_sub(waited);
                    if remaining.is_zero() {
                        warn!(
                            destination = %destination.id,
                            asin = %deal.asin,
                            "throttle wait budget exhausted"
                        );
                        break DeliveryRecord::failed(
                            deal.asin.clone(),
                            destination.id.clone(),
                            "throttle wait budget exhausted",
                            Utc::now(),
                        );
                    }
                    // honor the advised wait, clamped to what is left
                    let wait = retry_after.min(remaining);
                    waited += wait;
                    warn!(
                        destination = %destination.id,
                        wait_ms = wait.as_millis() as u64,
                        "transport throttled, waiting"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    warn!(destination = %destination.id, asin = %deal.asin, error = %e, "delivery failed");
                    break DeliveryRecord::failed(
                        deal.asin.clone(),
                        destination.id.clone(),
                        e.to_string(),
                        Utc::now(),
                    );
                }
            }
        };

        let delivered = record.message_handle.is_some();
        if let Err(e) = self.store.insert_delivery(&record).await {
            error!(error = %e, "could not record delivery");
        }
        if delivered {
            let _ = self
                .store
                .log_activity(
                    "deal_sent",
                    &format!("sent {} to {}", deal.asin, destination.id),
                    json!({ "discount": deal.discount_percentage }),
                )
                .await;
        }
        delivered
    }
}
