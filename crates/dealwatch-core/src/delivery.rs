//! Delivery records for attempted sends.

use crate::ids::{Asin, DestinationId, MessageHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// One attempted send of a Deal to a Destination.
///
/// Created by the broadcast stage after every attempt, success or failure,
/// and immutable thereafter. Owned by the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRecord {
    pub asin: Asin,
    pub destination_id: DestinationId,
    /// Transport message handle, present on successful sends.
    pub message_handle: Option<MessageHandle>,
    pub status: DeliveryStatus,
    /// Error detail for failed attempts.
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Record a successful send.
    pub fn sent(
        asin: Asin,
        destination_id: DestinationId,
        handle: MessageHandle,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            asin,
            destination_id,
            message_handle: Some(handle),
            status: DeliveryStatus::Sent,
            error: None,
            sent_at,
        }
    }

    /// Record a failed send with its error detail.
    pub fn failed(
        asin: Asin,
        destination_id: DestinationId,
        error: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            asin,
            destination_id,
            message_handle: None,
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
            sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_record() {
        let record = DeliveryRecord::sent(
            Asin::new("B0TEST0001").unwrap(),
            DestinationId::new("chan-1"),
            MessageHandle::new("msg-42"),
            Utc::now(),
        );
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert!(record.message_handle.is_some());
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failed_record() {
        let record = DeliveryRecord::failed(
            Asin::new("B0TEST0001").unwrap(),
            DestinationId::new("chan-1"),
            "rejected by transport",
            Utc::now(),
        );
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert!(record.message_handle.is_none());
        assert_eq!(record.error.as_deref(), Some("rejected by transport"));
    }
}
