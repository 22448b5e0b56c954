//! Messaging transport interface.
//!
//! The channel transport is an external collaborator; the broadcast stage
//! only depends on this trait. Throttling is a first-class outcome: the
//! transport reports the wait it wants, and the broadcaster decides how
//! much of it to honor.

use async_trait::async_trait;
use dealwatch_core::deal::Deal;
use dealwatch_core::ids::{DestinationId, MessageHandle};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the messaging transport.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The transport asked us to slow down and suggested a wait.
    #[error("Transport throttled, retry after {retry_after:?}")]
    Throttled { retry_after: Duration },

    /// The destination refused the message (blocked, gone, forbidden).
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Anything else.
    #[error("Transport error: {0}")]
    Unknown(String),
}

/// One outbound message, composed from a deal.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
}

impl OutboundMessage {
    /// Compose the message for a deal.
    pub fn for_deal(deal: &Deal, include_image: bool) -> Self {
        Self {
            text: deal.summary.clone(),
            image_url: if include_image {
                deal.image_url.clone()
            } else {
                None
            },
            link_url: Some(deal.url.clone()),
        }
    }
}

/// Send side of the messaging transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one message, returning the transport's message handle.
    async fn send(
        &self,
        destination: &DestinationId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError>;
}

/// Test transport that records every send and can replay scripted
/// failures before succeeding.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(DestinationId, OutboundMessage)>>,
    script: Mutex<Vec<TransportError>>,
    counter: Mutex<u64>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error to be returned before the next successful send.
    pub fn fail_next(&self, error: TransportError) {
        self.script.lock().unwrap().push(error);
    }

    /// Messages successfully sent, in order.
    pub fn sent(&self) -> Vec<(DestinationId, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of successful sends to one destination.
    pub fn sent_to(&self, destination: &DestinationId) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == destination)
            .count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        destination: &DestinationId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError> {
        let scripted = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };
        if let Some(error) = scripted {
            return Err(error);
        }
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let handle = MessageHandle::new(format!("msg-{}", *counter));
        self.sent
            .lock()
            .unwrap()
            .push((destination.clone(), message.clone()));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_transport_scripted_failure() {
        let transport = RecordingTransport::new();
        transport.fail_next(TransportError::Rejected("blocked".to_string()));

        let destination = DestinationId::new("chan-1");
        let message = OutboundMessage {
            text: "hello".to_string(),
            image_url: None,
            link_url: None,
        };

        assert!(transport.send(&destination, &message).await.is_err());
        let handle = transport.send(&destination, &message).await.unwrap();
        assert_eq!(handle.as_str(), "msg-1");
        assert_eq!(transport.sent_to(&destination), 1);
    }
}
