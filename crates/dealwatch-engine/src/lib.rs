//! Scoring, orchestration, and broadcast fan-out for the dealwatch
//! pipeline.
//!
//! The [`DealsEngine`] drives discovery cycles: it fans search terms out
//! to a bounded worker pool, runs every extracted product through the
//! [`DealAnalyzer`], persists outcomes through the [`DealStore`]
//! collaborator, and hands committed batches to the [`Broadcaster`].
//!
//! Storage and messaging are external collaborators reached only through
//! the [`DealStore`] and [`Transport`] traits; in-memory implementations
//! back tests and dry runs.
//!
//! [`DealsEngine`]: engine::DealsEngine
//! [`DealAnalyzer`]: analyzer::DealAnalyzer
//! [`DealStore`]: store::DealStore
//! [`Broadcaster`]: broadcast::Broadcaster
//! [`Transport`]: transport::Transport

pub mod analyzer;
pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod schedule;
pub mod store;
pub mod transport;

pub use analyzer::DealAnalyzer;
pub use broadcast::{BroadcastOutcome, Broadcaster};
pub use config::Config;
pub use engine::DealsEngine;
pub use error::EngineError;
pub use metrics::{CycleMetrics, SessionStats};
pub use schedule::{Clock, FixedClock, Schedule, SystemClock};
pub use store::{DealStore, MemoryStore, StoreError};
pub use transport::{OutboundMessage, RecordingTransport, Transport, TransportError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::analyzer::DealAnalyzer;
    pub use crate::broadcast::{BroadcastOutcome, Broadcaster};
    pub use crate::config::{
        Config, DealsConfig, MessagingConfig, QualityWeights, SchedulingConfig, ScrapingConfig,
    };
    pub use crate::engine::DealsEngine;
    pub use crate::error::EngineError;
    pub use crate::metrics::{CycleMetrics, SessionStats};
    pub use crate::schedule::{Clock, FixedClock, Schedule, SystemClock};
    pub use crate::store::{DealStore, MemoryStore, StoreError};
    pub use crate::transport::{
        OutboundMessage, RecordingTransport, Transport, TransportError,
    };
}
