//! Resilient fetch and markup extraction for the dealwatch pipeline.
//!
//! The fetch path is split into three layers:
//!
//! - [`IdentityRotator`] supplies an outbound request identity per attempt
//! - [`HttpTransport`] is the seam over the actual HTTP client
//! - [`Fetcher`] adds retry/backoff, throttle classification, and pacing
//!
//! On top of that, [`Extractor`] turns raw markup into [`Product`] records,
//! tolerating missing fields and malformed containers without ever failing
//! a whole page.
//!
//! [`Product`]: dealwatch_core::product::Product

pub mod error;
pub mod extract;
pub mod fetcher;
pub mod http;
pub mod identity;

pub use error::FetchError;
pub use extract::Extractor;
pub use fetcher::{BackoffStrategy, Fetcher, PacingWindow, RetryPolicy};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use identity::{Identity, IdentityRotator};
