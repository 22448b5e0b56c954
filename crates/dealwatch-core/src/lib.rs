//! Domain types for the dealwatch discovery pipeline.
//!
//! This crate provides the records that flow through the pipeline:
//!
//! - **Product**: one observation of a catalog item at a point in time
//! - **Deal**: a scored, classified commercial opportunity derived from a Product
//! - **Destination**: a fan-out target with its preference set
//! - **DeliveryRecord**: one attempted send of a Deal to a Destination
//!
//! Records are created once and never mutated; a later observation of the
//! same catalog identifier supersedes an earlier one.

pub mod deal;
pub mod delivery;
pub mod destination;
pub mod error;
pub mod ids;
pub mod product;

pub use error::CoreError;
pub use ids::{Asin, DestinationId, MessageHandle};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::deal::{
        Audience, Deal, DealAnalysis, DealStatus, DealStrength, DealType, PriceTrend, Urgency,
    };
    pub use crate::delivery::{DeliveryRecord, DeliveryStatus};
    pub use crate::destination::{Destination, DestinationKind, Preferences};
    pub use crate::error::CoreError;
    pub use crate::ids::{Asin, DestinationId, MessageHandle};
    pub use crate::product::{Availability, PriceObservation, Product};
}

/// Round to two decimal places, the precision used for discount
/// percentages and quality scores throughout the pipeline.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(4.761904), 4.76);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(0.005), 0.01);
    }
}
