//! Product observations and price samples.

use crate::ids::Asin;
use crate::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock state of an observed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Availability {
    /// Item is listed as in stock.
    InStock,
    /// Item is listed as out of stock.
    OutOfStock,
    /// Markup gave no usable availability signal.
    #[default]
    Unknown,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::OutOfStock => "out_of_stock",
            Availability::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_stock" => Some(Availability::InStock),
            "out_of_stock" => Some(Availability::OutOfStock),
            "unknown" => Some(Availability::Unknown),
            _ => None,
        }
    }
}

/// One observation of a catalog item at a point in time.
///
/// Produced by the extractor, consumed by the analyzer and the storage
/// collaborator. Never mutated; a later observation of the same `asin`
/// supersedes this one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Stable catalog identifier.
    pub asin: Asin,
    /// Item title as listed.
    pub title: String,
    /// Brand, when the markup carries one.
    pub brand: Option<String>,
    /// Primary image reference.
    pub image_url: Option<String>,
    /// Canonical item URL.
    pub url: String,
    /// Search category that produced this observation, when known.
    pub category: Option<String>,
    /// Observed price.
    pub current_price: Option<f64>,
    /// Observed list/original price.
    pub original_price: Option<f64>,
    /// Discount percentage from an explicit badge, or derived from prices.
    pub discount_percentage: Option<f64>,
    /// Star rating on a 0–5 scale.
    pub rating: Option<f64>,
    /// Number of reviews.
    pub review_count: Option<u64>,
    /// Stock state.
    pub availability: Availability,
    /// Expedited-shipping badge present.
    pub is_expedited: bool,
    /// Coupon badge present.
    pub has_coupon: bool,
    /// Seller name, when listed.
    pub seller_name: Option<String>,
    /// When this observation was taken.
    pub observed_at: DateTime<Utc>,
}

impl Product {
    /// Create a new observation with only the required fields set.
    pub fn new(asin: Asin, title: impl Into<String>, url: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            asin,
            title: title.into(),
            brand: None,
            image_url: None,
            url: url.into(),
            category: None,
            current_price: None,
            original_price: None,
            discount_percentage: None,
            rating: None,
            review_count: None,
            availability: Availability::Unknown,
            is_expedited: false,
            has_coupon: false,
            seller_name: None,
            observed_at,
        }
    }

    /// Discount derived from the price pair, rounded to two decimals.
    ///
    /// Only defined when both prices are known and `original > current`.
    pub fn derived_discount(&self) -> Option<f64> {
        match (self.original_price, self.current_price) {
            (Some(original), Some(current)) if original > current => {
                Some(round2((original - current) / original * 100.0))
            }
            _ => None,
        }
    }

    /// Return a copy with `discount_percentage` filled in from the price
    /// pair when no explicit badge value is present.
    pub fn with_derived_discount(&self) -> Self {
        let mut product = self.clone();
        if product.discount_percentage.is_none() {
            product.discount_percentage = self.derived_discount();
        }
        product
    }

    /// Whether the observation carries a usable price.
    pub fn has_price(&self) -> bool {
        self.current_price.is_some()
    }

    /// Price sample for trend history.
    pub fn price_observation(&self) -> Option<PriceObservation> {
        Some(PriceObservation {
            asin: self.asin.clone(),
            price: self.current_price?,
            availability: self.availability,
            seller_name: self.seller_name.clone(),
            is_expedited: self.is_expedited,
            observed_at: self.observed_at,
        })
    }
}

/// An immutable price sample tied to a catalog identifier and timestamp.
///
/// Created after each processed Product, read back later to reconstruct the
/// price trend. Owned by the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceObservation {
    pub asin: Asin,
    pub price: f64,
    pub availability: Availability,
    pub seller_name: Option<String>,
    pub is_expedited: bool,
    pub observed_at: DateTime<Utc>,
}
