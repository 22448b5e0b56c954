//! Fan-out destinations and their preference sets.

use crate::deal::{Deal, DealType};
use crate::ids::DestinationId;
use serde::{Deserialize, Serialize};

/// Kind of fan-out endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DestinationKind {
    /// A broadcast channel.
    #[default]
    Channel,
    /// A direct end-user chat.
    User,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Channel => "channel",
            DestinationKind::User => "user",
        }
    }
}

/// Per-destination delivery preferences.
///
/// Mutated only by the command front end; the core reads them when
/// filtering a broadcast batch. Empty allow-lists mean "everything".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// Master switch; a destination with notifications off receives nothing.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Minimum discount percentage a deal must carry.
    #[serde(default)]
    pub min_discount: f64,
    /// Maximum deal price this destination wants to see.
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Category allow-list.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Deal-type allow-list.
    #[serde(default)]
    pub deal_types: Vec<DealType>,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            min_discount: 0.0,
            max_price: None,
            categories: Vec::new(),
            deal_types: Vec::new(),
        }
    }
}

impl Preferences {
    /// Whether a deal passes this preference set.
    pub fn accepts(&self, deal: &Deal) -> bool {
        if !self.notifications_enabled {
            return false;
        }
        if deal.discount_percentage < self.min_discount {
            return false;
        }
        if let Some(max_price) = self.max_price {
            if deal.deal_price > max_price {
                return false;
            }
        }
        if !self.categories.is_empty() {
            // a deal with no category attribution passes an allow-list
            if let Some(category) = &deal.category {
                if !self.categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                    return false;
                }
            }
        }
        if !self.deal_types.is_empty() && !self.deal_types.contains(&deal.deal_type) {
            return false;
        }
        true
    }
}

/// A channel or end-user endpoint eligible to receive broadcast deals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Destination {
    /// Stable transport identifier.
    pub id: DestinationId,
    /// Display name.
    pub name: String,
    pub kind: DestinationKind,
    /// Inactive destinations are skipped entirely.
    pub active: bool,
    pub preferences: Preferences,
}

impl Destination {
    /// Create an active destination with default preferences.
    pub fn new(id: impl Into<DestinationId>, name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            active: true,
            preferences: Preferences::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{DealAnalysis, DealStatus, DealStrength, PriceTrend, Urgency};
    use crate::ids::Asin;
    use crate::prelude::Audience;
    use chrono::Utc;

    fn deal(price: f64, discount: f64, deal_type: DealType) -> Deal {
        Deal {
            asin: Asin::new("B0TEST0001").unwrap(),
            title: "Test".to_string(),
            url: "https://example.com/dp/B0TEST0001".to_string(),
            image_url: None,
            category: Some("electronics".to_string()),
            deal_type,
            original_price: price * 1.5,
            deal_price: price,
            discount_percentage: discount,
            discount_amount: price * 0.5,
            quality_score: 9.5,
            starts_at: Utc::now(),
            ends_at: None,
            status: DealStatus::Active,
            priority_rank: 0,
            is_featured: false,
            summary: String::new(),
            analysis: DealAnalysis {
                price_trend: PriceTrend::InsufficientData,
                strength: DealStrength::Good,
                urgency: Urgency::Medium,
                audiences: vec![Audience::General],
            },
        }
    }

    #[test]
    fn test_price_ceiling_filters_high_quality_deal() {
        let prefs = Preferences {
            max_price: Some(100.0),
            ..Preferences::default()
        };
        // quality 9.5 does not rescue a deal over the ceiling
        assert!(!prefs.accepts(&deal(150.0, 40.0, DealType::Daily)));
        assert!(prefs.accepts(&deal(99.0, 40.0, DealType::Daily)));
    }

    #[test]
    fn test_discount_floor() {
        let prefs = Preferences {
            min_discount: 30.0,
            ..Preferences::default()
        };
        assert!(!prefs.accepts(&deal(50.0, 20.0, DealType::Weekly)));
        assert!(prefs.accepts(&deal(50.0, 30.0, DealType::Daily)));
    }

    #[test]
    fn test_notifications_switch() {
        let prefs = Preferences {
            notifications_enabled: false,
            ..Preferences::default()
        };
        assert!(!prefs.accepts(&deal(10.0, 90.0, DealType::Lightning)));
    }

    #[test]
    fn test_deal_type_allow_list() {
        let prefs = Preferences {
            deal_types: vec![DealType::Lightning, DealType::Daily],
            ..Preferences::default()
        };
        assert!(prefs.accepts(&deal(50.0, 55.0, DealType::Lightning)));
        assert!(!prefs.accepts(&deal(50.0, 18.0, DealType::Weekly)));
    }

    #[test]
    fn test_category_allow_list() {
        let prefs = Preferences {
            categories: vec!["Electronics".to_string()],
            ..Preferences::default()
        };
        assert!(prefs.accepts(&deal(50.0, 40.0, DealType::Daily)));

        let prefs = Preferences {
            categories: vec!["books".to_string()],
            ..Preferences::default()
        };
        assert!(!prefs.accepts(&deal(50.0, 40.0, DealType::Daily)));

        // a deal without category attribution passes any allow-list
        let mut uncategorized = deal(50.0, 40.0, DealType::Daily);
        uncategorized.category = None;
        assert!(prefs.accepts(&uncategorized));
    }
}
