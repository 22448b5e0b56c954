//! Deals and the label vocabulary attached to them.

use crate::ids::Asin;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a deal, ordered by how aggressive the markdown is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealType {
    /// Very deep markdown, short-lived.
    Lightning,
    /// Deep markdown, typically refreshed daily.
    Daily,
    /// Moderate markdown on items being cleared out.
    Clearance,
    /// Driven by a coupon badge rather than a price cut.
    Coupon,
    /// Modest markdown.
    Weekly,
    /// Anything that qualifies but fits no other bucket.
    Other,
}

impl DealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealType::Lightning => "lightning",
            DealType::Daily => "daily",
            DealType::Clearance => "clearance",
            DealType::Coupon => "coupon",
            DealType::Weekly => "weekly",
            DealType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lightning" => Some(DealType::Lightning),
            "daily" => Some(DealType::Daily),
            "clearance" => Some(DealType::Clearance),
            "coupon" => Some(DealType::Coupon),
            "weekly" => Some(DealType::Weekly),
            "other" => Some(DealType::Other),
            _ => None,
        }
    }

    /// Classify a qualifying discount. First matching rule wins:
    /// ≥50 lightning, ≥30 daily, ≥20 with a clearance title clearance,
    /// coupon badge coupon, ≥15 weekly, otherwise other.
    pub fn classify(discount: f64, is_clearance: bool, has_coupon: bool) -> Self {
        if discount >= 50.0 {
            DealType::Lightning
        } else if discount >= 30.0 {
            DealType::Daily
        } else if discount >= 20.0 && is_clearance {
            DealType::Clearance
        } else if has_coupon {
            DealType::Coupon
        } else if discount >= 15.0 {
            DealType::Weekly
        } else {
            DealType::Other
        }
    }

    /// Estimated validity window for this kind of deal.
    pub fn validity_duration(&self) -> Duration {
        match self {
            DealType::Lightning => Duration::hours(6),
            DealType::Daily => Duration::days(1),
            DealType::Weekly => Duration::days(7),
            DealType::Clearance => Duration::days(30),
            DealType::Coupon => Duration::days(14),
            DealType::Other => Duration::days(3),
        }
    }
}

/// Lifecycle state of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DealStatus {
    #[default]
    Active,
    Expired,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Active => "active",
            DealStatus::Expired => "expired",
        }
    }
}

/// Direction of an item's recent price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceTrend {
    Rising,
    Declining,
    Stable,
    InsufficientData,
}

impl PriceTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTrend::Rising => "rising",
            PriceTrend::Declining => "declining",
            PriceTrend::Stable => "stable",
            PriceTrend::InsufficientData => "insufficient_data",
        }
    }

    /// Judge the trend from price samples ordered oldest to newest.
    ///
    /// Considers at most the last 10 samples and needs at least 3 to
    /// judge: the mean of the newest 3 is compared against the mean of the
    /// rest, with a 10% band on either side counting as stable.
    pub fn from_samples(samples: &[f64]) -> Self {
        let window = if samples.len() > 10 {
            &samples[samples.len() - 10..]
        } else {
            samples
        };
        if window.len() < 3 {
            return PriceTrend::InsufficientData;
        }

        let split = window.len() - 3;
        let (older, recent) = window.split_at(split);
        if older.is_empty() {
            return PriceTrend::Stable;
        }

        let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
        let older_avg = older.iter().sum::<f64>() / older.len() as f64;

        if recent_avg > older_avg * 1.1 {
            PriceTrend::Rising
        } else if recent_avg < older_avg * 0.9 {
            PriceTrend::Declining
        } else {
            PriceTrend::Stable
        }
    }
}

/// Overall strength of a deal, keyed by (discount, quality score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStrength {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Weak,
}

impl DealStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStrength::Excellent => "excellent",
            DealStrength::VeryGood => "very_good",
            DealStrength::Good => "good",
            DealStrength::Fair => "fair",
            DealStrength::Weak => "weak",
        }
    }

    /// Deterministic lookup keyed by discount percentage and quality score.
    pub fn assess(discount: f64, quality: f64) -> Self {
        if discount >= 50.0 && quality >= 8.0 {
            DealStrength::Excellent
        } else if discount >= 30.0 && quality >= 7.0 {
            DealStrength::VeryGood
        } else if discount >= 20.0 && quality >= 6.0 {
            DealStrength::Good
        } else if discount >= 15.0 && quality >= 5.0 {
            DealStrength::Fair
        } else {
            DealStrength::Weak
        }
    }
}

/// How quickly a subscriber should act on a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    /// Deterministic lookup keyed by deal type and quality score.
    pub fn assess(deal_type: DealType, quality: f64) -> Self {
        if deal_type == DealType::Lightning || quality >= 9.0 {
            Urgency::High
        } else if matches!(deal_type, DealType::Daily | DealType::Clearance) || quality >= 7.0 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Audience segment a deal is likely to interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    BudgetConscious,
    PremiumBuyers,
    TechEnthusiasts,
    FashionLovers,
    Homeowners,
    Readers,
    General,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::BudgetConscious => "budget_conscious",
            Audience::PremiumBuyers => "premium_buyers",
            Audience::TechEnthusiasts => "tech_enthusiasts",
            Audience::FashionLovers => "fashion_lovers",
            Audience::Homeowners => "homeowners",
            Audience::Readers => "readers",
            Audience::General => "general",
        }
    }

    /// Derive audience tags from the price band and title keywords.
    /// Falls back to a single `General` tag when nothing matches.
    pub fn identify(title: &str, price: f64) -> Vec<Self> {
        let title = title.to_lowercase();
        let mut audiences = Vec::new();

        if price <= 100.0 {
            audiences.push(Audience::BudgetConscious);
        } else if price >= 1000.0 {
            audiences.push(Audience::PremiumBuyers);
        }

        let keyword_sets: [(&[&str], Audience); 4] = [
            (&["laptop", "computer", "gaming"], Audience::TechEnthusiasts),
            (&["fashion", "clothing", "shoes"], Audience::FashionLovers),
            (&["home", "kitchen", "furniture"], Audience::Homeowners),
            (&["book", "kindle"], Audience::Readers),
        ];
        for (keywords, audience) in keyword_sets {
            if keywords.iter().any(|k| title.contains(k)) {
                audiences.push(audience);
                break;
            }
        }

        if audiences.is_empty() {
            audiences.push(Audience::General);
        }
        audiences
    }
}

/// Labels computed alongside the score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealAnalysis {
    pub price_trend: PriceTrend,
    pub strength: DealStrength,
    pub urgency: Urgency,
    pub audiences: Vec<Audience>,
}

/// A scored, classified commercial opportunity derived from one Product
/// observation.
///
/// Created once per discovery cycle per qualifying Product. The status
/// transitions `Active -> Expired` by a time-based sweep outside the core;
/// nothing else mutates a committed deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    /// Catalog identifier of the underlying item.
    pub asin: Asin,
    /// Item title, carried for message composition.
    pub title: String,
    /// Item URL.
    pub url: String,
    /// Item image, when known.
    pub image_url: Option<String>,
    /// Search category that surfaced the item, when known.
    pub category: Option<String>,
    pub deal_type: DealType,
    pub original_price: f64,
    pub deal_price: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    /// Composite quality score in [0, 10], two-decimal precision.
    pub quality_score: f64,
    pub starts_at: DateTime<Utc>,
    /// Estimated end of the validity window.
    pub ends_at: Option<DateTime<Utc>>,
    pub status: DealStatus,
    /// 1-based position within the ranked batch; 0 until ranked.
    pub priority_rank: u32,
    /// Among the top 5 of its batch.
    pub is_featured: bool,
    /// Human-readable summary composed for outbound messages.
    pub summary: String,
    pub analysis: DealAnalysis,
}

impl Deal {
    /// Whether the deal is still inside its estimated validity window.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == DealStatus::Active && self.ends_at.map_or(true, |end| end > now)
    }
}
