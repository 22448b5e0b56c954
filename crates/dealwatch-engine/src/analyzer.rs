//! Deal qualification, scoring, and batch ranking.

use crate::config::{DealsConfig, QualityWeights};
use chrono::{DateTime, Utc};
use dealwatch_core::deal::{
    Audience, Deal, DealAnalysis, DealStatus, DealStrength, DealType, PriceTrend, Urgency,
};
use dealwatch_core::product::{Availability, Product};
use dealwatch_core::round2;
use std::collections::HashSet;
use tracing::debug;

/// Quality score below which a deal is never published.
const SIGNIFICANCE_FLOOR: f64 = 4.0;

/// Batch positions marked as featured.
const FEATURED_COUNT: usize = 5;

/// Decides whether a Product represents a deal, scores it, classifies it,
/// and ranks whole batches.
///
/// `evaluate` is a pure function of its inputs: the gate check never
/// mutates the Product it was given, and the clock is passed in.
pub struct DealAnalyzer {
    config: DealsConfig,
    max_message_length: usize,
}

impl DealAnalyzer {
    pub fn new(config: DealsConfig, max_message_length: usize) -> Self {
        Self {
            config,
            max_message_length,
        }
    }

    /// Analyze one Product against its price history.
    ///
    /// `price_history` is the item's prior price samples ordered oldest to
    /// newest, not including this observation. Returns `None` for the
    /// normal "no deal" outcome.
    pub fn evaluate(
        &self,
        product: &Product,
        price_history: &[f64],
        now: DateTime<Utc>,
    ) -> Option<Deal> {
        let product = self.qualify(product)?;
        let current = product.current_price?;
        let discount = product.discount_percentage.unwrap_or(0.0);
        let original = product.original_price.unwrap_or(current);
        let discount_amount = if original > current {
            round2(original - current)
        } else {
            0.0
        };

        let deal_type = DealType::classify(
            discount,
            self.is_clearance(&product.title),
            product.has_coupon,
        );
        let quality_score = self.quality_score(&product);

        // stricter than the qualification gate: quality and price band
        if quality_score < SIGNIFICANCE_FLOOR
            || discount < self.config.min_discount_percentage
            || current < self.config.min_price
            || current > self.config.max_price
        {
            debug!(asin = %product.asin, quality_score, discount, "deal not significant");
            return None;
        }

        let analysis = DealAnalysis {
            price_trend: PriceTrend::from_samples(price_history),
            strength: DealStrength::assess(discount, quality_score),
            urgency: Urgency::assess(deal_type, quality_score),
            audiences: Audience::identify(&product.title, current),
        };

        let mut deal = Deal {
            asin: product.asin.clone(),
            title: product.title.clone(),
            url: product.url.clone(),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            deal_type,
            original_price: original,
            deal_price: current,
            discount_percentage: discount,
            discount_amount,
            quality_score,
            starts_at: now,
            ends_at: Some(now + deal_type.validity_duration()),
            status: DealStatus::Active,
            priority_rank: 0,
            is_featured: false,
            summary: String::new(),
            analysis,
        };
        deal.summary = self.compose_summary(&deal);
        Some(deal)
    }

    /// Discount gate. Passes when the explicit discount meets the
    /// configured minimum, or the discount derived from the price pair
    /// does; in the derived case the returned Product carries the value.
    fn qualify(&self, product: &Product) -> Option<Product> {
        let min = self.config.min_discount_percentage;
        if let Some(discount) = product.discount_percentage {
            if discount >= min {
                return Some(product.clone());
            }
        }
        let derived = product.derived_discount()?;
        if derived >= min {
            let mut qualified = product.clone();
            qualified.discount_percentage = Some(derived);
            return Some(qualified);
        }
        None
    }

    fn is_clearance(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.config
            .clearance_keywords
            .iter()
            .any(|keyword| title.contains(&keyword.to_lowercase()))
    }

    /// Weighted composite on a 0-10 scale, two-decimal precision.
    fn quality_score(&self, product: &Product) -> f64 {
        let QualityWeights {
            discount,
            rating,
            review_count,
            price_range,
        } = self.config.quality_weights;

        let discount_score = (product.discount_percentage.unwrap_or(0.0) / 70.0 * 10.0).min(10.0);
        // neutral default when the markup carried no rating
        let rating_score = product.rating.map(|r| r / 5.0 * 10.0).unwrap_or(5.0);
        let review_score = product
            .review_count
            .map(|n| (n as f64 / 1000.0 * 10.0).min(10.0))
            .unwrap_or(0.0);
        let price_score = price_band_score(product.current_price.unwrap_or(0.0));

        let weighted = discount_score * discount
            + rating_score * rating
            + review_score * review_count
            + price_score * price_range;

        round2((weighted + self.bonus_score(product)).clamp(0.0, 10.0))
    }

    fn bonus_score(&self, product: &Product) -> f64 {
        let mut bonus = 0.0;
        if product.is_expedited {
            bonus += 0.5;
        }
        if product.availability == Availability::InStock {
            bonus += 0.3;
        }
        if let Some(brand) = &product.brand {
            let brand = brand.to_lowercase();
            if self.config.known_brands.iter().any(|b| brand.contains(b)) {
                bonus += 0.2;
            }
        }
        bonus
    }

    /// Keep only the first Deal per catalog identifier, preserving order.
    pub fn dedup(&self, deals: Vec<Deal>) -> Vec<Deal> {
        let mut seen = HashSet::new();
        deals
            .into_iter()
            .filter(|deal| seen.insert(deal.asin.clone()))
            .collect()
    }

    /// Stable sort descending by (quality score, discount percentage),
    /// assigning 1-based priority ranks and marking the top 5 featured.
    pub fn rank(&self, mut deals: Vec<Deal>) -> Vec<Deal> {
        deals.sort_by(|a, b| {
            (b.quality_score, b.discount_percentage)
                .partial_cmp(&(a.quality_score, a.discount_percentage))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (index, deal) in deals.iter_mut().enumerate() {
            deal.priority_rank = index as u32 + 1;
            deal.is_featured = index < FEATURED_COUNT;
        }
        deals
    }

    /// Compose the outbound summary text for a deal.
    pub fn compose_summary(&self, deal: &Deal) -> String {
        let headline = match deal.deal_type {
            DealType::Lightning => format!("🔥 Lightning deal: {:.0}% off", deal.discount_percentage),
            DealType::Daily => format!("⭐ Deal of the day: {:.0}% off", deal.discount_percentage),
            DealType::Clearance => format!("🏷️ Clearance: {:.0}% off", deal.discount_percentage),
            _ => format!("💰 Featured deal: {:.0}% off", deal.discount_percentage),
        };
        let urgency = match deal.analysis.urgency {
            Urgency::High => "⚡ Limited stock, act now!",
            Urgency::Medium => "⏰ Limited-time offer, don't miss it!",
            Urgency::Low => "🛒 A great offer, order today!",
        };
        let value = if deal.quality_score >= 8.0 {
            "High-quality product at an excellent price."
        } else if deal.quality_score >= 6.0 {
            "Great value for the price."
        } else {
            "A good chance to save."
        };
        let recommendation = match deal.analysis.strength {
            DealStrength::Excellent => "🌟 Highly recommended, an exceptional offer!",
            DealStrength::VeryGood => "👍 Recommended, an excellent offer!",
            DealStrength::Good => "✅ A good offer worth a look.",
            _ => "💡 A fair offer for interested buyers.",
        };

        let mut summary = format!(
            "{headline}\n{title}\nPrice: {price:.0} (was {original:.0}), save {savings:.0}\n{urgency}\n{value}\n{recommendation}",
            title = deal.title,
            price = deal.deal_price,
            original = deal.original_price,
            savings = deal.discount_amount,
        );
        if summary.chars().count() > self.max_message_length {
            let cut = self.max_message_length.saturating_sub(3);
            summary = summary.chars().take(cut).collect::<String>() + "...";
        }
        summary
    }
}

/// Fixed piecewise score of the price band.
fn price_band_score(price: f64) -> f64 {
    if price <= 100.0 {
        8.0
    } else if price <= 500.0 {
        10.0
    } else if price <= 1000.0 {
        7.0
    } else if price <= 2000.0 {
        5.0
    } else {
        3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealwatch_core::ids::Asin;

    fn analyzer() -> DealAnalyzer {
        DealAnalyzer::new(DealsConfig::default(), 4096)
    }

    fn product(asin: &str, current: f64, original: f64) -> Product {
        let mut p = Product::new(
            Asin::new(asin).unwrap(),
            "Wireless headphones",
            format!("https://example.com/dp/{asin}"),
            Utc::now(),
        );
        p.current_price = Some(current);
        p.original_price = Some(original);
        p
    }

    #[test]
    fn test_scenario_mid_range_derived_discount() {
        // 100 current / 150 was: derived 33.33%, mid-range price
        let deal = analyzer()
            .evaluate(&product("B0TEST0001", 100.0, 150.0), &[], Utc::now())
            .unwrap();

        assert_eq!(deal.discount_percentage, 33.33);
        // 33.33 >= 30 puts this in the daily bucket
        assert_eq!(deal.deal_type, DealType::Daily);
        assert_eq!(deal.discount_amount, 50.0);
        // discount sub-score 4.76 * 0.4, neutral rating 5 * 0.25, price band 8 * 0.2
        assert_eq!(deal.quality_score, 4.75);
        assert_eq!(deal.analysis.price_trend, PriceTrend::InsufficientData);
    }

    #[test]
    fn test_gate_rejects_below_minimum_discount() {
        // 10% derived discount is below the 20% default minimum
        let result = analyzer().evaluate(&product("B0TEST0001", 90.0, 100.0), &[], Utc::now());
        assert!(result.is_none());
    }

    #[test]
    fn test_explicit_discount_below_minimum_falls_back_to_derived() {
        let mut p = product("B0TEST0001", 100.0, 150.0);
        p.discount_percentage = Some(5.0);
        // the explicit badge misses the gate but the price pair passes
        let deal = analyzer().evaluate(&p, &[], Utc::now()).unwrap();
        assert_eq!(deal.discount_percentage, 33.33);
    }

    #[test]
    fn test_gate_never_mutates_input() {
        let p = product("B0TEST0001", 100.0, 150.0);
        let _ = analyzer().evaluate(&p, &[], Utc::now());
        assert_eq!(p.discount_percentage, None);
    }

    #[test]
    fn test_significance_rejects_price_outside_band() {
        // discount qualifies, price above the configured ceiling
        let result = analyzer().evaluate(&product("B0TEST0001", 6000.0, 9000.0), &[], Utc::now());
        assert!(result.is_none());

        let result = analyzer().evaluate(&product("B0TEST0001", 5.0, 8.0), &[], Utc::now());
        assert!(result.is_none());
    }

    #[test]
    fn test_quality_score_bounds_on_sparse_products() {
        let a = analyzer();
        // nothing but a qualifying discount
        let mut p = product("B0TEST0001", 50.0, 100.0);
        p.rating = None;
        p.review_count = None;
        let deal = a.evaluate(&p, &[], Utc::now()).unwrap();
        assert!((0.0..=10.0).contains(&deal.quality_score));

        // everything maxed, score still clamped to 10
        let mut p = product("B0TEST0002", 400.0, 2000.0);
        p.discount_percentage = Some(80.0);
        p.rating = Some(5.0);
        p.review_count = Some(50_000);
        p.is_expedited = true;
        p.availability = Availability::InStock;
        p.brand = Some("Sony".to_string());
        let deal = a.evaluate(&p, &[], Utc::now()).unwrap();
        assert!(deal.quality_score <= 10.0);
    }

    #[test]
    fn test_bonus_components() {
        let a = analyzer();
        let mut plain = product("B0TEST0001", 300.0, 500.0);
        plain.rating = Some(4.0);
        plain.review_count = Some(500);
        let base = a.evaluate(&plain, &[], Utc::now()).unwrap().quality_score;

        let mut boosted = plain.clone();
        boosted.is_expedited = true;
        boosted.availability = Availability::InStock;
        boosted.brand = Some("Samsung Electronics".to_string());
        let bumped = a.evaluate(&boosted, &[], Utc::now()).unwrap().quality_score;
        assert_eq!(bumped, round2(base + 1.0));
    }

    #[test]
    fn test_clearance_classification_uses_title_keywords() {
        let a = analyzer();
        let mut p = product("B0TEST0001", 77.0, 100.0);
        p.title = "Winter jackets clearance".to_string();
        p.rating = Some(4.5);
        p.review_count = Some(800);
        let deal = a.evaluate(&p, &[], Utc::now()).unwrap();
        assert_eq!(deal.deal_type, DealType::Clearance);
    }

    #[test]
    fn test_validity_window_follows_type() {
        let now = Utc::now();
        let deal = analyzer()
            .evaluate(&product("B0TEST0001", 40.0, 100.0), &[], now)
            .unwrap();
        assert_eq!(deal.deal_type, DealType::Lightning);
        assert_eq!(deal.ends_at, Some(now + chrono::Duration::hours(6)));
    }

    #[test]
    fn test_dedup_keeps_first_and_is_idempotent() {
        let a = analyzer();
        let now = Utc::now();
        let d1 = a.evaluate(&product("B0TEST0001", 100.0, 150.0), &[], now).unwrap();
        let mut d2 = a.evaluate(&product("B0TEST0001", 90.0, 150.0), &[], now).unwrap();
        d2.title = "Duplicate".to_string();
        let d3 = a.evaluate(&product("B0TEST0002", 100.0, 150.0), &[], now).unwrap();

        let once = a.dedup(vec![d1.clone(), d2.clone(), d3.clone()]);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].title, d1.title);
        assert_eq!(once[1].asin.as_str(), "B0TEST0002");

        let twice = a.dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rank_is_stable_and_deterministic() {
        let a = analyzer();
        let now = Utc::now();
        let first = a.evaluate(&product("B0TEST0001", 100.0, 150.0), &[], now).unwrap();
        let second = a.evaluate(&product("B0TEST0002", 100.0, 150.0), &[], now).unwrap();
        let better = a.evaluate(&product("B0TEST0003", 100.0, 250.0), &[], now).unwrap();

        // equal-score, equal-discount deals keep their input order
        let ranked = a.rank(vec![first.clone(), second.clone(), better.clone()]);
        assert_eq!(ranked[0].asin.as_str(), "B0TEST0003");
        assert_eq!(ranked[1].asin.as_str(), "B0TEST0001");
        assert_eq!(ranked[2].asin.as_str(), "B0TEST0002");
        assert_eq!(ranked[0].priority_rank, 1);
        assert_eq!(ranked[2].priority_rank, 3);
        assert!(ranked.iter().all(|d| d.is_featured));
    }

    #[test]
    fn test_rank_features_only_top_five() {
        let a = analyzer();
        let now = Utc::now();
        let deals: Vec<Deal> = (0..7)
            .map(|i| {
                a.evaluate(
                    &product(&format!("B0TEST000{i}"), 100.0 + i as f64, 200.0),
                    &[],
                    now,
                )
                .unwrap()
            })
            .collect();
        let ranked = a.rank(deals);
        assert_eq!(ranked.iter().filter(|d| d.is_featured).count(), 5);
        assert!(!ranked[5].is_featured);
    }

    #[test]
    fn test_summary_truncation() {
        let a = DealAnalyzer::new(DealsConfig::default(), 60);
        let mut p = product("B0TEST0001", 100.0, 150.0);
        p.title = "A very long product title that will not fit in the message at all".to_string();
        let deal = a.evaluate(&p, &[], Utc::now()).unwrap();
        assert_eq!(deal.summary.chars().count(), 60);
        assert!(deal.summary.ends_with("..."));
    }
}
