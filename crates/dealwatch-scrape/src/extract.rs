//! Markup extraction.
//!
//! The catalog's page structure is an external, versioned contract. Every
//! container is extracted independently and every field besides the
//! identifier and current price is optional, so markup drift degrades the
//! yield instead of failing the page.

use chrono::Utc;
use dealwatch_core::ids::Asin;
use dealwatch_core::product::{Availability, Product};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Parses search, deals, and item pages into [`Product`] records.
pub struct Extractor {
    base_url: String,
    badge_percent: Regex,
    rating_value: Regex,
    review_count: Regex,
}

impl Extractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            badge_percent: Regex::new(r"(\d+)%").expect("static pattern compiles"),
            rating_value: Regex::new(r"(\d+\.?\d*)").expect("static pattern compiles"),
            review_count: Regex::new(r"\((\d+(?:,\d+)*)\)").expect("static pattern compiles"),
        }
    }

    /// Parse a search results page. Containers without an identifier or a
    /// current price are dropped silently; document order is preserved and
    /// duplicates are left for the analyzer.
    pub fn parse_search_page(&self, markup: &str) -> Vec<Product> {
        let document = Html::parse_document(markup);
        let mut products = Vec::new();

        for container in select_all(&document, "div[data-component-type='s-search-result']") {
            let asin = container
                .value()
                .attr("data-asin")
                .and_then(|raw| Asin::new(raw).ok());
            let Some(asin) = asin else {
                continue;
            };
            if let Some(product) = self.extract_container(container, asin) {
                products.push(product);
            }
        }

        debug!(count = products.len(), "parsed search page");
        products
    }

    /// Parse the dedicated deals index page. The identifier comes from
    /// each card's item link rather than a container attribute.
    pub fn parse_deals_page(&self, markup: &str) -> Vec<Product> {
        let document = Html::parse_document(markup);
        let mut products = Vec::new();

        for container in select_all(&document, "div[data-testid='deal-card']") {
            let asin = select_first(container, "a")
                .and_then(|a| a.value().attr("href"))
                .and_then(Asin::from_url);
            let Some(asin) = asin else {
                continue;
            };
            if let Some(product) = self.extract_container(container, asin) {
                products.push(product);
            }
        }

        debug!(count = products.len(), "parsed deals page");
        products
    }

    /// Parse a single item page.
    ///
    /// Returns `None` when the page yields no title or no current price.
    pub fn parse_product_page(&self, markup: &str, asin: &Asin) -> Option<Product> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let title = text_of(select_first(root, "span#productTitle")?);
        let mut product = Product::new(
            asin.clone(),
            title,
            format!("{}/dp/{}", self.base_url, asin),
            Utc::now(),
        );

        product.current_price = select_first(root, "span.a-price-whole")
            .and_then(|el| parse_price(&text_of(el)));
        product.current_price?;

        product.original_price = select_first(root, "span.a-price-was")
            .or_else(|| select_first(root, "span.a-text-price"))
            .and_then(|el| parse_price(&text_of(el)));
        product.brand = select_first(root, "a#bylineInfo").map(text_of);
        product.image_url = select_first(root, "img#landingImage")
            .and_then(|el| el.value().attr("src"))
            .map(String::from);
        product.rating = select_first(root, "span.a-icon-alt")
            .and_then(|el| self.parse_rating(&text_of(el)));
        product.review_count = select_first(root, "span#acrCustomerReviewText")
            .and_then(|el| self.parse_count(&text_of(el)));

        Some(product.with_derived_discount())
    }

    /// Extract one item container. Any field besides the identifier and
    /// current price may be missing.
    fn extract_container(&self, container: ElementRef<'_>, asin: Asin) -> Option<Product> {
        let title = select_first(container, "h2 span")
            .or_else(|| select_first(container, "span.a-size-medium"))
            .map(text_of)
            .unwrap_or_default();

        let url = select_first(container, "h2 a")
            .or_else(|| select_first(container, "a"))
            .and_then(|a| a.value().attr("href"))
            .map(|href| self.join_url(href))
            .unwrap_or_else(|| format!("{}/dp/{}", self.base_url, asin));

        let mut product = Product::new(asin, title, url, Utc::now());

        product.current_price = select_first(container, "span.a-price-whole")
            .and_then(|el| parse_price(&text_of(el)));
        // a container without a current price is not an observation
        product.current_price?;

        product.original_price = select_first(container, "span.a-price-was")
            .or_else(|| select_first(container, "span.a-text-price"))
            .and_then(|el| parse_price(&text_of(el)));

        product.discount_percentage = select_first(container, "span.a-badge-text")
            .map(|el| text_of(el))
            .filter(|text| text.contains('%'))
            .and_then(|text| self.parse_badge_percent(&text));

        product.rating = select_first(container, "span.a-icon-alt")
            .and_then(|el| self.parse_rating(&text_of(el)));
        product.review_count = select_first(container, "span.a-size-base")
            .map(|el| text_of(el))
            .filter(|text| text.contains('('))
            .and_then(|text| self.parse_count(&text));

        product.image_url = select_first(container, "img.s-image")
            .and_then(|el| el.value().attr("src"))
            .map(String::from);
        product.is_expedited = select_first(container, "span.a-icon-prime").is_some()
            || select_first(container, "i.a-icon-prime").is_some();
        product.has_coupon = select_first(container, "span.s-coupon-highlight-text").is_some();
        product.availability = select_first(container, "span.a-size-base-plus")
            .map(|el| parse_availability(&text_of(el)))
            .unwrap_or_default();

        Some(product.with_derived_discount())
    }

    fn parse_badge_percent(&self, text: &str) -> Option<f64> {
        self.badge_percent
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    fn parse_rating(&self, text: &str) -> Option<f64> {
        self.rating_value
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|r| (0.0..=5.0).contains(r))
    }

    fn parse_count(&self, text: &str) -> Option<u64> {
        let captured = self
            .review_count
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace(',', ""));
        match captured {
            Some(digits) => digits.parse().ok(),
            // item pages carry the bare thousands-separated count
            None => {
                let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    None
                } else {
                    digits.parse().ok()
                }
            }
        }
    }

    fn join_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}/{}", self.base_url, href.trim_start_matches('/'))
        }
    }
}

/// Parse price text into a number.
///
/// Strips currency symbols and thousands separators; anything that still
/// fails to parse yields `None`, never zero.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let cleaned = cleaned.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| *p >= 0.0)
}

fn parse_availability(text: &str) -> Availability {
    let text = text.to_lowercase();
    if text.contains("out of stock") {
        Availability::OutOfStock
    } else if text.contains("in stock") {
        Availability::InStock
    } else {
        Availability::Unknown
    }
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
