//! Product field extraction from fetched HTML.

use scraper::Html;
use serde::Serialize;

use crate::config::schema::{ExtractConfig, PriceRuleConfig};
use crate::extract::strategy::{
    CurrencyScan, ExtractionMethod, ExtractorBuildError, SelectorRule, TitleMethod,
};
use crate::observability::metrics;

/// Fields pulled from one page. Missing fields are `None`, never a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedProduct {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub source_url: String,
    /// How the price was found.
    pub extraction_method: ExtractionMethod,
    pub title_method: TitleMethod,
}

/// Extracts title and price using ordered strategy lists.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    price_rules: Vec<SelectorRule>,
    price_meta: Vec<SelectorRule>,
    currency_scan: CurrencyScan,
    titles: Vec<(TitleMethod, SelectorRule)>,
}

impl FieldExtractor {
    /// Build with `rules` tried before the generic fallbacks.
    pub fn new(rules: &[PriceRuleConfig]) -> Result<Self, ExtractorBuildError> {
        let price_rules = rules
            .iter()
            .map(SelectorRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let price_meta = vec![
            SelectorRule::compile(
                "product-price-meta",
                r#"meta[property="product:price:amount"]"#,
                Some("content"),
            )?,
            SelectorRule::compile(
                "og-price-meta",
                r#"meta[property="og:price:amount"]"#,
                Some("content"),
            )?,
        ];

        let titles = vec![
            (TitleMethod::Heading, SelectorRule::compile("heading", "h1", None)?),
            (
                TitleMethod::OpenGraph,
                SelectorRule::compile("og-title", r#"meta[property="og:title"]"#, Some("content"))?,
            ),
            (TitleMethod::DocumentTitle, SelectorRule::compile("document-title", "title", None)?),
        ];

        Ok(Self {
            price_rules,
            price_meta,
            currency_scan: CurrencyScan::new()?,
            titles,
        })
    }

    pub fn from_config(config: &ExtractConfig) -> Result<Self, ExtractorBuildError> {
        Self::new(&config.price_rules)
    }

    /// Names of the site-specific rules, in the order they are tried.
    pub fn rule_names(&self) -> Vec<&str> {
        self.price_rules.iter().map(SelectorRule::name).collect()
    }

    /// Extract title and price. Never fails; absent fields are `None`.
    pub fn extract(&self, html: &str, source_url: &str) -> ExtractedProduct {
        let document = Html::parse_document(html);

        let (title, title_method) = self
            .titles
            .iter()
            .find_map(|(method, rule)| rule.text(&document).map(|t| (Some(t), *method)))
            .unwrap_or((None, TitleMethod::None));

        let (price, extraction_method) = self.find_price(&document, html);

        metrics::record_extraction("title", title_method.to_string());
        metrics::record_extraction("price", extraction_method.to_string());

        if price.is_none() {
            tracing::warn!(url = %source_url, "No price found on page");
        }
        tracing::debug!(
            url = %source_url,
            title = title.as_deref().unwrap_or("-"),
            price = ?price,
            method = %extraction_method,
            "Extracted product fields"
        );

        ExtractedProduct {
            title,
            price,
            source_url: source_url.to_string(),
            extraction_method,
            title_method,
        }
    }

    fn find_price(&self, document: &Html, raw_html: &str) -> (Option<f64>, ExtractionMethod) {
        for (index, rule) in self.price_rules.iter().enumerate() {
            if let Some(price) = rule.price(document) {
                tracing::trace!(rule = rule.name(), price, "Price rule matched");
                return (Some(price), ExtractionMethod::Selector(index + 1));
            }
        }

        self.price_meta
            .iter()
            .find_map(|rule| rule.price(document))
            .or_else(|| self.currency_scan.price(raw_html))
            .map(|price| (Some(price), ExtractionMethod::Fallback))
            .unwrap_or((None, ExtractionMethod::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_price_rules;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(&default_price_rules()).unwrap()
    }

    const URL: &str = "https://shop.example/item/1";

    #[test]
    fn test_site_rule_wins() {
        let html = r#"<html><head><meta property="og:price:amount" content="10.00"></head>
            <body><h1> Desk   Lamp </h1>
            <span data-automation-id="product-price">Now $24.88</span></body></html>"#;
        let product = extractor().extract(html, URL);
        assert_eq!(product.title.as_deref(), Some("Desk Lamp"));
        assert_eq!(product.title_method, TitleMethod::Heading);
        assert_eq!(product.price, Some(24.88));
        assert_eq!(product.extraction_method, ExtractionMethod::Selector(2));
        assert_eq!(product.source_url, URL);
    }

    #[test]
    fn test_og_price_meta_is_fallback() {
        let html = r#"<html><head>
            <meta property="og:title" content="Garden Hose">
            <meta property="og:price:amount" content="49.99">
            </head><body><p>no price markup</p></body></html>"#;
        let product = extractor().extract(html, URL);
        assert_eq!(product.price, Some(49.99));
        assert_eq!(product.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(product.title.as_deref(), Some("Garden Hose"));
        assert_eq!(product.title_method, TitleMethod::OpenGraph);
    }

    #[test]
    fn test_currency_scan_is_last_resort() {
        let html = "<html><head><title>Cheap Mug</title></head><body><p>Only $8.49 today</p></body></html>";
        let product = extractor().extract(html, URL);
        assert_eq!(product.price, Some(8.49));
        assert_eq!(product.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(product.title_method, TitleMethod::DocumentTitle);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let html = "<html><body><div>nothing to see</div></body></html>";
        let product = extractor().extract(html, URL);
        assert_eq!(product.title, None);
        assert_eq!(product.title_method, TitleMethod::None);
        assert_eq!(product.price, None);
        assert_eq!(product.extraction_method, ExtractionMethod::None);
    }

    #[test]
    fn test_empty_heading_falls_through() {
        let html = "<html><head><title>Real Title</title></head><body><h1>   </h1></body></html>";
        let product = extractor().extract(html, URL);
        assert_eq!(product.title.as_deref(), Some("Real Title"));
    }

    #[test]
    fn test_configured_rule_order() {
        let rules = vec![
            PriceRuleConfig::text("first", ".sale"),
            PriceRuleConfig::attr("second", "[data-price]", "data-price"),
        ];
        let extractor = FieldExtractor::new(&rules).unwrap();
        assert_eq!(extractor.rule_names(), vec!["first", "second"]);

        let html = r#"<div data-price="15.00"></div><b class="sale">$12.00</b>"#;
        let product = extractor.extract(html, URL);
        assert_eq!(product.price, Some(12.0));
        assert_eq!(product.extraction_method, ExtractionMethod::Selector(1));
    }

    #[test]
    fn test_invalid_rule_fails_build() {
        let rules = vec![PriceRuleConfig::text("bad", "span[")];
        assert!(matches!(
            FieldExtractor::new(&rules),
            Err(ExtractorBuildError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_serializes_methods() {
        let html = r#"<h1>Widget</h1><span class="price">$3.00</span>"#;
        let product = extractor().extract(html, URL);
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["title"], "Widget");
        assert_eq!(json["price"], 3.0);
        assert_eq!(json["extraction_method"]["selector"], 6);
        assert_eq!(json["title_method"], "heading");
    }
}
