//! Ordered extraction strategies.
//!
//! Strategies are data: a configured list of price rules followed by fixed
//! generic fallbacks. The extractor walks each list in order and stops at
//! the first hit.

use std::fmt;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;

use crate::config::schema::PriceRuleConfig;
use crate::extract::price::parse_price;

/// How the price was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The n-th (1-based) site-specific rule matched.
    Selector(usize),
    /// A generic fallback (price meta tag or currency scan) matched.
    Fallback,
    None,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Selector(n) => write!(f, "selector_{}", n),
            ExtractionMethod::Fallback => write!(f, "fallback"),
            ExtractionMethod::None => write!(f, "none"),
        }
    }
}

/// How the title was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleMethod {
    Heading,
    OpenGraph,
    DocumentTitle,
    None,
}

impl fmt::Display for TitleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TitleMethod::Heading => "heading",
            TitleMethod::OpenGraph => "open_graph",
            TitleMethod::DocumentTitle => "document_title",
            TitleMethod::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractorBuildError {
    #[error("Price rule '{name}' has an invalid selector '{selector}': {reason}")]
    InvalidSelector {
        name: String,
        selector: String,
        reason: String,
    },

    #[error("Invalid price pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Where a rule reads its value from.
#[derive(Debug, Clone)]
enum Source {
    Text,
    Attribute(String),
}

/// A compiled selector rule.
#[derive(Debug, Clone)]
pub struct SelectorRule {
    name: String,
    selector: Selector,
    source: Source,
}

impl SelectorRule {
    pub fn compile(name: &str, css: &str, attribute: Option<&str>) -> Result<Self, ExtractorBuildError> {
        let selector = Selector::parse(css).map_err(|e| ExtractorBuildError::InvalidSelector {
            name: name.to_string(),
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            selector,
            source: attribute
                .map(|a| Source::Attribute(a.to_string()))
                .unwrap_or(Source::Text),
        })
    }

    pub fn from_config(rule: &PriceRuleConfig) -> Result<Self, ExtractorBuildError> {
        Self::compile(&rule.name, &rule.selector, rule.attribute.as_deref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized, non-empty values of every matching element, in document order.
    pub fn values<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = String> + 'a {
        document
            .select(&self.selector)
            .filter_map(move |element| self.read(element))
            .map(|value| normalize_whitespace(&value))
            .filter(|value| !value.is_empty())
    }

    /// First matching value that parses as a price.
    pub fn price(&self, document: &Html) -> Option<f64> {
        self.values(document).find_map(|value| parse_price(&value))
    }

    /// First non-empty matching value.
    pub fn text(&self, document: &Html) -> Option<String> {
        self.values(document).next()
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.source {
            Source::Text => Some(element.text().collect::<Vec<_>>().join(" ")),
            Source::Attribute(name) => element.value().attr(name).map(str::to_string),
        }
    }
}

/// Currency-prefixed number anywhere in raw HTML.
pub const CURRENCY_PATTERN: &str =
    r"(?:US\$|\$|USD\s?)\s?(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)";

/// Regex scan over raw markup, used after every selector failed.
#[derive(Debug, Clone)]
pub struct CurrencyScan {
    pattern: Regex,
}

impl CurrencyScan {
    pub fn new() -> Result<Self, ExtractorBuildError> {
        Ok(Self {
            pattern: Regex::new(CURRENCY_PATTERN)?,
        })
    }

    pub fn price(&self, raw_html: &str) -> Option<f64> {
        self.pattern
            .captures_iter(raw_html)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| parse_price(m.as_str()))
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_rejected() {
        let err = SelectorRule::compile("broken", "div[", None).unwrap_err();
        match err {
            ExtractorBuildError::InvalidSelector { name, selector, .. } => {
                assert_eq!(name, "broken");
                assert_eq!(selector, "div[");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_and_attribute_rules() {
        let doc = Html::parse_document(
            r#"<div><span class="p">  Now
                 $12.99 </span><meta itemprop="price" content="11.50"></div>"#,
        );
        let text = SelectorRule::compile("text", "span.p", None).unwrap();
        assert_eq!(text.text(&doc).as_deref(), Some("Now $12.99"));
        assert_eq!(text.price(&doc), Some(12.99));

        let attr = SelectorRule::compile("attr", "[itemprop=\"price\"]", Some("content")).unwrap();
        assert_eq!(attr.price(&doc), Some(11.5));
    }

    #[test]
    fn test_rule_skips_unparsable_matches() {
        let doc = Html::parse_document(
            r#"<span class="price">See options</span><span class="price">$5.25</span>"#,
        );
        let rule = SelectorRule::compile("generic", ".price", None).unwrap();
        assert_eq!(rule.price(&doc), Some(5.25));
    }

    #[test]
    fn test_currency_scan() {
        let scan = CurrencyScan::new().unwrap();
        assert_eq!(scan.price(r#"{"amount":"n/a"} only $1,049.00 today"#), Some(1049.0));
        assert_eq!(scan.price("USD 15"), Some(15.0));
        assert_eq!(scan.price("$(document).ready()"), None);
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(ExtractionMethod::Selector(2).to_string(), "selector_2");
        assert_eq!(ExtractionMethod::Fallback.to_string(), "fallback");
        assert_eq!(TitleMethod::OpenGraph.to_string(), "open_graph");
    }
}
