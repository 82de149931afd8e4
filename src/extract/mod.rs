//! Product field extraction subsystem.
//!
//! # Data Flow
//! ```text
//! extract(html, url):
//!     → parse document once
//!     → title:  h1 → og:title → <title>
//!     → price:  configured rules (Selector(n)) → price meta tags → currency scan (Fallback)
//!     → ExtractedProduct (absent fields are None)
//! ```

pub mod extractor;
pub mod price;
pub mod strategy;

pub use extractor::{ExtractedProduct, FieldExtractor};
pub use price::parse_price;
pub use strategy::{ExtractionMethod, ExtractorBuildError, TitleMethod};
