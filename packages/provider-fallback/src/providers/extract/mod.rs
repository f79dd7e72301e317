//! Content extraction strategies, from hosted reader to raw page text.
//!
//! The default chain order is Jina Reader, readability scoring,
//! site-specific selectors and finally raw HTML text.

pub mod clean;
pub mod jina;
pub mod raw_html;
pub mod readability;
pub mod site_specific;

pub use clean::{clean_text, truncate_chars};
pub use jina::JinaReaderExtractor;
pub use raw_html::RawHtmlExtractor;
pub use readability::ReadabilityExtractor;
pub use site_specific::{SiteKind, SiteSpecificExtractor};
