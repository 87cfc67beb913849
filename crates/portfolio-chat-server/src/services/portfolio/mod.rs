//! Remote portfolio document cache
//!
//! The page is fetched with a conditional GET, reduced to a structured
//! snapshot by a markup extractor and kept until its TTL runs out.

mod cache;
pub mod extractor;
pub mod snapshot;
pub mod source;

pub use cache::{PortfolioCache, PortfolioCacheStats};
pub use extractor::{HtmlExtractor, MarkupExtractor};
pub use snapshot::{ExtractedFields, PortfolioSnapshot};
pub use source::{DocumentSource, FetchOutcome, HttpDocumentSource};
