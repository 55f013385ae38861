//! Scraper layer
//! - fetcher.rs: PageFetcher trait and the HTTP implementation
//! - html.rs: Tree-sitter HTML helpers and the DOM heuristics (channel, row)
//! - extractor.rs: Release extraction from the installer page
//! - error.rs: Fetch and extraction errors

pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod html;

pub use error::{ExtractError, FetchError};
pub use extractor::ReleaseExtractor;
pub use fetcher::{HttpPageFetcher, PageFetcher};
