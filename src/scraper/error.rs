use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

/// Error type for page extraction
///
/// Only raised when no document tree can be built at all; individual rows
/// that do not look like releases are skipped instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Failed to parse the page structure
    #[error("Failed to parse page: {0}")]
    ParseFailed(String),

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}
