//! Rewriting engine error types.

use thiserror::Error;

/// Errors from the URL codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Percent-decoding produced invalid UTF-8.
    #[error("invalid percent-encoding: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Not a syntactically valid absolute URL.
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),

    /// Syntactically valid but missing a host component.
    #[error("URL has no host: {0}")]
    NoHost(String),
}

/// Fatal errors from the document rewriters.
///
/// A single reference that fails to resolve is preserved unchanged and
/// never surfaces here; this covers parser-level failures only.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The HTML rewriter aborted.
    #[error("html rewrite failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),
}
