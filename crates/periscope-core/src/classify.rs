//! Content classification for the response dispatcher.

/// How a proxied response body is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Buffer fully and run the HTML rewriter.
    Html,
    /// Buffer fully and run the CSS rewriter.
    Css,
    /// Stream through untouched.
    Passthrough,
}

/// Classifies an upstream `Content-Type` value (missing header = `""`).
pub fn classify(content_type: &str) -> ContentKind {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("text/html") {
        ContentKind::Html
    } else if ct.contains("text/css") {
        ContentKind::Css
    } else {
        ContentKind::Passthrough
    }
}
