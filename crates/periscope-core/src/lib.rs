//! Periscope Core - URL codec and content rewriting engine.
//!
//! This crate implements the transformation layer of the Periscope proxy:
//! the codec that maps absolute URLs to proxy-relative links, the HTML and
//! CSS rewriters, the redirect interceptor, the header sanitizer, and the
//! client-side interception script. Everything here is synchronous and
//! side-effect free; the HTTP surface lives in `periscope-server`.
//!
//! ## Example
//!
//! ```
//! use periscope_core::{resolve_and_encode, RewriteContext, Url};
//!
//! let page = Url::parse("https://example.com/").unwrap();
//! let ctx = RewriteContext::new(page);
//! assert_eq!(
//!     resolve_and_encode("/about", &ctx),
//!     "/p?u=https%3A%2F%2Fexample.com%2Fabout"
//! );
//! ```

pub mod classify;
pub mod codec;
pub mod css;
pub mod error;
pub mod headers;
pub mod html;
pub mod redirect;
pub mod redirector;
pub mod script;

pub use classify::{classify, ContentKind};
pub use codec::{decode, encode, parse_target, resolve_and_encode, RewriteContext};
pub use error::{CodecError, RewriteError};
pub use redirector::{RedirectorRule, RedirectorRules};
pub use url::Url;

/// Path of the proxy fetch endpoint.
pub const PROXY_PATH: &str = "/p";

/// Query parameter carrying the percent-encoded target URL.
pub const TARGET_PARAM: &str = "u";

/// Substring that marks a reference as already proxied.
pub const LINK_MARKER: &str = "/p?u=";

/// User-Agent sent upstream when the client does not provide one.
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
