//! URL codec: mapping between absolute URLs and proxy-relative links.
//!
//! A proxied link is `/p?u=<enc>` where `<enc>` is the percent-encoded
//! canonical form of an absolute URL. [`encode`] and [`decode`] are
//! inverses over canonical [`Url`] values; percent-encoding is applied
//! exactly once per layer, so round-tripping never double-encodes.

use std::borrow::Cow;

use url::Url;

use crate::error::CodecError;
use crate::redirector::RedirectorRules;
use crate::{PROXY_PATH, TARGET_PARAM};

/// Scheme prefixes the rewriters leave untouched.
const EXCLUDED_PREFIXES: [&str; 4] = ["javascript:", "data:", "mailto:", "tel:"];

/// Everything a rewriting pass needs to know about the page being
/// rewritten: the full page URL (references resolve against it, not just
/// its origin) and the redirector rules consulted before resolution.
/// Immutable for the duration of one pass.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    base: Url,
    redirectors: RedirectorRules,
}

impl RewriteContext {
    /// Creates a context for a page fetched from `base`, with the standard
    /// redirector rules.
    pub fn new(base: Url) -> Self {
        Self {
            base,
            redirectors: RedirectorRules::standard(),
        }
    }

    /// Replaces the redirector rule set.
    pub fn with_redirectors(mut self, redirectors: RedirectorRules) -> Self {
        self.redirectors = redirectors;
        self
    }

    /// The full URL of the page being rewritten.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The redirector rules in effect.
    pub fn redirectors(&self) -> &RedirectorRules {
        &self.redirectors
    }
}

/// Encodes an absolute URL as a proxy-relative link.
pub fn encode(url: &Url) -> String {
    format!(
        "{}?{}={}",
        PROXY_PATH,
        TARGET_PARAM,
        urlencoding::encode(url.as_str())
    )
}

/// Decodes a raw (still percent-encoded) target parameter value back into
/// the absolute URL it names. Inverse of [`encode`].
pub fn decode(value: &str) -> Result<Url, CodecError> {
    let raw = urlencoding::decode(value)?;
    parse_target(&raw)
}

/// Parses an already percent-decoded target into an absolute URL.
///
/// Rejects anything without a scheme or a host, so `javascript:` and
/// friends can never reach the fetch layer.
pub fn parse_target(raw: &str) -> Result<Url, CodecError> {
    let url = Url::parse(raw)?;
    if !url.has_host() {
        return Err(CodecError::NoHost(raw.to_string()));
    }
    Ok(url)
}

/// Rewrites one embedded reference into a proxied link.
///
/// Excluded references (empty, fragment-only, `javascript:`, `data:`,
/// `mailto:`, `tel:`) and references that cannot be resolved against the
/// page URL come back unchanged; a single bad reference never fails the
/// surrounding document. Already-proxied references resolve to the proxy's
/// own absolute URL and re-encode losslessly, so repeated rewriting cannot
/// nest encodings.
pub fn resolve_and_encode(reference: &str, ctx: &RewriteContext) -> String {
    let trimmed = reference.trim();
    if is_excluded(trimmed) {
        return reference.to_string();
    }

    let unwrapped = match ctx.redirectors().unwrap_reference(trimmed, ctx.base()) {
        Some(inner) => Cow::Owned(inner),
        None => Cow::Borrowed(trimmed),
    };

    match ctx.base().join(&unwrapped) {
        Ok(resolved) if resolved.has_host() => encode(&resolved),
        _ => reference.to_string(),
    }
}

/// True for references the rewriters must not touch.
pub fn is_excluded(reference: &str) -> bool {
    if reference.is_empty() || reference.starts_with('#') {
        return true;
    }
    let lower = reference.to_ascii_lowercase();
    EXCLUDED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(base: &str) -> RewriteContext {
        RewriteContext::new(Url::parse(base).unwrap())
    }

    #[test]
    fn encode_decode_round_trip() {
        let urls = [
            "https://example.com/",
            "https://example.com/a/b?q=1&r=two#frag",
            "http://example.com:8080/path%20with%20spaces",
            "https://user@example.com/~tilde/(parens)",
        ];
        for raw in urls {
            let url = Url::parse(raw).unwrap();
            let link = encode(&url);
            let payload = link.strip_prefix("/p?u=").unwrap();
            assert_eq!(decode(payload).unwrap(), url, "round trip for {raw}");
        }
    }

    #[test]
    fn encode_percent_encodes_once() {
        let url = Url::parse("https://example.com/about").unwrap();
        assert_eq!(encode(&url), "/p?u=https%3A%2F%2Fexample.com%2Fabout");
    }

    #[test]
    fn decode_rejects_relative_and_hostless() {
        assert!(matches!(decode("notaurl"), Err(CodecError::Parse(_))));
        assert!(matches!(decode("%2Fabout"), Err(CodecError::Parse(_))));
        assert!(matches!(
            decode("javascript%3Aalert(1)"),
            Err(CodecError::NoHost(_))
        ));
        assert!(matches!(
            decode("data%3Atext%2Fplain%2Chello"),
            Err(CodecError::NoHost(_))
        ));
    }

    #[test]
    fn parse_target_requires_host() {
        assert!(parse_target("https://example.com/x").is_ok());
        assert!(parse_target("/about").is_err());
        assert!(parse_target("mailto:a@b.c").is_err());
    }

    #[test]
    fn resolves_relative_reference_against_page() {
        let ctx = ctx("https://example.com/");
        assert_eq!(
            resolve_and_encode("/about", &ctx),
            "/p?u=https%3A%2F%2Fexample.com%2Fabout"
        );
    }

    #[test]
    fn resolves_against_full_page_url_not_origin() {
        let ctx = ctx("https://example.com/a/b/page.html");
        assert_eq!(
            resolve_and_encode("img/x.png", &ctx),
            encode(&Url::parse("https://example.com/a/b/img/x.png").unwrap())
        );
    }

    #[test]
    fn absolute_reference_is_encoded_as_is() {
        let ctx = ctx("https://example.com/");
        assert_eq!(
            resolve_and_encode("https://other.example/x", &ctx),
            encode(&Url::parse("https://other.example/x").unwrap())
        );
    }

    #[test]
    fn protocol_relative_reference_takes_page_scheme() {
        let ctx = ctx("https://example.com/");
        assert_eq!(
            resolve_and_encode("//cdn.example/lib.js", &ctx),
            encode(&Url::parse("https://cdn.example/lib.js").unwrap())
        );
    }

    #[test]
    fn excluded_references_pass_through() {
        let ctx = ctx("https://example.com/");
        for reference in [
            "",
            "#top",
            "javascript:void(0)",
            "JavaScript:alert(1)",
            "data:image/gif;base64,R0lGOD==",
            "mailto:someone@example.com",
            "tel:+15551234567",
        ] {
            assert_eq!(resolve_and_encode(reference, &ctx), reference);
        }
    }

    #[test]
    fn unresolvable_reference_is_preserved() {
        let ctx = ctx("https://example.com/");
        assert_eq!(resolve_and_encode("http://[bad", &ctx), "http://[bad");
    }

    #[test]
    fn redirector_wrapper_is_unwrapped_before_encoding() {
        let ctx = ctx("https://duckduckgo.com/");
        let wrapped = "https://duckduckgo.com/l/?uddg=https%3A%2F%2Freal.example%2Fpage";
        assert_eq!(
            resolve_and_encode(wrapped, &ctx),
            encode(&Url::parse("https://real.example/page").unwrap())
        );
    }

    #[test]
    fn already_proxied_reference_reencodes_losslessly() {
        let ctx = ctx("https://example.com/dir/page");
        let proxied = "/p?u=https%3A%2F%2Fexample.com%2F";
        let expected =
            encode(&Url::parse("https://example.com/p?u=https%3A%2F%2Fexample.com%2F").unwrap());
        assert_eq!(resolve_and_encode(proxied, &ctx), expected);
        // The nested payload is still recoverable, so no information is lost.
        let inner = expected.strip_prefix("/p?u=").unwrap();
        assert!(decode(inner).unwrap().as_str().contains("/p?u="));
    }
}
