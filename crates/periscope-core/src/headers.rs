//! Header hygiene for both directions of a proxied exchange.
//!
//! Outbound requests present a fixed browser-like profile in which `Host`,
//! `Origin` and `Referer` name the target, never the proxy. Inbound
//! responses lose the policy headers that would block rewritten content
//! from loading, and gain a permissive CORS grant.

use http::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
    HOST, ORIGIN, REFERER, USER_AGENT,
};
use url::Url;

use crate::classify::ContentKind;
use crate::FALLBACK_USER_AGENT;

/// `Content-Type` emitted on the rewritten HTML path.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// `Content-Type` emitted on the rewritten CSS path.
pub const CSS_CONTENT_TYPE: &str = "text/css";

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Stripped from rewritten responses. CSP would block the injected script,
/// and the transport trio no longer describes the rewritten body.
const STRIPPED_FOR_REWRITE: [&str; 7] = [
    "content-security-policy",
    "content-security-policy-report-only",
    "clear-site-data",
    "content-length",
    "content-encoding",
    "transfer-encoding",
    "connection",
];

/// Hop-by-hop headers the serving stack manages itself.
const STRIPPED_FOR_PASSTHROUGH: [&str; 2] = ["transfer-encoding", "connection"];

/// Builds the outbound header set for a fetch of `target`.
///
/// Exactly seven headers go upstream: `User-Agent` (the client's own value
/// when present, else `fallback_agent`), fixed `Accept`, `Accept-Language`
/// and `Upgrade-Insecure-Requests` defaults, and `Host`/`Origin`/`Referer`
/// derived from the target URL.
pub fn sanitize_request_headers(
    inbound: &HeaderMap,
    target: &Url,
    fallback_agent: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let agent = inbound
        .get(USER_AGENT)
        .cloned()
        .or_else(|| HeaderValue::from_str(fallback_agent).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_USER_AGENT));
    headers.insert(USER_AGENT, agent);

    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
    );
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

    if let Ok(host) = HeaderValue::from_str(&host_with_port(target)) {
        headers.insert(HOST, host);
    }
    if let Ok(origin) = HeaderValue::from_str(&target.origin().ascii_serialization()) {
        headers.insert(ORIGIN, origin);
    }
    if let Ok(referer) = HeaderValue::from_str(target.as_str()) {
        headers.insert(REFERER, referer);
    }

    headers
}

/// Sanitizes upstream response headers for the client-facing reply.
///
/// Rewritten paths (HTML/CSS) drop the content policy headers and force an
/// explicit `Content-Type`; the pass-through path mirrors upstream headers.
/// Every path gains `Access-Control-Allow-Origin: *`.
pub fn sanitize_response_headers(upstream: &HeaderMap, kind: ContentKind) -> HeaderMap {
    let mut headers = upstream.clone();

    let stripped: &[&str] = match kind {
        ContentKind::Passthrough => &STRIPPED_FOR_PASSTHROUGH,
        _ => &STRIPPED_FOR_REWRITE,
    };
    for name in stripped {
        headers.remove(*name);
    }

    match kind {
        ContentKind::Html => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        }
        ContentKind::Css => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CSS_CONTENT_TYPE));
        }
        ContentKind::Passthrough => {}
    }
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    headers
}

/// Host header value: host plus the port when it is not the scheme default.
fn host_with_port(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("https://example.com/deep/page?q=1").unwrap()
    }

    #[test]
    fn outbound_profile_points_at_target() {
        let headers = sanitize_request_headers(&HeaderMap::new(), &target(), FALLBACK_USER_AGENT);
        assert_eq!(headers.get(HOST).unwrap(), "example.com");
        assert_eq!(headers.get(ORIGIN).unwrap(), "https://example.com");
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://example.com/deep/page?q=1"
        );
        assert_eq!(headers.get(USER_AGENT).unwrap(), FALLBACK_USER_AGENT);
        assert_eq!(headers.len(), 7);
    }

    #[test]
    fn client_user_agent_is_kept() {
        let mut inbound = HeaderMap::new();
        inbound.insert(USER_AGENT, HeaderValue::from_static("TestBrowser/1.0"));
        let headers = sanitize_request_headers(&inbound, &target(), FALLBACK_USER_AGENT);
        assert_eq!(headers.get(USER_AGENT).unwrap(), "TestBrowser/1.0");
    }

    #[test]
    fn client_cookies_never_go_upstream() {
        let mut inbound = HeaderMap::new();
        inbound.insert("cookie", HeaderValue::from_static("session=abc"));
        let headers = sanitize_request_headers(&inbound, &target(), FALLBACK_USER_AGENT);
        assert!(headers.get("cookie").is_none());
    }

    #[test]
    fn explicit_port_is_part_of_host() {
        let target = Url::parse("http://example.com:8080/x").unwrap();
        let headers = sanitize_request_headers(&HeaderMap::new(), &target, FALLBACK_USER_AGENT);
        assert_eq!(headers.get(HOST).unwrap(), "example.com:8080");
        assert_eq!(headers.get(ORIGIN).unwrap(), "http://example.com:8080");
    }

    #[test]
    fn rewritten_response_drops_policy_and_transport_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert(
            "content-security-policy",
            HeaderValue::from_static("default-src 'self'"),
        );
        upstream.insert("clear-site-data", HeaderValue::from_static("\"cookies\""));
        upstream.insert("content-length", HeaderValue::from_static("1234"));
        upstream.insert("content-encoding", HeaderValue::from_static("gzip"));
        upstream.insert("x-custom", HeaderValue::from_static("kept"));

        let headers = sanitize_response_headers(&upstream, ContentKind::Html);
        assert!(headers.get("content-security-policy").is_none());
        assert!(headers.get("clear-site-data").is_none());
        assert!(headers.get("content-length").is_none());
        assert!(headers.get("content-encoding").is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }

    #[test]
    fn css_response_gets_css_content_type() {
        let headers = sanitize_response_headers(&HeaderMap::new(), ContentKind::Css);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), CSS_CONTENT_TYPE);
    }

    #[test]
    fn passthrough_mirrors_upstream_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        upstream.insert("content-length", HeaderValue::from_static("42"));
        upstream.insert(
            "content-security-policy",
            HeaderValue::from_static("default-src 'self'"),
        );

        let headers = sanitize_response_headers(&upstream, ContentKind::Passthrough);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(headers.get("content-length").unwrap(), "42");
        assert_eq!(
            headers.get("content-security-policy").unwrap(),
            "default-src 'self'"
        );
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }
}
