//! Upstream redirect interception.
//!
//! The proxy never follows redirects itself. A 3xx from the target becomes
//! a proxy-local 302 so the browser lands back on the proxy and the next
//! hop is rewritten too.

use http::StatusCode;
use url::Url;

use crate::codec;

/// Statuses whose `Location` gets intercepted.
const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Turns an upstream redirect into a proxied `Location` value.
///
/// The `Location` resolves against the URL that was fetched; the upstream
/// knows nothing about the proxy. Returns `None` when the status is not a
/// redirect or the header is missing or unresolvable, in which case the
/// caller falls through to normal content dispatch.
pub fn intercept(status: StatusCode, location: Option<&str>, target: &Url) -> Option<String> {
    if !REDIRECT_STATUSES.contains(&status) {
        return None;
    }
    let resolved = target.join(location?).ok()?;
    if !resolved.has_host() {
        return None;
    }
    Some(codec::encode(&resolved))
}
