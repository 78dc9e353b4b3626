//! Third-party redirector unwrapping.
//!
//! Some sites wrap outbound links in a tracking redirect whose query string
//! carries the real destination (DuckDuckGo's `uddg`, the generic
//! `redirect_url`). Unwrapping those before proxying keeps navigation inside
//! the proxy instead of bouncing through the tracker.

use tracing::debug;
use url::Url;

/// One unwrapping rule: a query parameter that carries the destination,
/// optionally scoped to a host and its subdomains.
#[derive(Debug, Clone)]
pub struct RedirectorRule {
    param: String,
    host_suffix: Option<String>,
}

impl RedirectorRule {
    /// Rule that fires on any host.
    pub fn any_host(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            host_suffix: None,
        }
    }

    /// Rule scoped to `host_suffix` and its subdomains.
    pub fn for_host(param: impl Into<String>, host_suffix: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            host_suffix: Some(host_suffix.into()),
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        match &self.host_suffix {
            None => true,
            Some(suffix) => {
                host == suffix || host.ends_with(&format!(".{suffix}"))
            }
        }
    }
}

/// An extensible set of redirector rules.
#[derive(Debug, Clone, Default)]
pub struct RedirectorRules {
    rules: Vec<RedirectorRule>,
}

impl RedirectorRules {
    /// Empty set; nothing is unwrapped.
    pub fn none() -> Self {
        Self::default()
    }

    /// The bundled rules: DuckDuckGo result links (`uddg`) and the generic
    /// `redirect_url` parameter.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                RedirectorRule::for_host("uddg", "duckduckgo.com"),
                RedirectorRule::any_host("redirect_url"),
            ],
        }
    }

    /// Adds a rule to the set.
    pub fn push(&mut self, rule: RedirectorRule) {
        self.rules.push(rule);
    }

    /// Attempts to unwrap `reference`, returning the embedded destination
    /// when a rule fires. The matched parameter's value must itself be an
    /// absolute `http(s)` URL; anything else leaves the reference alone.
    ///
    /// Host scoping checks the reference's own host when it is absolute,
    /// and the page host otherwise.
    pub fn unwrap_reference(&self, reference: &str, base: &Url) -> Option<String> {
        if self.rules.is_empty() {
            return None;
        }

        let query = extract_query(reference)?;
        let host = match Url::parse(reference) {
            Ok(url) => url.host_str().map(str::to_string),
            Err(_) => base.host_str().map(str::to_string),
        }?;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            for rule in &self.rules {
                if key.as_ref() != rule.param.as_str() || !rule.matches_host(&host) {
                    continue;
                }
                if let Ok(inner) = Url::parse(&value) {
                    if matches!(inner.scheme(), "http" | "https") {
                        debug!(param = %rule.param, destination = %inner, "unwrapped redirector link");
                        return Some(inner.to_string());
                    }
                }
            }
        }
        None
    }
}

/// Pulls the query component out of a raw, possibly relative reference.
fn extract_query(reference: &str) -> Option<&str> {
    let without_fragment = reference.split('#').next().unwrap_or(reference);
    let (_, query) = without_fragment.split_once('?')?;
    (!query.is_empty()).then_some(query)
}
