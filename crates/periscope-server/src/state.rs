//! Application state for the proxy server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Upstream HTTP client. Never follows redirects on its own; the
    /// handler turns upstream 3xx responses into proxy-local redirects.
    pub client: reqwest::Client,
    /// User-Agent presented upstream when the client sent none.
    pub user_agent: Arc<str>,
}

impl AppState {
    /// Creates application state with a client tuned for proxying.
    pub fn new(
        user_agent: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            user_agent: Arc::from(user_agent.into()),
        })
    }
}
