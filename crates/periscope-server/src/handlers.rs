//! Proxy route handlers.

use axum::body::Body;
use axum::extract::{RawQuery, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, info};
use url::form_urlencoded;

use periscope_core::{
    classify, css, headers, html, redirect, ContentKind, RewriteContext, Url, TARGET_PARAM,
};

use crate::error::{ProxyError, Result};
use crate::home::HOME_PAGE;
use crate::state::AppState;

/// GET / - Landing page with a URL entry form.
pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// ANY /p?u=<url> - Fetch the target and return it, rewritten when textual.
///
/// HTML and CSS responses are buffered and rewritten so every embedded
/// reference routes back through this endpoint. Everything else streams
/// through untouched. Upstream redirects become proxy-local 302s.
pub async fn proxy(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    request: Request,
) -> Result<Response> {
    let target = target_from_query(query.as_deref())?;
    let (parts, body) = request.into_parts();

    debug!(method = %parts.method, %target, "fetching upstream");

    let outbound = headers::sanitize_request_headers(&parts.headers, &target, &state.user_agent);
    let mut upstream_request = state
        .client
        .request(parts.method.clone(), target.clone())
        .headers(outbound);
    if parts.method != Method::GET {
        let bytes = axum::body::to_bytes(body, usize::MAX).await?;
        if !bytes.is_empty() {
            upstream_request = upstream_request.body(bytes);
        }
    }

    let upstream = upstream_request.send().await?;
    let status = upstream.status();

    let location = upstream
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok());
    if let Some(proxied) = redirect::intercept(status, location, &target) {
        info!(%target, upstream_status = %status, "intercepted upstream redirect");
        return Ok((StatusCode::FOUND, [(header::LOCATION, proxied)]).into_response());
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let kind = classify(content_type);
    let response_headers = headers::sanitize_response_headers(upstream.headers(), kind);

    let body = match kind {
        ContentKind::Html => {
            let ctx = RewriteContext::new(target.clone());
            let page = upstream.bytes().await?;
            Body::from(html::rewrite_html(&page, &ctx)?)
        }
        ContentKind::Css => {
            let ctx = RewriteContext::new(target.clone());
            let sheet = upstream.bytes().await?;
            Body::from(css::rewrite_css(&String::from_utf8_lossy(&sheet), &ctx))
        }
        ContentKind::Passthrough => Body::from_stream(upstream.bytes_stream()),
    };

    info!(%target, upstream_status = %status, kind = ?kind, "proxied");

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Pulls the target URL out of the raw query string.
fn target_from_query(query: Option<&str>) -> Result<Url> {
    let query = query.ok_or(ProxyError::MissingTarget)?;
    let raw = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(ProxyError::MissingTarget)?;

    Ok(periscope_core::parse_target(&raw)?)
}
