use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::{error::ErrorReport, sessions::SessionAuthError, viewer::Viewer};

use super::HttpState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Resolve the session token (cookie or bearer header) into a [`Viewer`].
/// Anything that does not authenticate leaves the request anonymous.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match session_token(request.headers(), &state.auth.session_cookie) {
        None => Viewer::Anonymous,
        Some(token) => match state.sessions.authenticate(&token).await {
            Ok(user) => Viewer::Authenticated(user),
            Err(SessionAuthError::Unavailable) => {
                warn!(
                    target = "yatube::http::session",
                    "session lookup failed; treating request as anonymous"
                );
                Viewer::Anonymous
            }
            Err(reason) => {
                debug!(target = "yatube::http::session", reason = %reason, "session rejected");
                Viewer::Anonymous
            }
        },
    };

    request.extensions_mut().insert(viewer);
    next.run(request).await
}

fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::COOKIE};

    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer ys_abc_header"));
        headers.insert(COOKIE, HeaderValue::from_static("yatube_session=ys_abc_cookie"));
        assert_eq!(
            session_token(&headers, "yatube_session").as_deref(),
            Some("ys_abc_header")
        );
    }

    #[test]
    fn cookie_is_read_by_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; yatube_session=ys_abc_cookie"),
        );
        assert_eq!(
            session_token(&headers, "yatube_session").as_deref(),
            Some("ys_abc_cookie")
        );
        assert_eq!(session_token(&headers, "other"), None);
    }
}
