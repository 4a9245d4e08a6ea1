mod auth;
mod authoring;
mod follows;
mod middleware;
mod public;

pub use auth::{CurrentUser, LoginRedirect};
pub use public::{HttpState, build_router};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;
use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => HttpError::internal("infra::http::found", &err).into_response(),
    }
}

/// Percent-encode one path segment (usernames may carry non-ASCII letters).
pub(crate) fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

pub(crate) fn profile_location(username: &str) -> String {
    format!("/profile/{}/", encode_segment(username))
}
