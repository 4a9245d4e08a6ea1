//! Request identity for protected routes.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::application::viewer::Viewer;
use crate::domain::entities::UserRecord;

use super::{HttpState, found};

/// Signed-in user behind the request. Extraction fails with a redirect to
/// the login page when the request is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer::Authenticated(user)) => Ok(Self(user.clone())),
            _ => {
                debug!(
                    target = "yatube::http::auth",
                    path = %parts.uri.path(),
                    "anonymous request to protected route"
                );
                Err(LoginRedirect::new(&state.auth.login_path, &parts.uri))
            }
        }
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Redirect to the login page carrying the original target in `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    location: String,
}

impl LoginRedirect {
    pub fn new(login_path: &str, original: &Uri) -> Self {
        let target = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| original.path());
        let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        let next = next.replace("%2F", "/");
        Self {
            location: format!("{login_path}?next={next}"),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        found(&self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_keeps_slashes_and_encodes_query() {
        let uri: Uri = "/follow/?page=2".parse().unwrap();
        let redirect = LoginRedirect::new("/auth/login/", &uri);
        assert_eq!(redirect.location(), "/auth/login/?next=/follow/%3Fpage%3D2");
    }

    #[test]
    fn next_for_plain_path() {
        let uri: Uri = "/create/".parse().unwrap();
        let redirect = LoginRedirect::new("/auth/login/", &uri);
        assert_eq!(redirect.location(), "/auth/login/?next=/create/");
    }
}
