use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        authoring::PostWriteError, directory::AdminError, follows::FollowError,
        posts::QueryError, sessions::SessionError,
    },
    infra::error::InfraError,
    presentation::views,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, "Page not found", detail)
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = views::render_error_page(self.status, self.public_message);
        self.report.attach(&mut response);
        response
    }
}

impl From<QueryError> for HttpError {
    fn from(error: QueryError) -> Self {
        const SOURCE: &str = "infra::http::query_error_to_http_error";
        match error {
            QueryError::UnknownGroup(_)
            | QueryError::UnknownAuthor(_)
            | QueryError::UnknownPost(_) => HttpError::not_found(SOURCE, error.to_string()),
            QueryError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "infra::http::follow_error_to_http_error";
        match error {
            FollowError::UnknownAuthor(_) => HttpError::not_found(SOURCE, error.to_string()),
            FollowError::Rejected(_) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                error.to_string(),
            ),
            FollowError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<PostWriteError> for HttpError {
    fn from(error: PostWriteError) -> Self {
        const SOURCE: &str = "infra::http::post_write_error_to_http_error";
        match error {
            PostWriteError::PostNotFound(_) => HttpError::not_found(SOURCE, error.to_string()),
            PostWriteError::NotAuthor { .. } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Only the author can change this post",
                error.to_string(),
            ),
            PostWriteError::Invalid(_) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                error.to_string(),
            ),
            PostWriteError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

/// Failure of a CLI command or of server startup, reported once by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
