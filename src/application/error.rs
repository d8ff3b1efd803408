use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::publish::PublishError, domain::error::DomainError, infra::error::InfraError,
};

/// Diagnostic chain attached to error responses and logged by middleware.
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

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<PublishError> for HttpError {
    fn from(error: PublishError) -> Self {
        const SOURCE: &str = "application::error::publish_error_to_http_error";
        match &error {
            PublishError::InvalidArgument(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            PublishError::NotPublished { message, .. } => {
                HttpError::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, *message, &error)
            }
            PublishError::Transport(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Rendering service unavailable",
                &error,
            ),
            PublishError::DeadlineElapsed { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::GATEWAY_TIMEOUT,
                "Publishing timed out",
                &error,
            ),
            PublishError::Store(_) | PublishError::Render(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Publish(PublishError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            AppError::Publish(PublishError::Transport(_)) => StatusCode::BAD_GATEWAY,
            AppError::Publish(PublishError::DeadlineElapsed { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Publish(_) | AppError::Infra(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Publish(PublishError::InvalidArgument(_)) => {
                "Request could not be processed"
            }
            AppError::Publish(PublishError::NotPublished { message, .. }) => *message,
            AppError::Publish(PublishError::Transport(_)) => "Rendering service unavailable",
            AppError::Publish(PublishError::DeadlineElapsed { .. }) => "Publishing timed out",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Publish(_) | AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
