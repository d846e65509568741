use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        render::{ErrorKind, PipelineError, RenderError},
        source::ContentSourceError,
    },
    infra::error::InfraError,
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

    /// Report for a document that failed somewhere in fetch or render.
    pub fn from_pipeline_error(source: &'static str, error: &PipelineError) -> Self {
        let status =
            StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut messages = vec![format!("{}: {}", error.code, error.message)];
        if let Some(details) = error.details.as_ref() {
            messages.push(details.clone());
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
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ContentSource(#[from] ContentSourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// The single caller-facing category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ContentSource(err) => err.kind(),
            AppError::Render(err) => err.kind(),
            AppError::Infra(_) | AppError::Unexpected(_) => ErrorKind::Internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Infra(InfraError::HttpClient(_)) => "Content backend unavailable",
            _ => self.kind().message(),
        }
    }

    /// Fold into the payload returned to callers.
    pub fn into_pipeline_error(self, expose_details: bool) -> PipelineError {
        PipelineError::new(self.kind(), self.to_string(), expose_details)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_error_maps_to_one_kind() {
        let missing = AppError::from(ContentSourceError::NotFound {
            identifier: "gone".into(),
        });
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let upstream = AppError::from(ContentSourceError::upstream("connection refused"));
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let compile = AppError::from(RenderError::Markdown {
            message: "bad".into(),
        });
        assert_eq!(compile.kind(), ErrorKind::CompileFailure);

        assert_eq!(AppError::unexpected("join").kind(), ErrorKind::Internal);
    }

    #[test]
    fn responses_carry_an_error_report() {
        let response = AppError::unexpected("worker vanished").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "application::error::AppError");
        assert!(report.messages[0].contains("worker vanished"));
    }

    #[test]
    fn pipeline_error_hides_details_by_default() {
        let error = AppError::from(ContentSourceError::upstream("secret host"))
            .into_pipeline_error(false);
        assert_eq!(error.code, "RENDER_ERROR");
        assert!(error.details.is_none());
    }
}
