use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::error::ErrorReport;

use super::HttpState;

/// Rendered document as JSON; the status mirrors the document's outcome.
pub(super) async fn article_json(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    let document = state.articles.load(&slug).await;
    let status = StatusCode::from_u16(document.status()).unwrap_or(StatusCode::OK);

    let report = document
        .error()
        .map(|error| ErrorReport::from_pipeline_error("infra::http::api::article_json", error));

    let mut response = (status, Json(document)).into_response();
    if let Some(report) = report {
        report.attach(&mut response);
    }
    response
}
