use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use url::form_urlencoded;

use crate::presentation::views::{
    IndexTemplate, render_document_response, render_template_response,
};

use super::HttpState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct IndexQuery {
    q: Option<String>,
}

/// Landing page. A submitted `q` is sent on to the article page.
pub(super) async fn index(Query(query): Query<IndexQuery>) -> Response {
    match query.q.as_deref().map(str::trim) {
        Some(identifier) if !identifier.is_empty() => {
            Redirect::to(&article_path(identifier)).into_response()
        }
        _ => render_template_response(IndexTemplate::landing(), StatusCode::OK),
    }
}

pub(super) async fn article_page(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    let document = state.articles.load(&slug).await;
    render_document_response(&document)
}

fn article_path(identifier: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(identifier.as_bytes()).collect();
    format!("/{encoded}")
}

#[cfg(test)]
mod tests {
    use super::article_path;

    #[test]
    fn identifiers_are_encoded_into_one_segment() {
        assert_eq!(article_path("hello-world"), "/hello-world");
        assert_eq!(
            article_path("https://medium.com/p/abc"),
            "/https%3A%2F%2Fmedium.com%2Fp%2Fabc"
        );
    }
}
