use std::time::Duration;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use quire::application::source::{ContentSource, ContentSourceError};
use quire::infra::content_source::HttpContentSource;
use serde_json::{Value, json};
use url::Url;

async fn render(Json(body): Json<Value>) -> impl IntoResponse {
    match body["content"].as_str() {
        Some("known") => (
            StatusCode::OK,
            Json(json!({
                "markdown": format!("frontmatter={}\n\n# Known", body["frontmatter"]),
                "service": "medium",
            })),
        )
            .into_response(),
        Some("empty") => Json(json!({ "markdown": "  ", "service": "medium" })).into_response(),
        Some("explode") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend() -> Url {
    let app = Router::new().route("/api/render", post(render));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("backend serves");
    });
    Url::parse(&format!("http://{addr}/api")).expect("backend url")
}

async fn source() -> HttpContentSource {
    HttpContentSource::new(&spawn_backend().await, Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn fetches_markdown_and_forwards_the_frontmatter_flag() {
    let fetched = source()
        .await
        .fetch_content("known", true)
        .await
        .expect("content fetched");

    assert_eq!(fetched.service, "medium");
    assert!(fetched.markdown.starts_with("frontmatter=true"));
}

#[tokio::test]
async fn backend_404_and_blank_markdown_are_not_found() {
    let source = source().await;

    let missing = source.fetch_content("missing", true).await;
    assert!(matches!(missing, Err(ContentSourceError::NotFound { .. })));

    let blank = source.fetch_content("empty", true).await;
    assert!(matches!(blank, Err(ContentSourceError::NotFound { .. })));
}

#[tokio::test]
async fn backend_failures_are_upstream_errors() {
    let err = source()
        .await
        .fetch_content("explode", false)
        .await
        .expect_err("backend failure");

    match err {
        ContentSourceError::Upstream { message } => assert!(message.contains("boom")),
        other => panic!("unexpected error: {other:?}"),
    }
}
