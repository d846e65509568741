mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::article::ArticleService;

pub use middleware::RequestContext;

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
}

impl HttpState {
    pub fn new(articles: Arc<ArticleService>) -> Self {
        Self { articles }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(public::index))
        .route("/_health", get(health))
        .route("/api/articles/{slug}", get(api::article_json))
        .route("/{slug}", get(public::article_page))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
