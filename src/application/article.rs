//! Article loading: fetch from the content backend, then render off the async runtime.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::{
    application::{
        error::AppError,
        render::{ContentPipeline, RenderService, RenderedDocument},
        source::ContentSource,
    },
    domain::article::RawContent,
    infra::telemetry::{ARTICLE_RENDER_FAILURES_TOTAL, ARTICLE_RENDER_MS, ARTICLE_RENDER_TOTAL},
};

#[derive(Clone)]
pub struct ArticleService {
    source: Arc<dyn ContentSource>,
    pipeline: Arc<ContentPipeline>,
    expose_error_details: bool,
}

impl ArticleService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        pipeline: Arc<ContentPipeline>,
        expose_error_details: bool,
    ) -> Self {
        Self {
            source,
            pipeline,
            expose_error_details,
        }
    }

    /// Fetch and render one article. Every failure ends up as the error arm of
    /// the returned document; no partial HTML is ever produced.
    pub async fn load(&self, identifier: &str) -> RenderedDocument {
        let started_at = Instant::now();
        counter!(ARTICLE_RENDER_TOTAL).increment(1);

        let document = match self.fetch_and_render(identifier).await {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    target = "application::article",
                    identifier,
                    kind = err.kind().as_str(),
                    error = %err,
                    "Article could not be prepared"
                );
                RenderedDocument::failed(err.into_pipeline_error(self.expose_error_details))
            }
        };

        if let Some(error) = document.error() {
            counter!(ARTICLE_RENDER_FAILURES_TOTAL, "kind" => error.kind.as_str()).increment(1);
        }
        histogram!(ARTICLE_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        document
    }

    async fn fetch_and_render(&self, identifier: &str) -> Result<RenderedDocument, AppError> {
        let fetched = self.source.fetch_content(identifier, true).await?;
        let content = RawContent::new(identifier, fetched.markdown);

        let pipeline = Arc::clone(&self.pipeline);
        let output = tokio::task::spawn_blocking(move || pipeline.render(&content))
            .await
            .map_err(|err| AppError::unexpected(format!("render task failed: {err}")))??;

        info!(
            target = "application::article",
            identifier,
            service = %fetched.service,
            code_blocks = output.code_blocks,
            embeds = output.embeds,
            "Article ready"
        );

        Ok(RenderedDocument::rendered(output.html, output.frontmatter))
    }
}
