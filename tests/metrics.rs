use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use quire::application::article::ArticleService;
use quire::application::render::{ContentPipeline, PipelineConfig};
use quire::application::source::{ContentSource, ContentSourceError, FetchedContent};
use quire::infra::telemetry;

struct FixedSource;

#[async_trait]
impl ContentSource for FixedSource {
    async fn fetch_content(
        &self,
        identifier: &str,
        _with_frontmatter: bool,
    ) -> Result<FetchedContent, ContentSourceError> {
        if identifier == "present" {
            Ok(FetchedContent {
                markdown: "# Present\n\n```rust\nlet x = 1;\n```\n".to_string(),
                service: "fixed".to_string(),
            })
        } else {
            Err(ContentSourceError::NotFound {
                identifier: identifier.to_string(),
            })
        }
    }
}

#[tokio::test]
async fn article_loads_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let pipeline = ContentPipeline::new(PipelineConfig::default()).expect("pipeline builds");
    let service = ArticleService::new(Arc::new(FixedSource), Arc::new(pipeline), false);

    assert!(service.load("present").await.html().is_some());
    assert!(service.load("absent").await.error().is_some());

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        telemetry::ARTICLE_RENDER_TOTAL,
        telemetry::ARTICLE_RENDER_FAILURES_TOTAL,
        telemetry::ARTICLE_RENDER_MS,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let failure_labels: Vec<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == telemetry::ARTICLE_RENDER_FAILURES_TOTAL
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(failure_labels, vec!["kind=not_found".to_string()]);
}
