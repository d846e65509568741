//! Rendering backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    application::source::{ContentSource, ContentSourceError, FetchedContent},
    infra::error::InfraError,
};

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    content: &'a str,
    frontmatter: bool,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    service: String,
}

/// Talks to `POST {base_url}/render`.
#[derive(Clone, Debug)]
pub struct HttpContentSource {
    client: Client,
    endpoint: Url,
}

impl HttpContentSource {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, InfraError> {
        let endpoint = render_endpoint(base_url)?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::HttpClient(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn user_agent() -> &'static str {
        concat!("quire/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_content(
        &self,
        identifier: &str,
        with_frontmatter: bool,
    ) -> Result<FetchedContent, ContentSourceError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RenderRequest {
                content: identifier,
                frontmatter: with_frontmatter,
            })
            .send()
            .await
            .map_err(ContentSourceError::upstream)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ContentSourceError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                target = "infra::content_source",
                identifier,
                status = status.as_u16(),
                "Content backend rejected the request"
            );
            return Err(ContentSourceError::Upstream {
                message: format!("status {status} body {text}"),
            });
        }

        let body = response.bytes().await.map_err(ContentSourceError::upstream)?;
        let payload: RenderResponse =
            serde_json::from_slice(&body).map_err(|err| ContentSourceError::Decode {
                message: err.to_string(),
            })?;

        if payload.markdown.trim().is_empty() {
            return Err(ContentSourceError::NotFound {
                identifier: identifier.to_string(),
            });
        }

        debug!(
            target = "infra::content_source",
            identifier,
            service = %payload.service,
            bytes = payload.markdown.len(),
            "Fetched article markdown"
        );

        Ok(FetchedContent {
            markdown: payload.markdown,
            service: payload.service,
        })
    }
}

/// Append `render` to the base path, keeping any existing path segments.
fn render_endpoint(base_url: &Url) -> Result<Url, InfraError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("render")
        .map_err(|err| InfraError::configuration(format!("invalid content source url: {err}")))
}
