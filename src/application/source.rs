//! Content source trait describing the rendering backend adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::render::ErrorKind;

/// Markdown produced by the backend for a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedContent {
    pub markdown: String,
    pub service: String,
}

#[derive(Debug, Error)]
pub enum ContentSourceError {
    #[error("no article for `{identifier}`")]
    NotFound { identifier: String },
    #[error("content backend failed: {message}")]
    Upstream { message: String },
    #[error("content backend returned an unreadable body: {message}")]
    Decode { message: String },
}

impl ContentSourceError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContentSourceError::NotFound { .. } => ErrorKind::NotFound,
            ContentSourceError::Upstream { .. } | ContentSourceError::Decode { .. } => {
                ErrorKind::RenderFailure
            }
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Ask the backend for the Markdown behind `identifier` (a slug or URL).
    /// With `with_frontmatter` set the backend prepends a YAML header.
    async fn fetch_content(
        &self,
        identifier: &str,
        with_frontmatter: bool,
    ) -> Result<FetchedContent, ContentSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_caller_kinds() {
        let missing = ContentSourceError::NotFound {
            identifier: "x".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(
            ContentSourceError::upstream("timeout").kind(),
            ErrorKind::RenderFailure
        );
    }
}
