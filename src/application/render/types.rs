use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::domain::article::{Frontmatter, RawContent};

/// Heading discovered while rewriting the document, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedHeading {
    pub level: u8,
    pub anchor: String,
    pub text: String,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Final article HTML, sanitised unless the caller opted out.
    pub html: String,
    pub frontmatter: Frontmatter,
    pub headings: Vec<RenderedHeading>,
    /// Number of fenced or indented code blocks that were highlighted.
    pub code_blocks: usize,
    /// Number of link-preview cards produced.
    pub embeds: usize,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
    #[error("highlighting engine unavailable: {message}")]
    Engine { message: String },
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Engine { .. } => ErrorKind::Internal,
            RenderError::Markdown { .. }
            | RenderError::Highlighting { .. }
            | RenderError::Document { .. } => ErrorKind::CompileFailure,
        }
    }
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, content: &RawContent) -> Result<RenderOutput, RenderError>;
}

/// Caller-facing failure category. Each category has a fixed status and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    RenderFailure,
    CompileFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::RenderFailure => 502,
            ErrorKind::CompileFailure | ErrorKind::Internal => 500,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ARTICLE_NOT_FOUND",
            ErrorKind::RenderFailure => "RENDER_ERROR",
            ErrorKind::CompileFailure => "COMPILE_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Article not found",
            ErrorKind::RenderFailure => "Failed to render article",
            ErrorKind::CompileFailure => "Failed to compile article content",
            ErrorKind::Internal => "Internal server error",
        }
    }

    /// Label used for metrics and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::RenderFailure => "render_failure",
            ErrorKind::CompileFailure => "compile_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    pub status: u16,
    pub message: String,
    pub kind: ErrorKind,
    pub code: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl PipelineError {
    /// Build an error of the given kind. `details` is only kept when
    /// `expose_details` is set.
    pub fn new(kind: ErrorKind, details: impl Into<String>, expose_details: bool) -> Self {
        Self {
            status: kind.status(),
            message: kind.message().to_string(),
            kind,
            code: kind.code().to_string(),
            details: expose_details.then(|| details.into()),
        }
    }

    pub fn from_render_error(error: &RenderError, expose_details: bool) -> Self {
        Self::new(error.kind(), error.to_string(), expose_details)
    }
}

/// Either a rendered article or the reason it could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedDocument {
    Rendered {
        html: String,
        frontmatter: Box<Frontmatter>,
    },
    Failed(PipelineError),
}

impl RenderedDocument {
    pub fn rendered(html: impl Into<String>, frontmatter: Frontmatter) -> Self {
        Self::Rendered {
            html: html.into(),
            frontmatter: Box::new(frontmatter),
        }
    }

    pub fn failed(error: PipelineError) -> Self {
        Self::Failed(error)
    }

    pub fn from_result(result: Result<RenderOutput, RenderError>, expose_details: bool) -> Self {
        match result {
            Ok(output) => Self::rendered(output.html, output.frontmatter),
            Err(err) => Self::Failed(PipelineError::from_render_error(&err, expose_details)),
        }
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Rendered { html, .. } => Some(html),
            Self::Failed(_) => None,
        }
    }

    pub fn frontmatter(&self) -> Option<&Frontmatter> {
        match self {
            Self::Rendered { frontmatter, .. } => Some(frontmatter),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Rendered { .. } => None,
            Self::Failed(error) => Some(error),
        }
    }

    /// HTTP status a page should answer with for this document.
    pub fn status(&self) -> u16 {
        self.error().map(|error| error.status).unwrap_or(200)
    }
}

#[derive(Serialize)]
struct RenderedDocumentRepr<'a> {
    html: Option<&'a str>,
    frontmatter: Option<&'a Frontmatter>,
    error: Option<&'a PipelineError>,
}

impl Serialize for RenderedDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        RenderedDocumentRepr {
            html: self.html(),
            frontmatter: self.frontmatter(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}
