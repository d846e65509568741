use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        render::{ErrorKind, PipelineError, RenderedDocument},
    },
    domain::article::{Frontmatter, PreviewImage, TocEntry},
};

const SITE_NAME: &str = "Quire";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Article page on success, error page with the document's status otherwise.
pub fn render_document_response(document: &RenderedDocument) -> Response {
    match document {
        RenderedDocument::Rendered { html, frontmatter } => {
            let content = ArticleView::new(frontmatter, html);
            let meta = PageMetaView::for_article(frontmatter);
            render_template_response(
                ArticleTemplate {
                    view: LayoutContext::new(meta, content),
                },
                StatusCode::OK,
            )
        }
        RenderedDocument::Failed(error) => render_error_response(error),
    }
}

pub fn render_error_response(error: &PipelineError) -> Response {
    let status = StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content = ErrorPageView::from_pipeline_error(error);
    let meta = PageMetaView::titled(&content.title);
    let mut response = render_template_response(
        ErrorTemplate {
            view: LayoutContext::new(meta, content),
        },
        status,
    );
    ErrorReport::from_pipeline_error("presentation::views::render_error_response", error)
        .attach(&mut response);
    response
}

/// Reader-facing sentence for each error code.
pub fn human_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "We couldn't find the article you're looking for.",
        ErrorKind::RenderFailure => "There was a problem preparing this article.",
        ErrorKind::CompileFailure => "There was a problem processing the article content.",
        ErrorKind::Internal => "An unexpected error occurred.",
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: Option<String>,
}

impl PageMetaView {
    pub fn titled(title: &str) -> Self {
        Self {
            title: format!("{title} | {SITE_NAME}"),
            description: String::new(),
            canonical: None,
        }
    }

    pub fn for_article(frontmatter: &Frontmatter) -> Self {
        Self {
            title: format!("{} | {SITE_NAME}", frontmatter.title),
            description: frontmatter.subtitle.clone().unwrap_or_default(),
            canonical: frontmatter.url.clone(),
        }
    }
}

pub struct LayoutContext<T> {
    pub meta: PageMetaView,
    pub site_name: &'static str,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(meta: PageMetaView, content: T) -> Self {
        Self {
            meta,
            site_name: SITE_NAME,
            content,
        }
    }
}

pub struct AuthorView {
    pub name: String,
    pub avatar: String,
    pub byline: String,
}

pub struct ArticleView {
    pub title: String,
    pub subtitle: String,
    pub author: AuthorView,
    pub publication: String,
    pub tags: Vec<String>,
    pub preview_image: Option<PreviewImage>,
    pub toc: Vec<TocEntry>,
    pub source_url: String,
    pub html: String,
}

impl ArticleView {
    pub fn new(frontmatter: &Frontmatter, html: &str) -> Self {
        let author = frontmatter.author.clone();

        Self {
            title: frontmatter.title.clone(),
            subtitle: frontmatter.subtitle.clone().unwrap_or_default(),
            author: AuthorView {
                name: author.name,
                avatar: author.avatar,
                byline: author.role.unwrap_or_default(),
            },
            publication: frontmatter.publication.clone().unwrap_or_default(),
            tags: frontmatter.tags.clone(),
            preview_image: frontmatter.preview_image.clone(),
            toc: frontmatter.table_of_contents.clone(),
            source_url: frontmatter.url.clone().unwrap_or_default(),
            html: html.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub code: String,
    pub title: String,
    pub message: String,
    pub details: Option<String>,
    pub primary_action: ErrorAction,
}

impl ErrorPageView {
    pub fn from_pipeline_error(error: &PipelineError) -> Self {
        Self {
            status: error.status,
            code: error.code.clone(),
            title: error.message.clone(),
            message: human_message(error.kind).to_string(),
            details: error.details.clone(),
            primary_action: ErrorAction::home(),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub struct IndexView {
    pub placeholder: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

impl IndexTemplate {
    pub fn landing() -> Self {
        Self {
            view: LayoutContext::new(
                PageMetaView::titled("Read without the clutter"),
                IndexView {
                    placeholder: "Paste an article URL or slug",
                },
            ),
        }
    }
}
