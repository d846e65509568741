mod code_block;
mod config;
mod decorations;
mod embed;
mod highlight;
mod icons;
mod links;
mod rewrite;

use std::collections::HashSet;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::application::render::types::{
    RenderError, RenderOutput, RenderService, RenderedDocument, RenderedHeading,
};
use crate::domain::{
    article::{Frontmatter, RawContent, TocEntry},
    frontmatter::extract_frontmatter,
};

pub use code_block::CodeBlockRenderer;
pub use decorations::{CodeBlock, Decoration, DecorationStyle};
pub use embed::{EmbedCard, EmbedDetector};
pub use highlight::{Highlighter, HighlighterCache, HighlighterError, ThemeVariant};
pub use icons::IconSet;
use links::LinkDecorator;

use config::{build_article_sanitizer, default_options};
use rewrite::{FragmentRestorer, rewrite_ast};

pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_COPY_TOGGLE_MS: u32 = 1200;

/// Heading levels that feed a derived table of contents.
const DERIVED_TOC_LEVELS: [u8; 2] = [2, 3];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub light_theme: String,
    pub dark_theme: String,
    pub copy_toggle_ms: u32,
    pub public_site_url: Option<Url>,
    pub sanitize: bool,
    pub derive_toc_from_headings: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            light_theme: DEFAULT_LIGHT_THEME.to_string(),
            dark_theme: DEFAULT_DARK_THEME.to_string(),
            copy_toggle_ms: DEFAULT_COPY_TOGGLE_MS,
            public_site_url: None,
            sanitize: true,
            derive_toc_from_headings: false,
        }
    }
}

impl From<&crate::config::RenderSettings> for PipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            light_theme: settings.light_theme.clone(),
            dark_theme: settings.dark_theme.clone(),
            copy_toggle_ms: settings.copy_toggle_ms.get(),
            public_site_url: settings.public_site_url.clone(),
            sanitize: settings.sanitize,
            derive_toc_from_headings: settings.derive_toc_from_headings,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineBuildError {
    #[error("bundled icon set is invalid: {0}")]
    Icons(#[from] serde_json::Error),
    #[error("pipeline pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

/// Comrak-based article pipeline with dual-theme syntect highlighting, embed
/// cards, heading anchors and Ammonia sanitisation.
///
/// The highlighting engine is created on first use and owned by the pipeline.
pub struct ContentPipeline {
    options: comrak::Options<'static>,
    sanitizer: Option<ammonia::Builder<'static>>,
    code_blocks: CodeBlockRenderer,
    embeds: EmbedDetector,
    restorer: FragmentRestorer,
    links: LinkDecorator,
    derive_toc: bool,
}

impl ContentPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineBuildError> {
        let icons = IconSet::bundled()?;
        let highlighter = HighlighterCache::new(config.light_theme, config.dark_theme);

        Ok(Self {
            options: default_options(),
            sanitizer: config.sanitize.then(build_article_sanitizer),
            code_blocks: CodeBlockRenderer::new(highlighter, &icons, config.copy_toggle_ms),
            embeds: EmbedDetector::new()?,
            restorer: FragmentRestorer::new()?,
            links: LinkDecorator::new(config.public_site_url.as_ref(), &icons),
            derive_toc: config.derive_toc_from_headings,
        })
    }

    /// Render and fold the outcome into a [`RenderedDocument`].
    pub fn render_document(&self, content: &RawContent, expose_details: bool) -> RenderedDocument {
        RenderedDocument::from_result(self.render(content), expose_details)
    }

    /// Render without the sanitisation stage, for inspecting sanitiser rules.
    pub fn render_unsanitized(&self, content: &RawContent) -> Result<RenderOutput, RenderError> {
        self.run(content, None)
    }

    fn run(
        &self,
        content: &RawContent,
        sanitizer: Option<&ammonia::Builder<'static>>,
    ) -> Result<RenderOutput, RenderError> {
        let (frontmatter, body) = extract_frontmatter(&content.text);

        let arena = Arena::new();
        let root = parse_document(&arena, &body, &self.options);

        let outcome = rewrite_ast(
            root,
            &body,
            |node| arena.alloc(node),
            &self.code_blocks,
            &self.embeds,
            &content.slug,
        )?;

        let html = render_html_stage(root, &self.options)?;
        let html = sanitize_stage(html, sanitizer);
        let html = self.restorer.restore(&html, &outcome, &content.slug);
        let decorated = self.links.decorate(&html)?;

        debug!(
            target = "application::render::pipeline",
            slug = %content.slug,
            headings = outcome.headings.len(),
            code_blocks = outcome.code_blocks,
            embeds = outcome.embeds,
            external_links = decorated.external_links,
            "Article rendered"
        );

        let frontmatter = reconcile_toc(frontmatter, &outcome.headings, self.derive_toc, &content.slug);

        Ok(RenderOutput {
            html: decorated.html,
            frontmatter,
            headings: outcome.headings,
            code_blocks: outcome.code_blocks,
            embeds: outcome.embeds,
        })
    }
}

impl RenderService for ContentPipeline {
    fn render(&self, content: &RawContent) -> Result<RenderOutput, RenderError> {
        self.run(content, self.sanitizer.as_ref())
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn sanitize_stage(html: String, sanitizer: Option<&ammonia::Builder<'static>>) -> String {
    match sanitizer {
        Some(sanitizer) => sanitizer.clean(&html).to_string(),
        None => html,
    }
}

/// Keep the authored TOC as is, logging ids that point nowhere. Without one,
/// optionally derive it from the rendered headings.
fn reconcile_toc(
    mut frontmatter: Frontmatter,
    headings: &[RenderedHeading],
    derive: bool,
    slug: &str,
) -> Frontmatter {
    if frontmatter.table_of_contents.is_empty() {
        if derive {
            frontmatter.table_of_contents = headings
                .iter()
                .filter(|heading| DERIVED_TOC_LEVELS.contains(&heading.level))
                .map(|heading| TocEntry {
                    id: heading.anchor.clone(),
                    title: heading.text.clone(),
                })
                .collect();
        }
        return frontmatter;
    }

    let anchors: HashSet<&str> = headings.iter().map(|heading| heading.anchor.as_str()).collect();
    let mut seen = HashSet::new();
    for entry in &frontmatter.table_of_contents {
        if !seen.insert(entry.id.as_str()) {
            warn!(
                target = "application::render::toc",
                slug,
                id = %entry.id,
                "Duplicate table of contents id"
            );
        }
        if !anchors.contains(entry.id.as_str()) {
            warn!(
                target = "application::render::toc",
                slug,
                id = %entry.id,
                "Table of contents entry matches no heading"
            );
        }
    }

    frontmatter
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
