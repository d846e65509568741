//! Markdown-to-HTML content pipeline.
//!
//! The pipeline is pure: it accepts raw article text, produces deterministic
//! HTML plus frontmatter, and surfaces structured errors. Fetching and metrics
//! happen in the caller.

mod service;
mod types;

pub use service::{
    CodeBlock, CodeBlockRenderer, ContentPipeline, DEFAULT_COPY_TOGGLE_MS, DEFAULT_DARK_THEME,
    DEFAULT_LIGHT_THEME, Decoration, DecorationStyle, EmbedCard, EmbedDetector, Highlighter,
    HighlighterCache, HighlighterError, IconSet, PipelineBuildError, PipelineConfig,
    ThemeVariant,
};
pub use types::{
    ErrorKind, PipelineError, RenderError, RenderOutput, RenderService, RenderedDocument,
    RenderedHeading,
};
