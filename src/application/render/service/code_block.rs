//! Dual-theme code block markup with a copy-to-clipboard control.

use crate::application::render::types::RenderError;

use super::{
    decorations::CodeBlock,
    escape_attribute,
    highlight::{HighlighterCache, ThemeVariant},
    icons::IconSet,
};

/// Blocks with at most this many lines get a vertically centred copy button.
const COMPACT_BLOCK_LINES: usize = 3;
const COPY_BUTTON_CLASS: &str = "code-copy-btn absolute right-3 size-8 p-1.5 flex items-center justify-center bg-black/50 text-white rounded-md transition-colors duration-200 cursor-pointer hover:bg-black/70";

pub struct CodeBlockRenderer {
    highlighter: HighlighterCache,
    ready_icon: String,
    success_icon: String,
    toggle_ms: u32,
}

impl CodeBlockRenderer {
    pub fn new(highlighter: HighlighterCache, icons: &IconSet, toggle_ms: u32) -> Self {
        let ready_icon = icons
            .resolve(
                "clipboard-document",
                &[
                    ("class", "size-5"),
                    ("stroke", "currentColor"),
                    ("fill", "none"),
                    ("stroke-width", "1.5"),
                ],
            )
            .unwrap_or_default();
        let success_icon = icons
            .resolve(
                "clipboard-document-check-solid",
                &[("class", "size-5"), ("fill", "currentColor")],
            )
            .unwrap_or_default();

        Self {
            highlighter,
            ready_icon,
            success_icon,
            toggle_ms,
        }
    }

    /// Render both themed variants and the copy button. The inactive theme is
    /// hidden with utility classes, never left out.
    pub fn render_code_block(&self, block: &CodeBlock) -> Result<String, RenderError> {
        let engine = self.highlighter.get()?;
        let light = engine.render(
            &block.code,
            &block.language,
            &block.decorations,
            ThemeVariant::Light,
        )?;
        let dark = engine.render(
            &block.code,
            &block.language,
            &block.decorations,
            ThemeVariant::Dark,
        )?;

        Ok(format!(
            "<div class=\"relative\" data-role=\"code-block\">{}<div class=\"dark:hidden\">{light}</div><div class=\"hidden dark:block\">{dark}</div></div>",
            self.copy_button(block)
        ))
    }

    fn copy_button(&self, block: &CodeBlock) -> String {
        let position = if block.line_count() <= COMPACT_BLOCK_LINES {
            "top-1/2 -translate-y-1/2"
        } else {
            "top-3"
        };

        format!(
            "<button type=\"button\" aria-label=\"Copy code\" data-code=\"{}\" data-toggle-ms=\"{}\" class=\"{COPY_BUTTON_CLASS} {position}\"><span class=\"ready block\">{}</span><span class=\"success hidden\">{}</span></button>",
            escape_code_attribute(&block.code),
            self.toggle_ms,
            self.ready_icon,
            self.success_icon,
        )
    }
}

/// Like [`escape_attribute`] but keeps line breaks as character references so
/// the copied text round-trips exactly.
fn escape_code_attribute(code: &str) -> String {
    let mut escaped = String::with_capacity(code.len());
    for ch in code.chars() {
        match ch {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            other => escaped.push_str(&escape_attribute(other.encode_utf8(&mut [0; 4]))),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> CodeBlockRenderer {
        let icons = IconSet::bundled().unwrap();
        CodeBlockRenderer::new(
            HighlighterCache::new("InspiredGitHub", "base16-ocean.dark"),
            &icons,
            1200,
        )
    }

    #[test]
    fn renders_both_themes_and_copy_button() {
        let block = CodeBlock::from_fence("rust", "let answer = \"42\";\n");
        let html = renderer().render_code_block(&block).unwrap();

        assert!(html.starts_with("<div class=\"relative\" data-role=\"code-block\"><button"));
        assert!(html.contains("<div class=\"dark:hidden\"><pre class=\"code-block code-light"));
        assert!(html.contains("<div class=\"hidden dark:block\"><pre class=\"code-block code-dark"));
        assert!(html.contains("data-code=\"let answer = &quot;42&quot;;\""));
        assert!(html.contains("data-toggle-ms=\"1200\""));
        assert!(html.contains("<span class=\"ready block\"><svg"));
        assert!(html.contains("<span class=\"success hidden\"><svg"));
    }

    #[test]
    fn button_placement_depends_on_line_count() {
        let renderer = renderer();

        let short = CodeBlock::from_fence("", "a\nb\nc\n");
        assert!(
            renderer
                .render_code_block(&short)
                .unwrap()
                .contains("top-1/2 -translate-y-1/2")
        );

        let long = CodeBlock::from_fence("", "a\nb\nc\nd\n");
        let html = renderer.render_code_block(&long).unwrap();
        assert!(html.contains(" top-3\""));
        assert!(html.contains("data-code=\"a&#10;b&#10;c&#10;d\""));
    }
}
