use std::cell::RefCell;

use comrak::nodes::{Ast, AstNode, LineColumn, NodeHtmlBlock, NodeValue};
use regex::{Captures, Regex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    application::render::types::{RenderError, RenderedHeading},
    domain::slug::AnchorSlugger,
};

use super::{code_block::CodeBlockRenderer, decorations::CodeBlock, embed::EmbedDetector};

/// HTML produced outside the sanitiser and spliced back in afterwards.
#[derive(Debug, Clone)]
pub(crate) struct TrustedFragment {
    pub(crate) placeholder: String,
    pub(crate) html: String,
    pub(crate) kind: FragmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentKind {
    /// Stands alone in a `<div>` wrapper.
    Block,
    /// Opening tag attributes for the heading that starts with the placeholder.
    HeadingAnchor { level: u8 },
}

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    /// Per-render token embedded in every placeholder.
    pub(crate) nonce: String,
    pub(crate) headings: Vec<RenderedHeading>,
    pub(crate) fragments: Vec<TrustedFragment>,
    pub(crate) code_blocks: usize,
    pub(crate) embeds: usize,
}

enum PendingEdit<'a> {
    /// Turn the node into a raw HTML block and drop its children.
    ReplaceWithHtml { node: &'a AstNode<'a>, html: String },
    Detach(&'a AstNode<'a>),
    PrependInline { node: &'a AstNode<'a>, html: String },
}

/// Walk the tree, then apply every collected edit. `allocate` places new
/// nodes in the caller's arena.
pub(crate) fn rewrite_ast<'a, F>(
    root: &'a AstNode<'a>,
    source: &str,
    allocate: F,
    code_blocks: &CodeBlockRenderer,
    embeds: &EmbedDetector,
    slug: &str,
) -> Result<RewriteOutcome, RenderError>
where
    F: Fn(AstNode<'a>) -> &'a AstNode<'a>,
{
    let mut walker = RewriteWalker {
        source_lines: source.lines().collect(),
        code_blocks,
        embeds,
        slug,
        slugger: AnchorSlugger::new(),
        outcome: RewriteOutcome {
            nonce: Uuid::new_v4().simple().to_string(),
            ..RewriteOutcome::default()
        },
        edits: Vec::new(),
    };
    walker.visit_nodes(root)?;

    let RewriteWalker { outcome, edits, .. } = walker;
    for edit in edits {
        match edit {
            PendingEdit::ReplaceWithHtml { node, html } => {
                node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: html,
                });
                while let Some(child) = node.first_child() {
                    child.detach();
                }
            }
            PendingEdit::Detach(node) => node.detach(),
            PendingEdit::PrependInline { node, html } => {
                let start: LineColumn = node.data.borrow().sourcepos.start;
                let inline = allocate(AstNode::new(RefCell::new(Ast::new(
                    NodeValue::HtmlInline(html),
                    start,
                ))));
                node.prepend(inline);
            }
        }
    }

    Ok(outcome)
}

struct RewriteWalker<'a, 'r> {
    source_lines: Vec<&'r str>,
    code_blocks: &'r CodeBlockRenderer,
    embeds: &'r EmbedDetector,
    slug: &'r str,
    slugger: AnchorSlugger,
    outcome: RewriteOutcome,
    edits: Vec<PendingEdit<'a>>,
}

impl<'a> RewriteWalker<'a, '_> {
    /// Returns `true` when the node consumed its next sibling.
    fn visit_nodes(&mut self, node: &'a AstNode<'a>) -> Result<bool, RenderError> {
        if let Some(level) = heading_level(node) {
            self.handle_heading(node, level);
        } else if let Some((info, literal)) = extract_code_block(node) {
            self.handle_code_block(node, &info, &literal)?;
            return Ok(false);
        } else if self.handle_embed(node) {
            return Ok(true);
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            let consumed_sibling = self.visit_nodes(next)?;
            child = next.next_sibling();
            if consumed_sibling {
                child = child.and_then(|sibling| sibling.next_sibling());
            }
        }

        Ok(false)
    }

    fn handle_heading(&mut self, node: &'a AstNode<'a>, level: u8) {
        let text = collect_inline_text(node);
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let anchor = self.slugger.anchor_for(&normalized);

        let placeholder = format!(
            "__{ANCHOR_MARKER}_{}_{}__",
            self.outcome.nonce,
            self.outcome.fragments.len()
        );
        self.outcome.fragments.push(TrustedFragment {
            placeholder: placeholder.clone(),
            html: format!(" id=\"{}\"", super::escape_attribute(&anchor)),
            kind: FragmentKind::HeadingAnchor { level },
        });
        self.outcome.headings.push(RenderedHeading {
            level,
            anchor,
            text: normalized,
        });
        self.edits.push(PendingEdit::PrependInline {
            node,
            html: placeholder,
        });
    }

    fn handle_code_block(
        &mut self,
        node: &'a AstNode<'a>,
        info: &str,
        literal: &str,
    ) -> Result<(), RenderError> {
        let block = CodeBlock::from_fence(info, literal);
        let html = self.code_blocks.render_code_block(&block)?;
        self.outcome.code_blocks += 1;

        let placeholder = self.push_block_fragment(html);
        self.edits.push(PendingEdit::ReplaceWithHtml {
            node,
            html: format!("<div>{placeholder}</div>"),
        });
        Ok(())
    }

    /// Paragraph holding a linked image, followed by a two-line block quote.
    fn handle_embed(&mut self, node: &'a AstNode<'a>) -> bool {
        if !is_paragraph(node) || !starts_with_linked_image(node) {
            return false;
        }
        let Some(quote) = node.next_sibling().filter(|sibling| is_block_quote(sibling)) else {
            return false;
        };

        let first_line = node.data.borrow().sourcepos.start.line;
        let last_line = quote.data.borrow().sourcepos.end.line;
        let Some(lines) = self
            .source_lines
            .get(first_line.saturating_sub(1)..last_line.min(self.source_lines.len()))
        else {
            return false;
        };
        let mut source = lines.join("\n");
        source.push('\n');

        let Some(card) = self.embeds.detect(&source) else {
            return false;
        };
        debug!(
            target = "application::render::embed",
            slug = self.slug,
            site = %card.site_name,
            "Rendering link preview card"
        );

        self.outcome.embeds += 1;
        let placeholder = self.push_block_fragment(card.to_html());
        self.edits.push(PendingEdit::ReplaceWithHtml {
            node,
            html: format!("<div>{placeholder}</div>"),
        });
        self.edits.push(PendingEdit::Detach(quote));
        true
    }

    fn push_block_fragment(&mut self, html: String) -> String {
        let placeholder = format!(
            "__{BLOCK_MARKER}_{}_{}__",
            self.outcome.nonce,
            self.outcome.fragments.len()
        );
        self.outcome.fragments.push(TrustedFragment {
            placeholder: placeholder.clone(),
            html,
            kind: FragmentKind::Block,
        });
        placeholder
    }
}

const BLOCK_MARKER: &str = "CONTENT_BLOCK";
const ANCHOR_MARKER: &str = "HEADING_ANCHOR";

/// Wrapped block, heading opener, or a bare marker whose wrapper the sanitiser
/// rewrote. Alternatives are tried left to right at each position.
const FRAGMENT_PATTERN: &str = r"<div>__CONTENT_BLOCK_([0-9a-f]{32})_(\d+)__</div>|<h([1-6])>__HEADING_ANCHOR_([0-9a-f]{32})_(\d+)__|__(?:CONTENT_BLOCK|HEADING_ANCHOR)_([0-9a-f]{32})_(\d+)__";

/// Splices trusted fragments back into sanitised HTML in a single pass.
pub(crate) struct FragmentRestorer {
    pattern: Regex,
}

impl FragmentRestorer {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(FRAGMENT_PATTERN)?,
        })
    }

    /// Each fragment is restored at most once and only where its placeholder
    /// carries this render's nonce. Anything else is left as written.
    pub(crate) fn restore(&self, html: &str, outcome: &RewriteOutcome, slug: &str) -> String {
        let mut restored = vec![false; outcome.fragments.len()];

        let output = self.pattern.replace_all(html, |caps: &Captures<'_>| {
            let whole = caps[0].to_string();
            let (nonce, index, heading_level) = if let Some(nonce) = caps.get(1) {
                (nonce.as_str(), &caps[2], None)
            } else if let Some(nonce) = caps.get(4) {
                (nonce.as_str(), &caps[5], Some(&caps[3]))
            } else {
                (&caps[6], &caps[7], None)
            };
            if nonce != outcome.nonce {
                return whole;
            }
            let Some(index) = index.parse::<usize>().ok().filter(|i| *i < restored.len()) else {
                return whole;
            };
            if restored[index] {
                return whole;
            }
            restored[index] = true;

            let fragment = &outcome.fragments[index];
            match (fragment.kind, heading_level) {
                (FragmentKind::HeadingAnchor { .. }, Some(level)) => {
                    format!("<h{level}{}>", fragment.html)
                }
                // The heading opener was altered upstream; drop the marker.
                (FragmentKind::HeadingAnchor { .. }, None) => String::new(),
                (FragmentKind::Block, _) => fragment.html.clone(),
            }
        });

        let missing = restored.iter().filter(|done| !**done).count();
        if missing > 0 {
            warn!(
                target = "application::render::restore",
                slug,
                missing,
                "Trusted fragments lost their placeholders"
            );
        }
        output.into_owned()
    }
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn heading_level(node: &AstNode<'_>) -> Option<u8> {
    let data = node.data.borrow();
    if let NodeValue::Heading(heading) = &data.value {
        Some(heading.level)
    } else {
        None
    }
}

fn is_paragraph(node: &AstNode<'_>) -> bool {
    matches!(node.data.borrow().value, NodeValue::Paragraph)
}

fn is_block_quote(node: &AstNode<'_>) -> bool {
    matches!(node.data.borrow().value, NodeValue::BlockQuote)
}

fn starts_with_linked_image(node: &AstNode<'_>) -> bool {
    let Some(link) = node.first_child() else {
        return false;
    };
    if !matches!(link.data.borrow().value, NodeValue::Link(_)) {
        return false;
    }
    link.first_child()
        .is_some_and(|image| matches!(image.data.borrow().value, NodeValue::Image(_)))
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};

    use super::*;
    use crate::application::render::service::{
        config::default_options, highlight::HighlighterCache, icons::IconSet,
    };

    fn rewrite(markdown: &str) -> (RewriteOutcome, String) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let renderer = CodeBlockRenderer::new(
            HighlighterCache::new("InspiredGitHub", "base16-ocean.dark"),
            &IconSet::bundled().unwrap(),
            1200,
        );
        let embeds = EmbedDetector::new().unwrap();

        let outcome = rewrite_ast(
            root,
            markdown,
            |node| arena.alloc(node),
            &renderer,
            &embeds,
            "test",
        )
        .expect("rewrite");
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        (outcome, html)
    }

    #[test]
    fn headings_receive_placeholders_and_unique_anchors() {
        let (outcome, html) = rewrite("## Benchmarks\n\n## Benchmarks\n\n### `code` *title*\n");

        let anchors: Vec<_> = outcome.headings.iter().map(|h| h.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["benchmarks", "benchmarks-2", "code-title"]);
        let first = &outcome.fragments[0].placeholder;
        let third = &outcome.fragments[2].placeholder;
        assert!(html.contains(&format!("<h2>{first}Benchmarks</h2>")));
        assert!(html.contains(&format!("<h3>{third}<code>code</code>")));
        assert!(first.contains(&outcome.nonce));
    }

    #[test]
    fn code_blocks_become_block_placeholders() {
        let (outcome, html) = rewrite("Intro\n\n```rust\nfn main() {}\n```\n\n> ```\n> nested\n> ```\n");

        assert_eq!(outcome.code_blocks, 2);
        for fragment in &outcome.fragments {
            assert!(html.contains(&format!("<div>{}</div>", fragment.placeholder)));
        }
        assert!(outcome.fragments[0].html.contains("data-role=\"code-block\""));
    }

    #[test]
    fn embed_replaces_paragraph_and_consumes_quote() {
        let markdown = "Before\n\n[![Cover](https://img.example/c.png)](https://site.example/p)\n>Title\n>Description\n\nAfter\n";
        let (outcome, html) = rewrite(markdown);

        assert_eq!(outcome.embeds, 1);
        assert!(html.contains(&format!("<div>{}</div>", outcome.fragments[0].placeholder)));
        assert!(!html.contains("<blockquote>"));
        assert!(html.contains("<p>After</p>"));
        assert!(outcome.fragments[0].html.contains("<p>site.example</p>"));
    }

    #[test]
    fn restore_fills_each_placeholder_once() {
        let (outcome, html) = rewrite("## Intro\n\n```\nx\n```\n");
        let restorer = FragmentRestorer::new().unwrap();
        let doubled = format!("{html}{html}");

        let restored = restorer.restore(&doubled, &outcome, "test");
        assert_eq!(restored.matches("<h2 id=\"intro\">").count(), 1);
        assert_eq!(restored.matches("data-role=\"code-block\"").count(), 1);
    }

    #[test]
    fn restore_ignores_markers_from_other_renders() {
        let (outcome, html) = rewrite("## Intro\n");
        let foreign = format!("<h2>__HEADING_ANCHOR_{}_0__Fake</h2>", "0".repeat(32));
        let restorer = FragmentRestorer::new().unwrap();

        let restored = restorer.restore(&format!("{foreign}{html}"), &outcome, "test");
        assert!(restored.starts_with(&foreign));
        assert!(restored.contains("<h2 id=\"intro\">Intro</h2>"));
    }

    #[test]
    fn linked_image_without_quote_is_left_alone() {
        let (outcome, html) = rewrite("[![Cover](https://img.example/c.png)](https://site.example/p)\n");

        assert_eq!(outcome.embeds, 0);
        assert!(html.contains("<img src=\"https://img.example/c.png\""));
    }
}
