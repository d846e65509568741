use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

/// Sandbox forced onto every embedded frame; no same-origin access.
const IFRAME_SANDBOX: &str = "allow-scripts allow-popups allow-presentation";

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitiser for the serialised article body. Highlighted code, embed cards
/// and heading ids are restored after it runs and never pass through it.
pub(crate) fn build_article_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "caption",
        "code",
        "dd",
        "del",
        "details",
        "div",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "iframe",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "picture",
        "pre",
        "s",
        "section",
        "source",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    // Links keep their own rel; off-site ones are decorated after sanitising.
    builder.link_rel(None);
    builder.add_tag_attributes("a", &["target", "rel"]);
    builder.add_tag_attributes(
        "img",
        &[
            "title",
            "width",
            "height",
            "alt",
            "srcset",
            "sizes",
            "loading",
            "decoding",
            "data-zoom-src",
        ],
    );
    builder.add_tag_attributes("source", &["srcset", "media", "type", "sizes", "width", "height"]);
    builder.add_tag_attributes(
        "iframe",
        &[
            "src",
            "srcdoc",
            "title",
            "width",
            "height",
            "allow",
            "allowfullscreen",
            "loading",
            "frameborder",
            "scrolling",
        ],
    );
    builder.set_tag_attribute_value("iframe", "sandbox", IFRAME_SANDBOX);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("pre", &["class"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("details", &["open"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.multiline_block_quotes = true;
    ext.alerts = true;
    ext.underline = true;
    ext.subscript = true;
    // Frontmatter is split off before parsing.
    ext.front_matter_delimiter = None;
    ext.greentext = false;

    let render = &mut options.render;
    render.full_info_string = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.figure_with_caption = false;
    render.sourcepos = false;
    render.gfm_quirks = true;
}

#[cfg(test)]
mod tests {
    use super::build_article_sanitizer;

    #[test]
    fn sanitizer_preserves_strikethrough_and_underline() {
        let sanitizer = build_article_sanitizer();
        let html = sanitizer
            .clean("<p><del>Removed</del> <u>Underline</u></p>")
            .to_string();

        assert!(html.contains("<del>Removed</del>"));
        assert!(html.contains("<u>Underline</u>"));
    }

    #[test]
    fn sanitizer_admits_backend_picture_markup() {
        let sanitizer = build_article_sanitizer();
        let html = sanitizer
            .clean("<picture><source srcset=\"https://img.example/a.webp\" type=\"image/webp\"><img src=\"https://img.example/a.png\" data-zoom-src=\"https://img.example/a-full.png\" class=\"prose-image\" alt=\"A\"></picture>")
            .to_string();

        assert!(html.contains("<picture>"));
        assert!(html.contains("srcset=\"https://img.example/a.webp\""));
        assert!(html.contains("data-zoom-src=\"https://img.example/a-full.png\""));
    }

    #[test]
    fn iframes_are_forced_into_a_sandbox() {
        let sanitizer = build_article_sanitizer();
        let html = sanitizer
            .clean("<iframe src=\"https://embed.example/v\" sandbox=\"allow-same-origin allow-scripts\"></iframe>")
            .to_string();

        assert!(html.contains("sandbox=\"allow-scripts allow-popups allow-presentation\""));
        assert!(!html.contains("allow-same-origin"));
    }

    #[test]
    fn scripts_and_handlers_are_removed() {
        let sanitizer = build_article_sanitizer();
        let html = sanitizer
            .clean("<p onclick=\"x()\">Hi<script>alert(1)</script></p>")
            .to_string();

        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn link_rel_is_left_to_the_author() {
        let sanitizer = build_article_sanitizer();
        let html = sanitizer.clean("<a href=\"/about\">About</a>").to_string();
        assert_eq!(html, "<a href=\"/about\">About</a>");
    }
}
