use std::{fmt::Write as _, sync::Arc};

use once_cell::sync::OnceCell;
use syntect::{
    dumps::from_uncompressed_data,
    easy::HighlightLines,
    highlighting::{Color, FontStyle, Style, Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use thiserror::Error;
use tracing::{error, info};

use crate::application::render::types::RenderError;

use super::decorations::{Decoration, DecorationStyle};

const SYNTAX_PACK: &[u8] = include_bytes!(env!("SYNTAX_PACK_FILE"));

/// Attributes that stop browsers, grammar checkers and IMEs from treating the
/// code element as an editable text field while keeping it focusable.
pub(crate) const CODE_ATTRIBUTES: [(&str, &str); 15] = [
    ("contenteditable", "true"),
    ("aria-label", "code"),
    ("aria-readonly", "true"),
    ("inputmode", "none"),
    ("tabindex", "0"),
    ("aria-multiline", "true"),
    ("aria-haspopup", "false"),
    ("data-gramm", "false"),
    ("data-gramm_editor", "false"),
    ("data-enable-grammarly", "false"),
    ("spellcheck", "false"),
    ("autocorrect", "off"),
    ("autocapitalize", "none"),
    ("autocomplete", "off"),
    ("data-ms-editor", "false"),
];

#[derive(Debug, Error)]
pub enum HighlighterError {
    #[error("bundled syntax pack is unreadable: {0}")]
    SyntaxPack(String),
    #[error("unknown highlighting theme `{0}`")]
    UnknownTheme(String),
}

/// Light or dark rendering of a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Light,
    Dark,
}

impl ThemeVariant {
    fn class(self) -> &'static str {
        match self {
            ThemeVariant::Light => "code-light",
            ThemeVariant::Dark => "code-dark",
        }
    }
}

/// Syntax definitions plus the light and dark themes.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    light: Theme,
    dark: Theme,
    light_name: String,
    dark_name: String,
}

impl Highlighter {
    pub fn new(light_theme: &str, dark_theme: &str) -> Result<Self, HighlighterError> {
        let syntax_set: SyntaxSet = from_uncompressed_data(SYNTAX_PACK)
            .map_err(|err| HighlighterError::SyntaxPack(err.to_string()))?;
        let mut themes = ThemeSet::load_defaults().themes;
        let light = themes
            .remove(light_theme)
            .ok_or_else(|| HighlighterError::UnknownTheme(light_theme.to_string()))?;
        let dark = match themes.remove(dark_theme) {
            Some(theme) => theme,
            None if dark_theme == light_theme => light.clone(),
            None => return Err(HighlighterError::UnknownTheme(dark_theme.to_string())),
        };

        Ok(Self {
            syntax_set,
            light,
            dark,
            light_name: light_theme.to_string(),
            dark_name: dark_theme.to_string(),
        })
    }

    fn theme(&self, variant: ThemeVariant) -> (&Theme, &str) {
        match variant {
            ThemeVariant::Light => (&self.light, &self.light_name),
            ThemeVariant::Dark => (&self.dark, &self.dark_name),
        }
    }

    /// Render `code` as a themed `<pre><code>` element. Unknown languages fall
    /// back to plain text; decorations wrap the covered characters.
    pub fn render(
        &self,
        code: &str,
        language: &str,
        decorations: &[Decoration],
        variant: ThemeVariant,
    ) -> Result<String, RenderError> {
        let syntax = find_syntax(&self.syntax_set, language)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let (theme, theme_name) = self.theme(variant);
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut source = code.to_string();
        source.push('\n');

        let mut lines = Vec::new();
        let mut offset = 0usize;
        for line in LinesWithEndings::from(source.as_str()) {
            let regions = highlighter
                .highlight_line(line, &self.syntax_set)
                .map_err(|err| RenderError::Highlighting {
                    language: language.to_string(),
                    message: err.to_string(),
                })?;

            let mut line_html = String::from("<span class=\"line\">");
            for (style, text) in regions {
                let visible = text.trim_end_matches(['\n', '\r']);
                push_token(&mut line_html, style, visible, offset, decorations);
                offset += text.chars().count();
            }
            line_html.push_str("</span>");
            lines.push(line_html);
        }

        let language_attr = super::escape_attribute(&language.to_ascii_lowercase());
        let mut html = String::with_capacity(code.len() * 4);
        let _ = write!(
            html,
            "<pre class=\"code-block {} theme-{}\" style=\"{}\" data-language=\"{}\"><code",
            variant.class(),
            super::escape_attribute(&theme_slug(theme_name)),
            pre_style(theme),
            language_attr,
        );
        for (key, value) in CODE_ATTRIBUTES {
            let _ = write!(html, " {key}=\"{value}\"");
        }
        html.push('>');
        html.push_str(&lines.join("\n"));
        html.push_str("</code></pre>");
        Ok(html)
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    if lowercase.is_empty() || lowercase == "text" || lowercase == "plaintext" {
        return None;
    }
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

/// Emit one highlighted token, split into one span per decoration segment.
fn push_token(
    out: &mut String,
    style: Style,
    text: &str,
    start: usize,
    decorations: &[Decoration],
) {
    if text.is_empty() {
        return;
    }

    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .collect();
    let length = bounds.len() - 1;

    let mut cuts = vec![0, length];
    for decoration in decorations {
        for edge in [decoration.start, decoration.end] {
            if edge > start && edge < start + length {
                cuts.push(edge - start);
            }
        }
    }
    cuts.sort_unstable();
    cuts.dedup();

    let css = token_style(style);
    for window in cuts.windows(2) {
        let (from, to) = (window[0], window[1]);
        let segment = &text[bounds[from]..bounds[to]];
        let position = start + from;
        let covered = |wanted: DecorationStyle| {
            decorations.iter().any(|decoration| {
                decoration.style == wanted
                    && decoration.start <= position
                    && position < decoration.end
            })
        };

        let mut wrappers = Vec::new();
        if covered(DecorationStyle::Strong) {
            wrappers.push(DecorationStyle::Strong.tag());
        }
        if covered(DecorationStyle::Emphasis) {
            wrappers.push(DecorationStyle::Emphasis.tag());
        }

        let _ = write!(out, "<span style=\"{css}\">");
        for tag in &wrappers {
            let _ = write!(out, "<{tag}>");
        }
        out.push_str(&escape_text(segment));
        for tag in wrappers.iter().rev() {
            let _ = write!(out, "</{tag}>");
        }
        out.push_str("</span>");
    }
}

fn token_style(style: Style) -> String {
    let mut css = format!("color:{}", hex(style.foreground));
    if style.font_style.contains(FontStyle::BOLD) {
        css.push_str(";font-weight:bold");
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        css.push_str(";font-style:italic");
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        css.push_str(";text-decoration:underline");
    }
    css
}

fn pre_style(theme: &Theme) -> String {
    let background = theme.settings.background.unwrap_or(Color::WHITE);
    let foreground = theme.settings.foreground.unwrap_or(Color::BLACK);
    format!(
        "background-color:{};color:{}",
        hex(background),
        hex(foreground)
    )
}

fn hex(color: Color) -> String {
    if color.a == 0xFF {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    } else {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            color.r, color.g, color.b, color.a
        )
    }
}

fn theme_slug(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Lazily constructs one [`Highlighter`] and shares it.
///
/// Concurrent first calls build the engine once. A construction failure is
/// remembered, so every later call reports the same engine error.
pub struct HighlighterCache {
    light_theme: String,
    dark_theme: String,
    cell: OnceCell<Result<Arc<Highlighter>, HighlighterError>>,
}

impl HighlighterCache {
    pub fn new(light_theme: impl Into<String>, dark_theme: impl Into<String>) -> Self {
        Self {
            light_theme: light_theme.into(),
            dark_theme: dark_theme.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<Highlighter>, RenderError> {
        let slot = self.cell.get_or_init(|| {
            match Highlighter::new(&self.light_theme, &self.dark_theme) {
                Ok(highlighter) => {
                    info!(
                        target = "application::render::highlight",
                        light = %self.light_theme,
                        dark = %self.dark_theme,
                        "Highlighting engine initialised"
                    );
                    Ok(Arc::new(highlighter))
                }
                Err(err) => {
                    error!(
                        target = "application::render::highlight",
                        error = %err,
                        "Highlighting engine failed to initialise"
                    );
                    Err(err)
                }
            }
        });

        match slot {
            Ok(highlighter) => Ok(Arc::clone(highlighter)),
            Err(err) => Err(RenderError::Engine {
                message: err.to_string(),
            }),
        }
    }
}
