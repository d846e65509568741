//! Code fence metadata: language token and emphasis decorations.
//!
//! The backend annotates fence info strings such as
//! `rust decorations="[{\"start\":4,\"end\":9,\"type\":\"strong\"}]"`.
//! Offsets count characters of the code body. Anything that cannot be
//! understood is dropped rather than failing the article.

use serde::Deserialize;
use tracing::debug;

pub(crate) const DEFAULT_LANGUAGE: &str = "text";
const DECORATIONS_KEY: &str = "decorations=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationStyle {
    Strong,
    Emphasis,
}

impl DecorationStyle {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strong" | "bold" | "b" => Some(Self::Strong),
            "em" | "emphasis" | "italic" | "i" => Some(Self::Emphasis),
            _ => None,
        }
    }

    pub(crate) fn tag(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Emphasis => "em",
        }
    }
}

/// Character range of the code body rendered with extra emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub start: usize,
    pub end: usize,
    pub style: DecorationStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub code: String,
    pub language: String,
    pub decorations: Vec<Decoration>,
}

impl CodeBlock {
    /// Build a block from a fence info string and its literal body. The single
    /// trailing newline the parser keeps is not part of the code.
    pub fn from_fence(info: &str, literal: &str) -> Self {
        let code = literal
            .strip_suffix('\n')
            .map(|code| code.strip_suffix('\r').unwrap_or(code))
            .unwrap_or(literal)
            .to_string();
        let language = info
            .split_whitespace()
            .next()
            .filter(|token| !token.starts_with(DECORATIONS_KEY))
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        let length = code.chars().count();
        let decorations = parse_decorations(info, length);

        Self {
            code,
            language,
            decorations,
        }
    }

    pub fn line_count(&self) -> usize {
        self.code.lines().count().max(1)
    }
}

#[derive(Debug, Deserialize)]
struct RawDecoration {
    start: i64,
    end: i64,
    #[serde(rename = "type", alias = "style")]
    style: String,
}

/// Extract decorations from an info string, clamped to `[0, length]`.
pub(crate) fn parse_decorations(info: &str, length: usize) -> Vec<Decoration> {
    let Some(position) = info.find(DECORATIONS_KEY) else {
        return Vec::new();
    };
    let value = &info[position + DECORATIONS_KEY.len()..];

    let raw = candidate_payloads(value)
        .into_iter()
        .find_map(|payload| serde_json::from_str::<Vec<serde_json::Value>>(&payload).ok());
    let Some(raw) = raw else {
        debug!(
            target = "application::render::decorations",
            info, "Ignoring unparsable code decorations"
        );
        return Vec::new();
    };

    raw.into_iter()
        .filter_map(|entry| serde_json::from_value::<RawDecoration>(entry).ok())
        .filter_map(|entry| {
            let style = DecorationStyle::parse(&entry.style)?;
            let start = clamp_offset(entry.start, length);
            let end = clamp_offset(entry.end, length);
            (start < end).then_some(Decoration { start, end, style })
        })
        .collect()
}

fn clamp_offset(offset: i64, length: usize) -> usize {
    usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(length)
}

/// Possible JSON payloads for the attribute value, most specific first.
fn candidate_payloads(value: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    match value.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            if let Some(quoted) = read_quoted(&value[1..], quote) {
                candidates.push(quoted);
            }
        }
        _ => {}
    }

    // Unescaped JSON inside double quotes ends at the first inner quote, so
    // fall back to the outermost bracket pair.
    if let (Some(open), Some(close)) = (value.find('['), value.rfind(']')) {
        if open < close {
            let slice = &value[open..=close];
            candidates.push(slice.to_string());
            if slice.contains("\\\"") {
                candidates.push(unescape(slice));
            }
        }
    }

    candidates
}

fn read_quoted(value: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
    None
}

fn unescape(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_defaults_to_text() {
        let block = CodeBlock::from_fence("", "plain\n");
        assert_eq!(block.language, "text");
        assert_eq!(block.code, "plain");
        assert!(block.decorations.is_empty());
    }

    #[test]
    fn parses_escaped_decorations() {
        let info = r#"rust decorations="[{\"start\":0,\"end\":2,\"type\":\"strong\"},{\"start\":3,\"end\":7,\"type\":\"em\"}]""#;
        let block = CodeBlock::from_fence(info, "fn main() {}\n");

        assert_eq!(block.language, "rust");
        assert_eq!(
            block.decorations,
            vec![
                Decoration {
                    start: 0,
                    end: 2,
                    style: DecorationStyle::Strong
                },
                Decoration {
                    start: 3,
                    end: 7,
                    style: DecorationStyle::Emphasis
                },
            ]
        );
    }

    #[test]
    fn parses_unescaped_and_single_quoted_payloads() {
        let unescaped = r#"py decorations="[{"start":1,"end":3,"type":"strong"}]""#;
        assert_eq!(parse_decorations(unescaped, 10).len(), 1);

        let single = r#"py decorations='[{"start":1,"end":3,"style":"em"}]'"#;
        let parsed = parse_decorations(single, 10);
        assert_eq!(parsed[0].style, DecorationStyle::Emphasis);
    }

    #[test]
    fn offsets_are_clamped_and_empty_ranges_dropped() {
        let info = r#"js decorations="[{\"start\":-4,\"end\":3,\"type\":\"strong\"},{\"start\":2,\"end\":99,\"type\":\"em\"},{\"start\":50,\"end\":60,\"type\":\"em\"},{\"start\":4,\"end\":4,\"type\":\"em\"}]""#;
        let block = CodeBlock::from_fence(info, "let x = 1;\n");
        let length = block.code.chars().count();

        assert_eq!(block.decorations.len(), 2);
        assert_eq!(block.decorations[0].start, 0);
        assert_eq!(block.decorations[0].end, 3);
        assert_eq!(block.decorations[1].end, length);
        for decoration in &block.decorations {
            assert!(decoration.start < decoration.end);
            assert!(decoration.end <= length);
        }
    }

    #[test]
    fn malformed_payloads_are_ignored() {
        assert!(parse_decorations("go decorations=\"[{oops\"", 5).is_empty());
        assert!(parse_decorations(r#"go decorations="[{\"start\":0}]""#, 5).is_empty());
        assert!(
            parse_decorations(
                r#"go decorations="[{\"start\":0,\"end\":2,\"type\":\"underline\"}]""#,
                5
            )
            .is_empty()
        );
    }
}
