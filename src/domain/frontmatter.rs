//! Splits raw article text into its YAML header and Markdown body.
//!
//! Extraction never fails: a missing, unterminated or unparsable header yields
//! the default [`Frontmatter`] and the whole input as body. Individual fields
//! with an unexpected shape are dropped on their own.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use tracing::warn;

use super::article::{Author, DEFAULT_TITLE, Frontmatter, PreviewImage, TocEntry};

const OPENING_FENCE: &str = "---";
const CLOSING_FENCES: [&str; 2] = ["---", "..."];

/// Separate the frontmatter from the body. The body is everything after the
/// closing fence line.
pub fn extract_frontmatter(raw: &str) -> (Frontmatter, String) {
    let Some((header, body)) = split_header(raw) else {
        return (Frontmatter::default(), raw.to_string());
    };

    if header.trim().is_empty() {
        return (Frontmatter::default(), body.to_string());
    }

    match serde_yaml::from_str::<RawFrontmatter>(header) {
        Ok(parsed) => (parsed.into_frontmatter(), body.to_string()),
        Err(err) => {
            warn!(
                target = "domain::frontmatter",
                error = %err,
                "Frontmatter is not valid YAML; rendering the whole input as body"
            );
            (Frontmatter::default(), raw.to_string())
        }
    }
}

fn split_header(raw: &str) -> Option<(&str, &str)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let (first_line, rest) = split_line(text);
    if first_line.trim_end() != OPENING_FENCE {
        return None;
    }

    let mut offset = 0;
    let mut remaining = rest?;
    loop {
        let (line, next) = split_line(remaining);
        if CLOSING_FENCES.contains(&line.trim_end()) {
            let header = &rest?[..offset];
            return Some((header, next.unwrap_or("")));
        }
        offset += line.len() + 1;
        match next {
            Some(next) => remaining = next,
            None => {
                warn!(
                    target = "domain::frontmatter",
                    "Frontmatter opening fence is never closed"
                );
                return None;
            }
        }
    }
}

/// Returns the first line (without its newline) and the remainder after the
/// newline, if there is one.
fn split_line(text: &str) -> (&str, Option<&str>) {
    match text.find('\n') {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontmatter {
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    subtitle: Option<String>,
    #[serde(deserialize_with = "lenient")]
    author: Option<AuthorField>,
    #[serde(
        alias = "previewImage",
        alias = "post_image",
        alias = "postImage",
        deserialize_with = "lenient"
    )]
    preview_image: Option<PreviewImageField>,
    #[serde(alias = "tableOfContents", deserialize_with = "lenient")]
    table_of_contents: Option<Vec<TocEntry>>,
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    publication: Option<String>,
    #[serde(deserialize_with = "lenient")]
    tags: Option<Vec<String>>,
    #[serde(alias = "readingTime", deserialize_with = "lenient")]
    reading_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorField {
    Name(String),
    Profile {
        name: String,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        role: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PreviewImageField {
    Url(String),
    Sized {
        medium: String,
        #[serde(default)]
        zoom: Option<String>,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        original: Option<String>,
    },
}

/// Accept any YAML value and keep it only when it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(serde_yaml::from_value(value).ok())
}

impl RawFrontmatter {
    fn into_frontmatter(self) -> Frontmatter {
        let reading_time_minutes = self.reading_time.and_then(reading_minutes);

        let author = match self.author {
            Some(AuthorField::Name(name)) => Author::new(name, None, None),
            Some(AuthorField::Profile { name, avatar, role }) => Author::new(name, avatar, role),
            None => Author::unknown(),
        }
        .with_reading_time(reading_time_minutes);

        let preview_image = self.preview_image.and_then(|field| match field {
            PreviewImageField::Url(url) => non_empty(url).map(|display| PreviewImage {
                display,
                zoom_url: None,
                caption: None,
            }),
            PreviewImageField::Sized {
                medium,
                zoom,
                caption,
                original,
            } => non_empty(medium).map(|display| PreviewImage {
                display,
                zoom_url: zoom.and_then(non_empty).or_else(|| original.and_then(non_empty)),
                caption: caption.and_then(non_empty),
            }),
        });

        Frontmatter {
            title: self
                .title
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            subtitle: self.subtitle.and_then(non_empty),
            author,
            preview_image,
            table_of_contents: self.table_of_contents.unwrap_or_default(),
            url: self.url.and_then(non_empty),
            publication: self.publication.and_then(non_empty),
            tags: self.tags.unwrap_or_default(),
            reading_time_minutes,
        }
    }
}

fn reading_minutes(value: f64) -> Option<u32> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value.ceil().min(f64::from(u32::MAX)) as u32)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_returns_defaults_and_whole_input() {
        let raw = "# Hello\n\nBody text.\n";
        let (frontmatter, body) = extract_frontmatter(raw);
        assert_eq!(frontmatter, Frontmatter::default());
        assert_eq!(body, raw);
    }

    #[test]
    fn parses_profile_author_and_sized_image() {
        let raw = "---\ntitle: Fast Parsers\nsubtitle: Notes\nauthor:\n  name: Ada\n  avatar: https://img.example/ada.png\n  role: Editor\nreading_time: 6.2\npreview_image:\n  medium: https://img.example/m.png\n  original: https://img.example/o.png\n---\nBody\n";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(body, "Body\n");
        assert_eq!(frontmatter.title, "Fast Parsers");
        assert_eq!(frontmatter.subtitle.as_deref(), Some("Notes"));
        assert_eq!(frontmatter.author.avatar, "https://img.example/ada.png");
        assert_eq!(frontmatter.author.role.as_deref(), Some("Editor · 7 min read"));
        assert_eq!(frontmatter.reading_time_minutes, Some(7));
        let image = frontmatter.preview_image.expect("preview image");
        assert_eq!(image.display, "https://img.example/m.png");
        assert_eq!(image.zoom_url.as_deref(), Some("https://img.example/o.png"));
    }

    #[test]
    fn parses_bare_author_and_image_url() {
        let raw = "---\nauthor: Grace\npreview_image: https://img.example/cover.png\ntags: [rust, parsing]\n---\n";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(body, "");
        assert_eq!(frontmatter.title, "Untitled");
        assert_eq!(frontmatter.author.name, "Grace");
        assert!(frontmatter.author.avatar.contains("name=Grace"));
        assert_eq!(
            frontmatter.preview_image.map(|image| image.display),
            Some("https://img.example/cover.png".to_string())
        );
        assert_eq!(frontmatter.tags, vec!["rust", "parsing"]);
    }

    #[test]
    fn table_of_contents_is_kept_verbatim() {
        let raw = "---\ntable_of_contents:\n  - id: intro\n    title: Intro\n  - id: intro\n    title: Again\n---\nBody";
        let (frontmatter, _) = extract_frontmatter(raw);

        let ids: Vec<_> = frontmatter
            .table_of_contents
            .iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, vec!["intro", "intro"]);
    }

    #[test]
    fn mismatched_field_types_degrade_individually() {
        let raw = "---\ntitle: Kept\nauthor: [not, a, name]\ntable_of_contents: nope\nreading_time: soon\n---\nBody";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(body, "Body");
        assert_eq!(frontmatter.title, "Kept");
        assert_eq!(frontmatter.author.name, "Unknown");
        assert!(frontmatter.table_of_contents.is_empty());
        assert!(frontmatter.author.role.is_none());
    }

    #[test]
    fn malformed_yaml_returns_defaults_and_whole_input() {
        let raw = "---\ntitle: [unclosed\n---\nBody";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(frontmatter, Frontmatter::default());
        assert_eq!(body, raw);
    }

    #[test]
    fn unterminated_header_is_treated_as_body() {
        let raw = "---\ntitle: Never closed\n";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(frontmatter.title, "Untitled");
        assert_eq!(body, raw);
    }

    #[test]
    fn crlf_fences_are_recognised() {
        let raw = "---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let (frontmatter, body) = extract_frontmatter(raw);

        assert_eq!(frontmatter.title, "Windows");
        assert_eq!(body, "Body\r\n");
    }
}
