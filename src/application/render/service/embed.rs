//! Link-preview ("mixtape") cards.
//!
//! A linked image followed by a two-line block quote
//!
//! ```text
//! [![alt](https://img.example/cover.png)](https://site.example/post)
//! >Post title
//! >Short description
//! ```
//!
//! becomes a card linking to the post. Detection runs over the source text of
//! the paragraph and the block quote the parser splits off after it.

use regex::Regex;
use url::Url;

use super::escape_attribute;

const EMBED_PATTERN: &str = r"^\[!\[(.*?)\]\((.*?)\)\]\((.*?)\)\n>(.*?)\n>(.*?)\n$";
pub(crate) const EMBED_LINK_ROLE: &str = "mixtape-link";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedCard {
    pub alt: String,
    pub image_url: String,
    pub link_url: String,
    pub site_name: String,
    pub title: String,
    pub description: String,
}

pub struct EmbedDetector {
    pattern: Regex,
}

impl EmbedDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(EMBED_PATTERN)?,
        })
    }

    /// Match `source` (paragraph line plus quote lines, newline-terminated).
    /// Links without a host never produce a card.
    pub fn detect(&self, source: &str) -> Option<EmbedCard> {
        let normalized = source.replace("\r\n", "\n");
        let captures = self.pattern.captures(&normalized)?;
        let group = |index: usize| {
            captures
                .get(index)
                .map(|found| found.as_str().trim().to_string())
                .unwrap_or_default()
        };

        let link_url = group(3);
        let site_name = Url::parse(&link_url)
            .ok()?
            .host_str()
            .filter(|host| !host.is_empty())?
            .to_string();

        Some(EmbedCard {
            alt: group(1),
            image_url: group(2),
            link_url,
            site_name,
            title: group(4),
            description: group(5),
        })
    }
}

impl EmbedCard {
    pub fn to_html(&self) -> String {
        let background = css_url(&self.image_url);
        format!(
            "<div class=\"mixtape-embed\"><a href=\"{link}\" data-role=\"{EMBED_LINK_ROLE}\" target=\"_blank\" rel=\"noopener follow\"><div class=\"mixtape-content\"><div class=\"mixtape-text\"><h2>{title}</h2><div class=\"mixtape-description\"><h3>{description}</h3></div><div class=\"mixtape-site\"><p>{site}</p></div></div><div class=\"mixtape-image\"><div class=\"mixtape-image-inner\" role=\"img\" aria-label=\"{alt}\" style=\"background-image: url('{background}')\"></div></div></div></a></div>",
            link = escape_attribute(&self.link_url),
            title = escape_attribute(&self.title),
            description = escape_attribute(&self.description),
            site = escape_attribute(&self.site_name),
            alt = escape_attribute(&self.alt),
        )
    }
}

/// Quote-safe value for a single-quoted CSS `url()` inside an HTML attribute.
fn css_url(url: &str) -> String {
    let cleaned: String = url
        .chars()
        .filter(|ch| !matches!(ch, '\'' | '\\' | '(' | ')' | '\n' | '\r'))
        .collect();
    escape_attribute(&cleaned)
}
