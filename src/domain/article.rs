//! Article metadata carried alongside rendered HTML.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_AUTHOR: &str = "Unknown";
const AVATAR_SERVICE_URL: &str = "https://ui-avatars.com/api/";

/// Raw article text as delivered by the content source, frontmatter included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContent {
    pub slug: String,
    pub text: String,
}

impl RawContent {
    pub fn new(slug: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Author {
    /// Build an author, synthesising an initials avatar when none is supplied.
    pub fn new(name: impl Into<String>, avatar: Option<String>, role: Option<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_AUTHOR.to_string()
        } else {
            name.trim().to_string()
        };
        let avatar = avatar
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| synthesized_avatar(&name));
        let role = role.filter(|value| !value.trim().is_empty());

        Self { name, avatar, role }
    }

    pub fn unknown() -> Self {
        Self::new(DEFAULT_AUTHOR, None, None)
    }

    /// Append the reading time to the role line (`"Editor · 7 min read"`).
    pub fn with_reading_time(mut self, minutes: Option<u32>) -> Self {
        if let Some(minutes) = minutes {
            let suffix = format!("{minutes} min read");
            self.role = Some(match self.role.take() {
                Some(role) => format!("{role} · {suffix}"),
                None => suffix,
            });
        }
        self
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Initials avatar served by ui-avatars for authors without a picture.
pub fn synthesized_avatar(name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("{AVATAR_SERVICE_URL}?name={encoded}&background=random")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewImage {
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<PreviewImage>,
    #[serde(default)]
    pub table_of_contents: Vec<TocEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time_minutes: Option<u32>,
}

impl Default for Frontmatter {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            subtitle: None,
            author: Author::unknown(),
            preview_image: None,
            table_of_contents: Vec::new(),
            url: None,
            publication: None,
            tags: Vec::new(),
            reading_time_minutes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_author_gets_synthesized_avatar() {
        let author = Author::unknown();
        assert_eq!(author.name, "Unknown");
        assert_eq!(
            author.avatar,
            "https://ui-avatars.com/api/?name=Unknown&background=random"
        );
        assert!(author.role.is_none());
    }

    #[test]
    fn avatar_name_is_url_encoded() {
        let author = Author::new("Ada Lovelace", None, None);
        assert!(author.avatar.contains("name=Ada+Lovelace&"));
    }

    #[test]
    fn reading_time_extends_role() {
        let with_role = Author::new("Ada", None, Some("Editor".into())).with_reading_time(Some(7));
        assert_eq!(with_role.role.as_deref(), Some("Editor · 7 min read"));

        let without_role = Author::new("Ada", None, None).with_reading_time(Some(3));
        assert_eq!(without_role.role.as_deref(), Some("3 min read"));

        let untouched = Author::new("Ada", None, None).with_reading_time(None);
        assert!(untouched.role.is_none());
    }

    #[test]
    fn frontmatter_defaults() {
        let frontmatter = Frontmatter::default();
        assert_eq!(frontmatter.title, "Untitled");
        assert_eq!(frontmatter.author.name, "Unknown");
        assert!(frontmatter.table_of_contents.is_empty());
    }
}
