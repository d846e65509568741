//! Inline SVG icons resolved from the bundled Iconify dataset.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use super::escape_attribute;

const BUNDLED_ICONS: &str = include_str!("../../../../assets/icons/heroicons.json");
const DEFAULT_VIEWBOX_SIZE: u32 = 16;
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Deserialize)]
struct IconCollection {
    prefix: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    icons: HashMap<String, IconData>,
}

#[derive(Debug, Deserialize)]
struct IconData {
    body: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

/// Icon lookup over an Iconify JSON collection.
#[derive(Debug)]
pub struct IconSet {
    collection: IconCollection,
}

impl IconSet {
    /// The heroicons subset compiled into the binary.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_ICONS)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            collection: serde_json::from_str(json)?,
        })
    }

    /// Render `name` as an `<svg>` element.
    ///
    /// `attributes` override the defaults (`width`/`height` of `1em` and the
    /// icon's `viewBox`) in place and otherwise keep their given order;
    /// `xmlns` always comes last. Unknown icons yield `None`.
    pub fn resolve(&self, name: &str, attributes: &[(&str, &str)]) -> Option<String> {
        let Some(icon) = self.collection.icons.get(name) else {
            warn!(
                target = "application::render::icons",
                icon = name,
                prefix = %self.collection.prefix,
                "Icon not found in bundled collection"
            );
            return None;
        };

        let width = icon
            .width
            .or(self.collection.width)
            .unwrap_or(DEFAULT_VIEWBOX_SIZE);
        let height = icon
            .height
            .or(self.collection.height)
            .unwrap_or(DEFAULT_VIEWBOX_SIZE);

        let mut merged: Vec<(String, String)> = vec![
            ("width".to_string(), "1em".to_string()),
            ("height".to_string(), "1em".to_string()),
            ("viewBox".to_string(), format!("0 0 {width} {height}")),
        ];
        for (key, value) in attributes {
            if key.eq_ignore_ascii_case("xmlns") {
                continue;
            }
            match merged.iter_mut().find(|(existing, _)| existing == key) {
                Some(slot) => slot.1 = (*value).to_string(),
                None => merged.push(((*key).to_string(), (*value).to_string())),
            }
        }
        merged.push(("xmlns".to_string(), SVG_NAMESPACE.to_string()));

        let mut svg = String::from("<svg");
        for (key, value) in &merged {
            svg.push(' ');
            svg.push_str(key);
            svg.push_str("=\"");
            svg.push_str(&escape_attribute(value));
            svg.push('"');
        }
        svg.push('>');
        svg.push_str(&icon.body);
        svg.push_str("</svg>");
        Some(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_set_contains_copy_and_external_icons() {
        let icons = IconSet::bundled().expect("bundled icons parse");
        assert_eq!(icons.collection.prefix, "heroicons");
        for name in [
            "clipboard-document",
            "clipboard-document-check-solid",
            "arrow-top-right-on-square",
        ] {
            assert!(icons.resolve(name, &[]).is_some(), "missing {name}");
        }
    }

    #[test]
    fn attributes_override_defaults_and_xmlns_is_last() {
        let icons = IconSet::bundled().unwrap();
        let svg = icons
            .resolve(
                "link",
                &[
                    ("class", "size-4"),
                    ("width", "20"),
                    ("xmlns", "urn:bogus"),
                    ("aria-hidden", "true"),
                ],
            )
            .unwrap();

        assert!(svg.starts_with(
            "<svg width=\"20\" height=\"1em\" viewBox=\"0 0 24 24\" class=\"size-4\" aria-hidden=\"true\" xmlns=\"http://www.w3.org/2000/svg\">"
        ));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("urn:bogus"));
    }

    #[test]
    fn unknown_icon_resolves_to_none() {
        let icons = IconSet::bundled().unwrap();
        assert!(icons.resolve("does-not-exist", &[]).is_none());
    }

    #[test]
    fn per_icon_dimensions_win_over_collection() {
        let icons = IconSet::from_json(
            r#"{"prefix":"t","width":24,"height":24,"icons":{"dot":{"body":"<circle/>","width":20,"height":10}}}"#,
        )
        .unwrap();
        let svg = icons.resolve("dot", &[]).unwrap();
        assert!(svg.contains("viewBox=\"0 0 20 10\""));
    }
}
