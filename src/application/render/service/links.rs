//! Final HTML pass: off-site link decoration and image loading defaults.

use std::{cell::Cell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use url::{Origin, Url};

use crate::application::render::types::RenderError;

use super::{embed::EMBED_LINK_ROLE, icons::IconSet};

const EXTERNAL_REL: [&str; 3] = ["nofollow", "noopener", "noreferrer"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkKind {
    External,
    Internal,
    Anchor,
    Other,
}

/// Decorates links whose origin differs from the public site.
pub struct LinkDecorator {
    site_origin: Option<Origin>,
    external_icon: Option<String>,
}

pub(crate) struct DecoratedHtml {
    pub(crate) html: String,
    pub(crate) external_links: usize,
}

impl LinkDecorator {
    pub fn new(public_site_url: Option<&Url>, icons: &IconSet) -> Self {
        let external_icon = icons.resolve(
            "arrow-top-right-on-square",
            &[
                ("class", "inline-block ml-0.5 size-3 align-baseline relative -top-px"),
                ("stroke", "currentColor"),
                ("fill", "none"),
                ("stroke-width", "2"),
                ("aria-hidden", "true"),
            ],
        );

        Self {
            site_origin: public_site_url.map(Url::origin),
            external_icon,
        }
    }

    fn classify(&self, href: &str) -> LinkKind {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return LinkKind::Anchor;
        }

        let absolute = if href.starts_with("//") {
            Url::parse(&format!("https:{href}")).ok()
        } else if has_http_scheme(href) {
            Url::parse(href).ok()
        } else if href.contains(':') {
            return LinkKind::Other;
        } else {
            return LinkKind::Internal;
        };

        match absolute {
            Some(url) if url.host_str().is_some() => match &self.site_origin {
                Some(origin) if *origin == url.origin() => LinkKind::Internal,
                _ => LinkKind::External,
            },
            _ => LinkKind::Other,
        }
    }

    pub(crate) fn decorate(&self, html: &str) -> Result<DecoratedHtml, RenderError> {
        let external_links = Rc::new(Cell::new(0usize));

        let rewritten = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("a[href]", {
                        let external_links = Rc::clone(&external_links);
                        move |el| {
                            if el.get_attribute("data-role").as_deref() == Some(EMBED_LINK_ROLE) {
                                return Ok(());
                            }
                            let Some(href) = el.get_attribute("href") else {
                                return Ok(());
                            };
                            if self.classify(&href) != LinkKind::External {
                                return Ok(());
                            }

                            external_links.set(external_links.get() + 1);
                            el.set_attribute("target", "_blank")?;
                            el.set_attribute(
                                "rel",
                                &merge_rel(el.get_attribute("rel"), &EXTERNAL_REL),
                            )?;
                            if let Some(icon) = &self.external_icon {
                                el.append(icon, ContentType::Html);
                            }
                            Ok(())
                        }
                    }),
                    element!("img", |el| {
                        if el.get_attribute("loading").is_none() {
                            el.set_attribute("loading", "lazy")?;
                        }
                        if el.get_attribute("decoding").is_none() {
                            el.set_attribute("decoding", "async")?;
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| RenderError::Document {
            message: err.to_string(),
        })?;

        Ok(DecoratedHtml {
            html: rewritten,
            external_links: external_links.get(),
        })
    }
}

fn has_http_scheme(href: &str) -> bool {
    let lower = href.get(..8).unwrap_or(href).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(|token| token.to_ascii_lowercase())
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorator(site: Option<&str>) -> LinkDecorator {
        let site = site.map(|value| Url::parse(value).unwrap());
        LinkDecorator::new(site.as_ref(), &IconSet::bundled().unwrap())
    }

    #[test]
    fn off_site_links_are_decorated() {
        let decorated = decorator(Some("https://blog.example/"))
            .decorate("<p><a href=\"https://external.example/\" rel=\"me\">Out</a> <a href=\"/about\">About</a></p>")
            .unwrap();

        assert_eq!(decorated.external_links, 1);
        assert!(decorated.html.contains(
            "<a href=\"https://external.example/\" rel=\"me nofollow noopener noreferrer\" target=\"_blank\">Out<svg"
        ));
        assert!(decorated.html.contains("<a href=\"/about\">About</a>"));
    }

    #[test]
    fn same_origin_anchor_and_mail_links_are_untouched() {
        let html = "<a href=\"https://blog.example/post\">Same</a><a href=\"#intro\">Jump</a><a href=\"mailto:a@b.example\">Mail</a>";
        let decorated = decorator(Some("https://blog.example")).decorate(html).unwrap();

        assert_eq!(decorated.external_links, 0);
        assert_eq!(decorated.html, html);
    }

    #[test]
    fn protocol_relative_links_count_as_external() {
        let decorated = decorator(None)
            .decorate("<a href=\"//cdn.example/lib.js\">CDN</a>")
            .unwrap();
        assert_eq!(decorated.external_links, 1);
        assert!(decorated.html.contains("target=\"_blank\""));
    }

    #[test]
    fn embed_links_are_not_decorated_again() {
        let html = "<a href=\"https://site.example/p\" data-role=\"mixtape-link\" rel=\"noopener follow\">Card</a>";
        let decorated = decorator(None).decorate(html).unwrap();
        assert_eq!(decorated.html, html);
    }

    #[test]
    fn images_get_loading_defaults() {
        let decorated = decorator(None)
            .decorate("<img src=\"a.png\" alt=\"\"><img src=\"b.png\" loading=\"eager\">")
            .unwrap();
        assert!(decorated.html.contains("<img src=\"a.png\" alt=\"\" loading=\"lazy\" decoding=\"async\">"));
        assert!(decorated.html.contains("loading=\"eager\" decoding=\"async\""));
    }
}
