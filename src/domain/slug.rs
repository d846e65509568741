//! Utilities for generating deterministic heading anchors.
//!
//! The rule matches the one the rendering backend applies when it emits
//! `table_of_contents` ids, so a heading and its TOC entry agree without any
//! lookup: lowercase, spaces and underscores become `-`, characters that are
//! neither alphanumeric nor `-` are dropped, dash runs collapse and leading or
//! trailing dashes are trimmed.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Anchor used when a heading has no representable characters at all.
pub const FALLBACK_ANCHOR: &str = "section";

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = String::with_capacity(input.len());
    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            ' ' | '_' => '-',
            other if other.is_alphanumeric() || other == '-' => other,
            _ => continue,
        };
        if mapped == '-' && (candidate.is_empty() || candidate.ends_with('-')) {
            continue;
        }
        candidate.push(mapped);
    }

    while candidate.ends_with('-') {
        candidate.pop();
    }

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order receive monotonic suffixes when duplicates
/// occur (e.g. `overview`, `overview-2`, `overview-3`). A suffixed anchor never
/// shadows a slug that a later heading derives naturally.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl AnchorSlugger {
    /// Create a new slugger instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an anchor for the provided heading text, unique within this
    /// slugger. Headings without representable characters fall back to
    /// [`FALLBACK_ANCHOR`].
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading).unwrap_or_else(|_| FALLBACK_ANCHOR.to_string());
        let count = self.occurrences.entry(base.clone()).or_insert(0);

        let mut candidate = base.clone();
        loop {
            *count += 1;
            if *count > 1 {
                candidate = format!("{base}-{}", *count);
            }
            if !self.issued.contains(&candidate) {
                break;
            }
        }

        self.issued.insert(candidate.clone());
        candidate
    }
}
