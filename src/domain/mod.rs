//! Domain layer types and invariants.

pub mod article;
pub mod frontmatter;
pub mod slug;
