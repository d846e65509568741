//! Server-side article reader.
//!
//! Markdown articles are fetched from a rendering backend, turned into
//! highlighted and anchored HTML by [`application::render::ContentPipeline`]
//! and served through the axum router in [`infra::http`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
