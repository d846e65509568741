//! Application services: article loading, rendering and error mapping.

pub mod article;
pub mod error;
pub mod render;
pub mod source;
