//! Infrastructure adapters and runtime bootstrap.

pub mod content_source;
pub mod error;
pub mod http;
pub mod telemetry;
