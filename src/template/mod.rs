//! Template engine module
//!
//! Resolves template names against a fixed directory and caches file
//! content keyed on modification time. Templates here are static: rendering
//! binds no variables and returns the file bytes verbatim.

mod engine;

pub use engine::TemplateEngine;

use thiserror::Error;

/// Errors surfaced by template rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The named template does not exist in the template directory
    #[error("template '{0}' not found")]
    NotFound(String),
    /// The template exists but could not be read
    #[error("failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
