//! Error types for template resolution and rendering

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, compiling, or rendering templates
#[derive(Debug, Error)]
pub enum RenderError {
    /// No source could be resolved for the requested template namespace
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// A render collection was asked for a key it does not hold
    #[error("key not found in render collection: {key}")]
    KeyNotFound { key: String },

    /// A sub-collection was found where a leaf renderer was expected
    #[error("key does not hold a renderer: {key}")]
    NotARenderer { key: String },

    /// A leaf renderer was found where a sub-collection was expected
    #[error("key does not hold a sub-collection: {key}")]
    NotACollection { key: String },

    /// The engine was constructed or used with an invalid setup
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Error reading a template source file
    #[error("error reading template file {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    /// Error parsing a template source file
    #[error("error parsing template file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
