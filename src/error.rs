//! Error types for the build pipeline.
//!
//! Configuration problems abort before any pass runs. Render failures are
//! collected per item so one broken page cannot take down the whole pass.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("filter `{0}` is already registered")]
    DuplicateFilter(String),

    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(String),

    #[error("plugin `{plugin}` reads data key `{key}` which no earlier plugin writes")]
    UndeclaredRead { plugin: String, key: String },

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Filter invocation errors surfaced during template rendering.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown filter `{0}`")]
    Unknown(String),

    #[error("filter `{name}` failed: {message}")]
    Failed { name: String, message: String },
}

/// Template resolution and rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("template `{template}`: {message}")]
    Render { template: String, message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Image derivation errors from the transform capability.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image format `{0}`")]
    UnsupportedFormat(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image source `{0}` not found")]
    MissingSource(PathBuf),
}

/// A per-item failure during a build pass.
///
/// Carries the source path so errors remain attributable after the pass
/// finishes. The pass itself continues past these.
#[derive(Debug, Error)]
#[error("{}: {}", .path.display(), .message)]
pub struct RenderError {
    pub path: PathBuf,
    pub message: String,
}

impl RenderError {
    pub fn new(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Two artifacts resolved to the same output path within one pass.
///
/// Fatal for the pass: a silent overwrite would corrupt output.
#[derive(Debug, Error)]
#[error("duplicate output path `{}`", .0.display())]
pub struct ArtifactCollision(pub PathBuf);
