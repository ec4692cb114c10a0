//! Kiln - a content build pipeline for static sites.
//!
//! Turns a content directory plus a `kiln.toml` configuration into
//! rendered pages, passthrough asset copies, and plugin-derived artifacts
//! (syndication feed, resized images, navigation data), with a
//! coalescing watch mode for rebuild-on-change.

pub mod artifact;
pub mod assets;
pub mod build;
pub mod cli;
pub mod collection;
pub mod config;
pub mod content;
pub mod error;
pub mod filters;
pub mod logger;
pub mod minify;
pub mod plugins;
pub mod render;
pub mod template;
pub mod utils;
pub mod watch;
