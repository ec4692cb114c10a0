//! Passthrough asset copying.
//!
//! Files matched by the configured glob patterns are copied unchanged to
//! the output root, preserving their relative directory structure. A
//! pattern with zero matches is a warning, never fatal. Re-copying on
//! every pass is idempotent: same bytes, same destination.

use crate::artifact::ArtifactSink;
use crate::config::SiteConfig;
use crate::content;
use crate::log;
use crate::utils::glob::GlobPattern;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copy all passthrough patterns plus non-content files from the content
/// directory. Returns the number of files copied.
pub fn copy_passthrough(config: &SiteConfig, sink: &ArtifactSink) -> Result<usize> {
    let mut copied = 0;

    for pattern in &config.build.passthrough {
        let glob = GlobPattern::new(pattern)
            .with_context(|| format!("invalid passthrough pattern `{pattern}`"))?;
        let matched = copy_pattern(config, &glob, sink)?;
        if matched == 0 {
            log!("warn"; "passthrough pattern `{pattern}` matched nothing");
        }
        copied += matched;
    }

    copied += copy_content_assets(config, sink)?;
    Ok(copied)
}

/// Copy every file under the project root matching one pattern.
fn copy_pattern(config: &SiteConfig, glob: &GlobPattern, sink: &ArtifactSink) -> Result<usize> {
    let root = &config.root;
    let walk_root = root.join(glob.literal_prefix());
    if !walk_root.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(&walk_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Some(rel) = relative_str(path, root) else {
            continue;
        };
        if glob.matches(&rel) {
            sink.copy(path, Path::new(&rel))
                .with_context(|| format!("passthrough copy failed for `{rel}`"))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copy non-content files that live inside the content directory, keeping
/// their position relative to it.
fn copy_content_assets(config: &SiteConfig, sink: &ArtifactSink) -> Result<usize> {
    let content_dir = config.content_dir();
    let mut copied = 0;

    for path in content::content_assets(config) {
        let Some(rel) = relative_str(&path, &content_dir) else {
            continue;
        };
        sink.copy(&path, &PathBuf::from(&rel))
            .with_context(|| format!("content asset copy failed for `{rel}`"))?;
        copied += 1;
    }

    Ok(copied)
}

/// `/`-separated path relative to `base`, if `path` is under it.
fn relative_str(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    Some(rel.to_str()?.replace('\\', "/"))
}
