//! Content discovery and the `ContentItem` model.
//!
//! A ContentItem is one discovered source file plus its parsed front
//! matter, raw body, and resolved output location. Items are immutable
//! once built within a pass and recreated wholesale on rebuild.
//!
//! Front matter is TOML between `+++` fences:
//!
//! ```text
//! +++
//! title = "Hello"
//! date = "2024-01-01"
//! tags = ["post"]
//! +++
//! body...
//! ```

use crate::config::SiteConfig;
use crate::utils::slug::slugify_path;
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pulldown_cmark::{Options, Parser, html};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Extensions treated as renderable content. Everything else under the
/// content directory is copied through as-is.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "html"];

const FRONT_MATTER_FENCE: &str = "+++";

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

// ============================================================================
// ContentItem
// ============================================================================

/// One discovered content source. Read-only during rendering.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Absolute source path.
    pub source: PathBuf,

    /// Path relative to the content dir, without extension.
    /// Example: `content/posts/hello.md` → `posts/hello`
    pub relative: String,

    /// Site-absolute URL path with trailing slash: `/posts/hello/`
    pub url_path: String,

    /// Output path relative to the output root: `posts/hello/index.html`
    pub output: PathBuf,

    /// Resolved template identifier.
    pub template: String,

    /// Parsed front matter.
    pub meta: toml::Table,

    /// Raw body below the front matter.
    pub body: String,
}

impl ContentItem {
    /// Build an item from a source file.
    pub fn from_source(source: PathBuf, config: &SiteConfig) -> Result<Self> {
        let raw = fs::read_to_string(&source)
            .map_err(|e| anyhow!("unreadable content file {}: {e}", source.display()))?;
        let (meta, body) = parse_front_matter(&raw)?;

        let relative = source
            .strip_prefix(config.content_dir())?
            .with_extension("")
            .to_str()
            .ok_or_else(|| anyhow!("non-utf8 path: {}", source.display()))?
            .replace('\\', "/");

        // Root index.md lands at index.html, everything else gets a
        // directory with index.html for clean URLs.
        let slugged = slugify_path(Path::new(&relative));
        let (output, url_path) = if relative == "index" {
            (PathBuf::from("index.html"), "/".to_string())
        } else {
            let url = format!("/{}/", slugged.display());
            (slugged.join("index.html"), url)
        };

        let template = meta
            .get("template")
            .and_then(toml::Value::as_str)
            .unwrap_or(&config.build.default_template)
            .to_string();

        Ok(Self {
            source,
            relative,
            url_path,
            output,
            template,
            meta,
            body: body.to_string(),
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.get("title").and_then(toml::Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.meta.get("summary").and_then(toml::Value::as_str)
    }

    pub fn draft(&self) -> bool {
        self.meta
            .get("draft")
            .and_then(toml::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.meta
            .get("tags")
            .and_then(toml::Value::as_array)
            .map(|tags| tags.iter().filter_map(toml::Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(&tag)
    }

    /// Publish date from front matter, if present and parseable.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self.meta.get("date")? {
            toml::Value::String(s) => parse_date(s),
            toml::Value::Datetime(dt) => parse_date(&dt.to_string()),
            _ => None,
        }
    }

    /// Body rendered to HTML. Markdown sources go through pulldown-cmark,
    /// everything else passes through untouched.
    pub fn body_html(&self) -> String {
        if self.source.extension().is_some_and(|e| e == "md") {
            let mut out = String::with_capacity(self.body.len() * 2);
            let parser = Parser::new_ext(&self.body, Options::ENABLE_TABLES);
            html::push_html(&mut out, parser);
            out
        } else {
            self.body.clone()
        }
    }
}

// ============================================================================
// Front matter
// ============================================================================

/// Split `+++`-fenced TOML front matter from the body.
///
/// A file without a fence is all body with empty metadata.
pub fn parse_front_matter(raw: &str) -> Result<(toml::Table, &str)> {
    let Some(rest) = raw.strip_prefix(FRONT_MATTER_FENCE) else {
        return Ok((toml::Table::new(), raw));
    };

    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let end = rest
        .find(&format!("\n{FRONT_MATTER_FENCE}"))
        .ok_or_else(|| anyhow!("unterminated front matter fence"))?;

    let meta: toml::Table =
        toml::from_str(&rest[..end]).map_err(|e| anyhow!("front matter: {e}"))?;
    let body = rest[end + 1 + FRONT_MATTER_FENCE.len()..]
        .strip_prefix('\n')
        .unwrap_or(&rest[end + 1 + FRONT_MATTER_FENCE.len()..]);

    Ok((meta, body))
}

/// Parse `YYYY-MM-DD` or RFC 3339 into a UTC timestamp.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

// ============================================================================
// Discovery
// ============================================================================

/// A per-file discovery failure. The item is skipped; the pass continues.
#[derive(Debug)]
pub struct DiscoveryIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Walk the content directory and build items for renderable sources.
///
/// Traversal is sorted by file name so discovery order is stable across
/// runs. Unreadable or malformed files become [`DiscoveryIssue`]s instead
/// of aborting the pass. Drafts are skipped unless enabled in config.
pub fn discover(config: &SiteConfig) -> (Vec<ContentItem>, Vec<DiscoveryIssue>) {
    let mut items = Vec::new();
    let mut issues = Vec::new();

    let walker = WalkDir::new(config.content_dir())
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        });

    for entry in walker {
        let path = entry.into_path();
        let is_content = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext));
        if !is_content {
            continue;
        }

        match ContentItem::from_source(path.clone(), config) {
            Ok(item) if item.draft() && !config.build.drafts => {}
            Ok(item) => items.push(item),
            Err(e) => issues.push(DiscoveryIssue {
                path,
                message: format!("{e:#}"),
            }),
        }
    }

    (items, issues)
}

/// Non-content files under the content dir, copied through verbatim.
pub fn content_assets(config: &SiteConfig) -> Vec<PathBuf> {
    WalkDir::new(config.content_dir())
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            !p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext))
        })
        .collect()
}
