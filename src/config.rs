//! Site configuration management for `kiln.toml`.
//!
//! # Sections
//!
//! | Section         | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | `[site]`        | Site metadata (title, author, base_url)        |
//! | `[build]`       | Paths, passthrough patterns, default template  |
//! | `[collections]` | Named collection predicates and sort keys      |
//! | `[feed]`        | Syndication feed plugin                        |
//! | `[images]`      | Image transform plugin                         |
//! | `[nav]`         | Navigation index plugin                        |
//! | `[watch]`       | Extra watch target globs, debounce             |
//! | `[extra]`       | User-defined custom fields                     |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "My Blog"
//! base_url = "https://example.com"
//!
//! [build]
//! content = "content"
//! passthrough = ["css/**/*.css", "static/**/*"]
//!
//! [collections.posts]
//! tag = "post"
//! sort_by = "date"
//! reverse = true
//!
//! [feed]
//! enable = true
//! collection = "posts"
//!
//! [watch]
//! targets = ["css/**/*.css"]
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Defaults
// ============================================================================

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}

fn default_output() -> PathBuf {
    PathBuf::from("public")
}

fn default_template_id() -> String {
    "page.html".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_feed_path() -> PathBuf {
    PathBuf::from("feed.xml")
}

fn default_feed_collection() -> String {
    "posts".to_string()
}

fn default_image_output() -> PathBuf {
    PathBuf::from("img")
}

fn default_debounce_ms() -> u64 {
    300
}

// ============================================================================
// Sections
// ============================================================================

/// Basic site information exposed to templates under the `site` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteMeta {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Canonical base URL, e.g. `https://example.com`. Required when the
    /// feed plugin is enabled.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub email: String,

    #[serde(default = "default_language")]
    pub language: String,
}

/// Build paths and pipeline switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Content directory, relative to root.
    #[serde(default = "default_content")]
    pub content: PathBuf,

    /// Template directory, relative to root.
    #[serde(default = "default_templates")]
    pub templates: PathBuf,

    /// Output directory, relative to root.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Template used when front matter does not name one.
    #[serde(default = "default_template_id")]
    pub default_template: String,

    /// Glob patterns (relative to root) copied verbatim into the output.
    #[serde(default)]
    pub passthrough: Vec<String>,

    /// Include `draft = true` content.
    #[serde(default)]
    pub drafts: bool,

    /// Wipe the output directory before building.
    #[serde(default)]
    pub clean: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            templates: default_templates(),
            output: default_output(),
            default_template: default_template_id(),
            passthrough: Vec::new(),
            drafts: false,
            clean: false,
        }
    }
}

/// Membership predicate and ordering for one named collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSpec {
    /// Items carrying this tag belong to the collection.
    pub tag: String,

    /// Front matter key to sort by. Discovery order when absent.
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Reverse the sort (e.g. newest first for dates).
    #[serde(default)]
    pub reverse: bool,
}

/// Feed plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    #[serde(default)]
    pub enable: bool,

    /// Output path of the feed document, relative to the output root.
    #[serde(default = "default_feed_path")]
    pub path: PathBuf,

    /// Collection whose items become feed entries, in collection order.
    #[serde(default = "default_feed_collection")]
    pub collection: String,

    /// Maximum number of entries. `0` means unlimited.
    #[serde(default)]
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: false,
            path: default_feed_path(),
            collection: default_feed_collection(),
            limit: 0,
        }
    }
}

/// Image transform plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default)]
    pub enable: bool,

    /// Directory for derived images, relative to the output root.
    #[serde(default = "default_image_output")]
    pub output: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enable: false,
            output: default_image_output(),
        }
    }
}

/// Navigation index plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavConfig {
    #[serde(default)]
    pub enable: bool,
}

/// Watch mode configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Extra glob patterns (relative to root) that trigger rebuilds, on
    /// top of the content/template/config paths watched by default.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Quiet period after the last change event before rebuilding.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root (set after loading, not part of the file)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub site: SiteMeta,

    #[serde(default)]
    pub build: BuildConfig,

    /// Named collections keyed by name. BTreeMap keeps iteration order
    /// deterministic across runs.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSpec>,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub nav: NavConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    /// User-defined extra fields, exposed to templates under `site.extra`.
    #[serde(default)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Apply CLI overrides on top of the loaded file.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            self.root = root.clone();
        }
        let args = cli.build_args();
        if args.clean {
            self.build.clean = true;
        }
        if args.drafts {
            self.build.drafts = true;
        }
        if let Some(url) = &args.base_url {
            self.site.base_url = Some(url.clone());
        }
    }

    /// Content directory resolved against the project root.
    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.build.content)
    }

    /// Template directory resolved against the project root.
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.build.templates)
    }

    /// Output directory resolved against the project root.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.site
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or_default()
    }

    /// Validate cross-field constraints. Fatal before the first pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.content_dir().is_dir() {
            return Err(ConfigError::Validation(format!(
                "content directory not found: {}",
                self.content_dir().display()
            )));
        }

        if self.feed.enable {
            if self.site.base_url.is_none() {
                return Err(ConfigError::Validation(
                    "feed requires site.base_url".to_string(),
                ));
            }
            if !self.collections.contains_key(&self.feed.collection) {
                return Err(ConfigError::Validation(format!(
                    "feed.collection `{}` is not a configured collection",
                    self.feed.collection
                )));
            }
        }

        for (name, spec) in &self.collections {
            if spec.tag.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collection `{name}` has an empty tag predicate"
                )));
            }
        }

        Ok(())
    }
}
