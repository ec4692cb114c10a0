//! Build pass orchestration.
//!
//! One pass runs the whole pipeline in order:
//!
//! ```text
//! plugin phase: pre-discovery
//!     │
//!     ├── discover()        content files → ContentItems
//!     ├── build_all()       items → named collections
//!     │
//! plugin phase: post-collection (nav, ...)
//!     │
//!     ├── render_items()    items → page artifacts (parallel, partial-failure)
//!     ├── copy_passthrough()
//!     │
//! plugin phase: post-render (feed, image, ...)
//!     │
//!     └── sink writes       collision-checked, atomic
//! ```
//!
//! Items are recreated wholesale each pass; nothing carries over except
//! plugin-internal caches.

use crate::artifact::ArtifactSink;
use crate::assets::copy_passthrough;
use crate::collection;
use crate::config::SiteConfig;
use crate::content::{self, ContentItem};
use crate::error::RenderError;
use crate::filters::FilterRegistry;
use crate::log;
use crate::plugins::{Phase, PluginContext, PluginRegistry};
use crate::render::render_items;
use crate::template::TemplateEngine;
use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::fs;

/// What one pass produced.
#[derive(Debug)]
pub struct BuildSummary {
    /// Rendered content items.
    pub pages: usize,
    /// Passthrough files copied.
    pub assets: usize,
    /// Artifacts written, including plugin-contributed ones.
    pub artifacts: usize,
    /// Per-item failures. The pass completed around them; a non-empty
    /// list should be reflected in the process exit status.
    pub errors: Vec<RenderError>,
}

impl BuildSummary {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run one full build pass.
pub fn build_site(
    config: &SiteConfig,
    engine: &dyn TemplateEngine,
    filters: &FilterRegistry,
    plugins: &PluginRegistry,
) -> Result<BuildSummary> {
    let output = config.output_dir();
    if config.build.clean && output.exists() {
        fs::remove_dir_all(&output)
            .with_context(|| format!("Failed to clear output directory: {}", output.display()))?;
    }
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let mut globals = site_globals(config);
    let mut errors: Vec<RenderError> = Vec::new();
    let mut artifacts = Vec::new();

    // Pre-discovery: no items or collections exist yet
    let empty_items: Vec<ContentItem> = Vec::new();
    let empty_collections = FxHashMap::default();
    run_phase(
        plugins,
        Phase::PreDiscovery,
        config,
        &empty_items,
        &empty_collections,
        &mut globals,
        &mut artifacts,
        &mut errors,
    )?;

    let (items, issues) = content::discover(config);
    for issue in &issues {
        log!("warn"; "skipped {}: {}", issue.path.display(), issue.message);
    }
    log!("build"; "found {} pages", items.len());

    let collections = collection::build_all(&items, &config.collections);
    for (name, c) in &collections {
        log!("build"; "collection `{name}`: {} items", c.len());
    }

    run_phase(
        plugins,
        Phase::PostCollection,
        config,
        &items,
        &collections,
        &mut globals,
        &mut artifacts,
        &mut errors,
    )?;

    let (mut rendered, mut render_errors) = render_items(&items, engine, filters, &globals);
    artifacts.append(&mut rendered);
    errors.append(&mut render_errors);

    let sink = ArtifactSink::new(&output);
    let assets = copy_passthrough(config, &sink)?;

    run_phase(
        plugins,
        Phase::PostRender,
        config,
        &items,
        &collections,
        &mut globals,
        &mut artifacts,
        &mut errors,
    )?;

    // Collisions are fatal for the pass: silent overwrite corrupts output
    artifacts
        .par_iter()
        .try_for_each(|artifact| sink.write(artifact))?;

    let summary = BuildSummary {
        pages: items.len(),
        assets,
        artifacts: artifacts.len(),
        errors,
    };

    if summary.ok() {
        log!("build"; "done ({} pages, {} assets)", summary.pages, summary.assets);
    } else {
        for err in &summary.errors {
            log!("error"; "{err}");
        }
        log!("build"; "finished with {} errors", summary.errors.len());
    }

    Ok(summary)
}

/// Global data every template and plugin can read under `site`.
fn site_globals(config: &SiteConfig) -> serde_json::Map<String, Value> {
    let extra: serde_json::Map<String, Value> = config
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), crate::render::toml_to_json(v)))
        .collect();

    let site = json!({
        "title": config.site.title,
        "description": config.site.description,
        "base_url": config.base_url(),
        "author": config.site.author,
        "language": config.site.language,
        "extra": extra,
    });

    let mut globals = serde_json::Map::new();
    globals.insert("site".to_string(), site);
    globals
}

#[allow(clippy::too_many_arguments)]
fn run_phase(
    plugins: &PluginRegistry,
    phase: Phase,
    config: &SiteConfig,
    items: &[ContentItem],
    collections: &FxHashMap<String, collection::Collection>,
    globals: &mut serde_json::Map<String, Value>,
    artifacts: &mut Vec<crate::artifact::OutputArtifact>,
    errors: &mut Vec<RenderError>,
) -> Result<()> {
    let mut ctx = PluginContext {
        config,
        items,
        collections,
        globals,
        artifacts,
        errors,
    };
    plugins.run_phase(phase, &mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::register_builtins;
    use crate::minify::BasicCssMinifier;
    use crate::template::FileTemplates;
    use std::path::Path;
    use std::sync::Arc;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> (tempfile::TempDir, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(
            &root.join("templates/page.html"),
            "<h1>{{ title }}</h1>{{ content }}",
        );
        write(
            &root.join("content/index.md"),
            "+++\ntitle = \"Home\"\n+++\nwelcome\n",
        );
        write(
            &root.join("content/posts/a.md"),
            "+++\ntitle = \"A\"\ntags = [\"post\"]\ndate = \"2024-01-01\"\n+++\nalpha\n",
        );

        let mut config = SiteConfig::from_str(
            "[collections.posts]\ntag = \"post\"\n",
        )
        .unwrap();
        config.root = root.to_path_buf();
        (dir, config)
    }

    fn run(config: &SiteConfig) -> BuildSummary {
        let engine = FileTemplates::new(config.templates_dir());
        let mut filters = FilterRegistry::new();
        register_builtins(&mut filters, Arc::new(BasicCssMinifier)).unwrap();
        let plugins = PluginRegistry::new();
        build_site(config, &engine, &filters, &plugins).unwrap()
    }

    #[test]
    fn test_full_pass_renders_pages() {
        let (dir, config) = project();
        let summary = run(&config);
        assert!(summary.ok());
        assert_eq!(summary.pages, 2);

        let home = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
        assert!(home.contains("<h1>Home</h1>"));
        let post = fs::read_to_string(dir.path().join("public/posts/a/index.html")).unwrap();
        assert!(post.contains("alpha"));
    }

    #[test]
    fn test_render_failure_does_not_abort_pass() {
        let (dir, config) = project();
        write(
            &dir.path().join("content/bad.md"),
            "+++\ntitle = \"Bad\"\ntemplate = \"missing.html\"\n+++\nx\n",
        );

        let summary = run(&config);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].message.contains("missing.html"));
        // The good pages still rendered
        assert!(dir.path().join("public/index.html").exists());
        assert!(dir.path().join("public/posts/a/index.html").exists());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (dir, config) = project();
        run(&config);
        let first = fs::read(dir.path().join("public/posts/a/index.html")).unwrap();
        run(&config);
        let second = fs::read(dir.path().join("public/posts/a/index.html")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clean_removes_stale_output() {
        let (dir, mut config) = project();
        run(&config);
        write(&dir.path().join("public/stale.txt"), "old");

        config.build.clean = true;
        run(&config);
        assert!(!dir.path().join("public/stale.txt").exists());
        assert!(dir.path().join("public/index.html").exists());
    }

    #[test]
    fn test_colliding_outputs_fail_the_pass() {
        let (dir, config) = project();
        // Same slug from two sources: "Posts A" directory page vs posts/a
        write(
            &dir.path().join("content/posts/a.html"),
            "+++\ntitle = \"Dup\"\n+++\n<p>dup</p>\n",
        );

        let engine = FileTemplates::new(config.templates_dir());
        let mut filters = FilterRegistry::new();
        register_builtins(&mut filters, Arc::new(BasicCssMinifier)).unwrap();
        let plugins = PluginRegistry::new();
        let result = build_site(&config, &engine, &filters, &plugins);
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("duplicate output path"));
    }
}
