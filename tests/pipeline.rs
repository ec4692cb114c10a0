//! End-to-end pipeline scenarios against a real project tree on disk.

use kiln::build::build_site;
use kiln::config::SiteConfig;
use kiln::filters::{FilterRegistry, register_builtins};
use kiln::minify::BasicCssMinifier;
use kiln::plugins::{PluginRegistry, feed::FeedPlugin, nav::NavPlugin};
use kiln::template::FileTemplates;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two posts tagged `post`: "A" published 2024-01-01, "B" 2024-02-01.
fn project(collections: &str) -> (tempfile::TempDir, SiteConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("templates/page.html"),
        "<title>{{ title }}</title><style>{{ site.extra.styles | cssmin }}</style>{{ content }}",
    );
    write(
        &root.join("content/posts/a.md"),
        "+++\ntitle = \"A\"\ntags = [\"post\"]\ndate = \"2024-01-01\"\nsummary = \"first\"\n+++\nalpha body\n",
    );
    write(
        &root.join("content/posts/b.md"),
        "+++\ntitle = \"B\"\ntags = [\"post\"]\ndate = \"2024-02-01\"\nsummary = \"second\"\n+++\nbeta body\n",
    );
    write(&root.join("css/site.css"), "a {  color: red; }\n");

    let mut config = SiteConfig::from_str(&format!(
        r#"
        [site]
        title = "Example"
        description = "Example site"
        base_url = "https://example.com"

        [build]
        passthrough = ["css/**/*.css"]

        [extra]
        styles = "body {{  margin: 0; }}"

        {collections}
        "#
    ))
    .unwrap();
    config.root = root.to_path_buf();
    config.nav.enable = true;
    (dir, config)
}

fn run(config: &SiteConfig, feed_limit: Option<usize>) -> kiln::build::BuildSummary {
    let mut config = config.clone();
    if let Some(limit) = feed_limit {
        config.feed.enable = true;
        config.feed.collection = "posts".to_string();
        config.feed.limit = limit;
    }

    let engine = FileTemplates::new(config.templates_dir());
    let mut filters = FilterRegistry::new();
    register_builtins(&mut filters, Arc::new(BasicCssMinifier)).unwrap();

    let mut plugins = PluginRegistry::new();
    plugins.register(Box::new(NavPlugin)).unwrap();
    plugins.register(Box::new(FeedPlugin)).unwrap();

    build_site(&config, &engine, &filters, &plugins).unwrap()
}

#[test]
fn discovery_order_collection() {
    let (dir, config) = project("[collections.posts]\ntag = \"post\"\n");
    let summary = run(&config, None);
    assert!(summary.ok());
    assert_eq!(summary.pages, 2);

    // Both pages rendered through the template with the cssmin filter
    let a = fs::read_to_string(dir.path().join("public/posts/a/index.html")).unwrap();
    assert!(a.contains("<title>A</title>"));
    assert!(a.contains("body{margin:0;}"));
    assert!(a.contains("alpha body"));
}

#[test]
fn date_descending_collection_feeds_newest_first() {
    let (dir, config) = project(
        "[collections.posts]\ntag = \"post\"\nsort_by = \"date\"\nreverse = true\n",
    );
    run(&config, Some(0));

    let feed = fs::read_to_string(dir.path().join("public/feed.xml")).unwrap();
    let b_pos = feed.find("<title>B</title>").unwrap();
    let a_pos = feed.find("<title>A</title>").unwrap();
    assert!(b_pos < a_pos, "newest entry first in collection order");
}

#[test]
fn feed_limit_zero_emits_all_entries() {
    let (dir, config) = project(
        "[collections.posts]\ntag = \"post\"\nsort_by = \"date\"\nreverse = true\n",
    );
    run(&config, Some(0));

    let feed = fs::read_to_string(dir.path().join("public/feed.xml")).unwrap();
    assert!(feed.contains("<title>A</title>"));
    assert!(feed.contains("<title>B</title>"));
    assert!(feed.contains("https://example.com/posts/a/"));
}

#[test]
fn feed_limit_one_emits_most_recent() {
    let (dir, config) = project(
        "[collections.posts]\ntag = \"post\"\nsort_by = \"date\"\nreverse = true\n",
    );
    run(&config, Some(1));

    let feed = fs::read_to_string(dir.path().join("public/feed.xml")).unwrap();
    assert!(feed.contains("<title>B</title>"));
    assert!(!feed.contains("<title>A</title>"));
}

#[test]
fn passthrough_copied_and_idempotent() {
    let (dir, config) = project("[collections.posts]\ntag = \"post\"\n");
    run(&config, None);

    let css = dir.path().join("public/css/site.css");
    let first = fs::read(&css).unwrap();
    assert_eq!(first, b"a {  color: red; }\n");

    run(&config, None);
    assert_eq!(fs::read(&css).unwrap(), first);
}

#[test]
fn rebuild_reflects_new_content() {
    let (dir, config) = project("[collections.posts]\ntag = \"post\"\n");
    assert_eq!(run(&config, None).pages, 2);

    write(
        &dir.path().join("content/posts/c.md"),
        "+++\ntitle = \"C\"\ntags = [\"post\"]\ndate = \"2024-03-01\"\n+++\ngamma\n",
    );
    let summary = run(&config, None);
    assert_eq!(summary.pages, 3);
    assert!(dir.path().join("public/posts/c/index.html").exists());
}

#[test]
fn unreadable_front_matter_skips_item_only() {
    let (dir, config) = project("[collections.posts]\ntag = \"post\"\n");
    write(&dir.path().join("content/broken.md"), "+++\nnot toml ===\n+++\nx\n");

    let summary = run(&config, None);
    // Broken file is a discovery issue, not a render error or abort
    assert!(summary.ok());
    assert_eq!(summary.pages, 2);
    assert!(!dir.path().join("public/broken/index.html").exists());
}
