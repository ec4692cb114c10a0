//! Navigation index plugin.
//!
//! Exposes an ordered page index under the `nav` global data key so
//! templates can build menus without walking the content tree themselves.
//! Entries are items in discovery order, each carrying title and URL;
//! items without a title stay out of the index.

use crate::plugins::{Phase, Plugin, PluginContext};
use anyhow::Result;
use serde_json::{Value, json};

pub struct NavPlugin;

impl Plugin for NavPlugin {
    fn name(&self) -> &str {
        "nav"
    }

    fn phases(&self) -> &[Phase] {
        &[Phase::PostCollection]
    }

    fn writes(&self) -> &[&str] {
        &["nav"]
    }

    fn run(&self, _phase: Phase, ctx: &mut PluginContext) -> Result<()> {
        if !ctx.config.nav.enable {
            return Ok(());
        }

        let entries: Vec<Value> = ctx
            .items
            .iter()
            .filter_map(|item| {
                item.title().map(|title| {
                    json!({
                        "title": title,
                        "url": item.url_path,
                        "section": section_of(&item.relative),
                    })
                })
            })
            .collect();

        ctx.globals.insert("nav".to_string(), Value::Array(entries));
        Ok(())
    }
}

/// Top-level directory of a relative content path, empty for root pages.
/// `posts/hello` → `posts`.
fn section_of(relative: &str) -> &str {
    match relative.rfind('/') {
        Some(_) => relative.split('/').next().unwrap_or_default(),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::config::SiteConfig;
    use crate::content::ContentItem;
    use rustc_hash::FxHashMap;
    use std::path::PathBuf;

    fn item(relative: &str, meta: &str) -> ContentItem {
        ContentItem {
            source: PathBuf::from(format!("content/{relative}.md")),
            relative: relative.to_string(),
            url_path: format!("/{relative}/"),
            output: PathBuf::from(format!("{relative}/index.html")),
            template: "page.html".to_string(),
            meta: toml::from_str(meta).unwrap(),
            body: String::new(),
        }
    }

    fn run(items: &[ContentItem], enable: bool) -> serde_json::Map<String, Value> {
        let mut config = SiteConfig::default();
        config.nav.enable = enable;
        let collections: FxHashMap<String, Collection> = FxHashMap::default();
        let mut globals = serde_json::Map::new();
        let mut artifacts = Vec::new();
        let mut errors = Vec::new();
        let mut ctx = PluginContext {
            config: &config,
            items,
            collections: &collections,
            globals: &mut globals,
            artifacts: &mut artifacts,
            errors: &mut errors,
        };
        NavPlugin.run(Phase::PostCollection, &mut ctx).unwrap();
        globals
    }

    #[test]
    fn test_index_in_discovery_order() {
        let items = vec![
            item("about", "title = \"About\""),
            item("posts/a", "title = \"A\""),
        ];
        let globals = run(&items, true);
        let nav = globals["nav"].as_array().unwrap();
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[0]["title"], "About");
        assert_eq!(nav[0]["section"], "");
        assert_eq!(nav[1]["url"], "/posts/a/");
        assert_eq!(nav[1]["section"], "posts");
    }

    #[test]
    fn test_untitled_items_excluded() {
        let items = vec![item("x", ""), item("about", "title = \"About\"")];
        let globals = run(&items, true);
        assert_eq!(globals["nav"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let globals = run(&[], false);
        assert!(!globals.contains_key("nav"));
    }
}
