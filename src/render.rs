//! The render pipeline: items to output artifacts.
//!
//! Each item render is independent and runs on a rayon worker: items are
//! read-only during render and artifacts land on disjoint paths (enforced
//! later by the sink). A failed item becomes a [`RenderError`] and the
//! pass continues; errors are surfaced together at the end of the pass.

use crate::content::ContentItem;
use crate::error::RenderError;
use crate::template::{Context, TemplateEngine};
use crate::{artifact::OutputArtifact, filters::FilterRegistry};
use rayon::prelude::*;
use serde_json::Value;

/// Render every item, collecting artifacts and per-item failures.
pub fn render_items(
    items: &[ContentItem],
    engine: &dyn TemplateEngine,
    filters: &FilterRegistry,
    globals: &serde_json::Map<String, Value>,
) -> (Vec<OutputArtifact>, Vec<RenderError>) {
    let results: Vec<_> = items
        .par_iter()
        .map(|item| render_item(item, engine, filters, globals))
        .collect();

    let mut artifacts = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(mut out) => artifacts.append(&mut out),
            Err(e) => errors.push(e),
        }
    }

    (artifacts, errors)
}

/// Render one item to its artifacts.
///
/// Returns a vector so an item can legitimately yield zero or several
/// artifacts (pagination); the plain case is exactly one.
pub fn render_item(
    item: &ContentItem,
    engine: &dyn TemplateEngine,
    filters: &FilterRegistry,
    globals: &serde_json::Map<String, Value>,
) -> Result<Vec<OutputArtifact>, RenderError> {
    let ctx = Context::new(item_context(item, globals), filters);

    let bytes = engine
        .render(&item.template, &ctx)
        .map_err(|e| RenderError::new(&item.source, e))?;

    Ok(vec![OutputArtifact::new(item.output.clone(), bytes)])
}

/// Assemble the data a template sees for one item: global keys, a `page`
/// object with the item's front matter and paths, the rendered body under
/// `content`, and `title` as a top-level convenience.
fn item_context(
    item: &ContentItem,
    globals: &serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    let mut values = globals.clone();

    let mut page = serde_json::Map::new();
    for (key, value) in &item.meta {
        page.insert(key.clone(), toml_to_json(value));
    }
    page.insert("url".to_string(), Value::String(item.url_path.clone()));
    page.insert(
        "source".to_string(),
        Value::String(item.source.display().to_string()),
    );

    values.insert(
        "title".to_string(),
        Value::String(item.title().unwrap_or_default().to_string()),
    );
    values.insert("page".to_string(), Value::Object(page));
    values.insert("content".to_string(), Value::String(item.body_html()));

    values
}

/// Convert front matter values for template consumption.
pub fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use crate::filters::{FilterRegistry, register_builtins};
    use crate::minify::BasicCssMinifier;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct StaticEngine;

    impl TemplateEngine for StaticEngine {
        fn render(&self, template: &str, ctx: &Context) -> Result<Vec<u8>, TemplateError> {
            match template {
                "page.html" => {
                    let title = ctx.values["title"].as_str().unwrap_or_default();
                    Ok(format!("<h1>{title}</h1>").into_bytes())
                }
                other => Err(TemplateError::NotFound(other.to_string())),
            }
        }
    }

    fn filters() -> FilterRegistry {
        let mut registry = FilterRegistry::new();
        register_builtins(&mut registry, Arc::new(BasicCssMinifier)).unwrap();
        registry
    }

    fn item(relative: &str, template: &str, meta: &str) -> ContentItem {
        ContentItem {
            source: PathBuf::from(format!("content/{relative}.md")),
            relative: relative.to_string(),
            url_path: format!("/{relative}/"),
            output: PathBuf::from(format!("{relative}/index.html")),
            template: template.to_string(),
            meta: toml::from_str(meta).unwrap(),
            body: String::new(),
        }
    }

    fn globals() -> serde_json::Map<String, Value> {
        let Value::Object(map) = json!({"site": {"title": "Example"}}) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_render_all_ok() {
        let items = vec![
            item("a", "page.html", "title = \"A\""),
            item("b", "page.html", "title = \"B\""),
        ];
        let f = filters();
        let (artifacts, errors) = render_items(&items, &StaticEngine, &f, &globals());
        assert!(errors.is_empty());
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].path, PathBuf::from("a/index.html"));
        assert_eq!(artifacts[0].content, b"<h1>A</h1>");
    }

    #[test]
    fn test_partial_failure_continues() {
        let items = vec![
            item("a", "page.html", "title = \"A\""),
            item("broken", "missing.html", "title = \"X\""),
            item("b", "page.html", "title = \"B\""),
        ];
        let f = filters();
        let (artifacts, errors) = render_items(&items, &StaticEngine, &f, &globals());

        // The broken item reports, the other two still render
        assert_eq!(artifacts.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].path.ends_with("broken.md"));
        assert!(errors[0].message.contains("missing.html"));
    }

    #[test]
    fn test_context_exposes_page_and_globals() {
        let one = item("a", "page.html", "title = \"A\"\ntags = [\"post\"]");
        let ctx = item_context(&one, &globals());
        assert_eq!(ctx["site"]["title"], "Example");
        assert_eq!(ctx["page"]["url"], "/a/");
        assert_eq!(ctx["page"]["tags"][0], "post");
        assert_eq!(ctx["title"], "A");
    }

    #[test]
    fn test_toml_to_json_nested() {
        let table: toml::Table =
            toml::from_str("x = 1\nflag = true\n[inner]\nname = \"n\"").unwrap();
        let json = toml_to_json(&toml::Value::Table(table));
        assert_eq!(json["x"], 1);
        assert_eq!(json["flag"], true);
        assert_eq!(json["inner"]["name"], "n");
    }
}
