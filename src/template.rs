//! Template capability and the built-in substitution engine.
//!
//! The pipeline renders through the [`TemplateEngine`] trait; any real
//! template language can sit behind it. The built-in [`FileTemplates`]
//! engine resolves identifiers to files and supports `{{ key }}`
//! substitution with dotted lookups and filter pipes:
//!
//! ```text
//! {{ title | upper }}
//! {{ page.date | date %d %b %Y }}
//! {{ content }}
//! ```

use crate::error::TemplateError;
use crate::filters::FilterRegistry;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::{fs, path::PathBuf};

/// Data visible to a template during one item's render.
pub struct Context<'a> {
    /// Item metadata, globals, and the rendered body under `content`.
    pub values: serde_json::Map<String, Value>,
    /// Filter registry access for `| filter` pipes.
    pub filters: &'a FilterRegistry,
}

impl<'a> Context<'a> {
    pub fn new(values: serde_json::Map<String, Value>, filters: &'a FilterRegistry) -> Self {
        Self { values, filters }
    }

    /// Dotted-path lookup: `site.title` walks nested objects.
    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// External template capability: identifier + context to rendered bytes.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, ctx: &Context) -> Result<Vec<u8>, TemplateError>;
}

// ============================================================================
// FileTemplates
// ============================================================================

/// File-backed engine: template id `page.html` resolves to
/// `<templates>/page.html`. Sources are cached per engine instance; watch
/// mode constructs a fresh engine per pass so edits are picked up.
pub struct FileTemplates {
    dir: PathBuf,
    cache: RwLock<FxHashMap<String, String>>,
}

impl FileTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    fn load(&self, template: &str) -> Result<String, TemplateError> {
        if let Some(source) = self.cache.read().get(template) {
            return Ok(source.clone());
        }
        let source = fs::read_to_string(self.dir.join(template))
            .map_err(|_| TemplateError::NotFound(template.to_string()))?;
        self.cache
            .write()
            .insert(template.to_string(), source.clone());
        Ok(source)
    }
}

impl TemplateEngine for FileTemplates {
    fn render(&self, template: &str, ctx: &Context) -> Result<Vec<u8>, TemplateError> {
        let source = self.load(template)?;
        substitute(template, &source, ctx).map(String::into_bytes)
    }
}

// ============================================================================
// Substitution
// ============================================================================

/// Expand every `{{ ... }}` placeholder in `source`.
fn substitute(template: &str, source: &str, ctx: &Context) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| TemplateError::Render {
            template: template.to_string(),
            message: "unclosed `{{`".to_string(),
        })?;

        out.push_str(&expand(template, after[..end].trim(), ctx)?);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Expand one placeholder: dotted key, then filter pipes left to right.
fn expand(template: &str, expr: &str, ctx: &Context) -> Result<String, TemplateError> {
    let mut stages = expr.split('|').map(str::trim);
    let key = stages.next().unwrap_or_default();

    let value = ctx.lookup(key).ok_or_else(|| TemplateError::Render {
        template: template.to_string(),
        message: format!("unknown key `{key}`"),
    })?;
    let mut text = value_to_string(value);

    for stage in stages {
        let mut parts = stage.split_whitespace();
        let name = parts.next().ok_or_else(|| TemplateError::Render {
            template: template.to_string(),
            message: format!("empty filter in `{expr}`"),
        })?;
        let args: Vec<String> = parts.map(String::from).collect();
        text = ctx.filters.invoke(name, &text, &args)?;
    }

    Ok(text)
}

/// Render a JSON value for text output.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
