//! Named value-transform filters invocable from templates.
//!
//! Filters are pure functions of their explicit inputs: no shared mutable
//! state, no knowledge of previously-seen values. Registration rejects
//! duplicate names outright; last-registration-wins would hide overrides.

use crate::error::{ConfigError, FilterError};
use crate::minify::CssMinifier;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A registered filter: `(value, args) -> transformed value`.
pub type FilterFn = Box<dyn Fn(&str, &[String]) -> Result<String, FilterError> + Send + Sync>;

/// Registry of named filters, populated once at configuration time.
#[derive(Default)]
pub struct FilterRegistry {
    filters: FxHashMap<String, FilterFn>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter. Fails with [`ConfigError::DuplicateFilter`] if
    /// the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: FilterFn,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return Err(ConfigError::DuplicateFilter(name));
        }
        self.filters.insert(name, filter);
        Ok(())
    }

    /// Invoke a filter by name. Fails with [`FilterError::Unknown`] if
    /// absent.
    pub fn invoke(&self, name: &str, value: &str, args: &[String]) -> Result<String, FilterError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| FilterError::Unknown(name.to_string()))?;
        filter(value, args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

/// Register the built-in filters.
///
/// - `cssmin`: minify a style block via the CSS capability
/// - `upper` / `lower`: ASCII case transforms
/// - `date`: reformat an RFC 3339 / `YYYY-MM-DD` date (`%`-style format
///   string as the first arg, default `%Y-%m-%d`)
pub fn register_builtins(
    registry: &mut FilterRegistry,
    minifier: Arc<dyn CssMinifier>,
) -> Result<(), ConfigError> {
    registry.register("cssmin", Box::new(move |value, _| Ok(minifier.minify(value))))?;

    registry.register("upper", Box::new(|value, _| Ok(value.to_uppercase())))?;
    registry.register("lower", Box::new(|value, _| Ok(value.to_lowercase())))?;

    registry.register(
        "date",
        Box::new(|value, args| {
            let format = args.first().map(String::as_str).unwrap_or("%Y-%m-%d");
            let parsed = crate::content::parse_date(value).ok_or_else(|| FilterError::Failed {
                name: "date".to_string(),
                message: format!("unparseable date `{value}`"),
            })?;
            Ok(parsed.format(format).to_string())
        }),
    )?;

    Ok(())
}
