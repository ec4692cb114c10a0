//! Plugin registry and the pipeline's extension phases.
//!
//! Plugins form an explicit ordered list handed to the pipeline, not a
//! global registry. Each plugin declares the phases it participates in
//! and the global data keys it reads and writes; reads are checked at
//! registration time against what earlier plugins (or the pipeline
//! itself) provide, so ordering mistakes fail at startup instead of
//! producing silently wrong output.

pub mod feed;
pub mod image;
pub mod nav;

use crate::artifact::OutputArtifact;
use crate::collection::Collection;
use crate::config::SiteConfig;
use crate::content::ContentItem;
use crate::error::{ConfigError, RenderError};
use anyhow::Result;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde_json::Value;

/// Data keys the pipeline itself writes before any plugin runs.
const BUILTIN_DATA_KEYS: &[&str] = &["site"];

/// Pipeline phases a plugin can hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before content discovery; items and collections are empty.
    PreDiscovery,
    /// After collections are built, before rendering.
    PostCollection,
    /// After rendering; artifacts exist and may be extended or rewritten.
    PostRender,
}

/// Everything a plugin can see and touch during one phase.
pub struct PluginContext<'a> {
    pub config: &'a SiteConfig,
    pub items: &'a [ContentItem],
    pub collections: &'a FxHashMap<String, Collection>,

    /// Template-available global data. Writes must be declared.
    pub globals: &'a mut serde_json::Map<String, Value>,

    /// Artifacts produced so far this pass. Post-render plugins may push
    /// new ones or rewrite existing content in place.
    pub artifacts: &'a mut Vec<OutputArtifact>,

    /// Per-reference failures that should not abort the pass.
    pub errors: &'a mut Vec<RenderError>,
}

/// An optional capability module contributing data or artifacts.
///
/// Plugins run in registration order within each phase. A plugin must not
/// touch data keys it has not declared; the declarations are what the
/// registry validates.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn phases(&self) -> &[Phase];

    /// Global data keys this plugin reads.
    fn reads(&self) -> &[&str] {
        &[]
    }

    /// Global data keys this plugin writes.
    fn writes(&self) -> &[&str] {
        &[]
    }

    fn run(&self, phase: Phase, ctx: &mut PluginContext) -> Result<()>;
}

/// Ordered plugin list with registration-time dependency checking.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin. Rejects duplicate names and reads of data keys
    /// that neither the pipeline nor an earlier plugin writes.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), ConfigError> {
        if self.plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(ConfigError::DuplicatePlugin(plugin.name().to_string()));
        }

        let mut available: FxHashSet<&str> = BUILTIN_DATA_KEYS.iter().copied().collect();
        for earlier in &self.plugins {
            available.extend(earlier.writes().iter().copied());
        }
        for key in plugin.reads() {
            if !available.contains(key) {
                return Err(ConfigError::UndeclaredRead {
                    plugin: plugin.name().to_string(),
                    key: (*key).to_string(),
                });
            }
        }

        self.plugins.push(plugin);
        Ok(())
    }

    /// Run every plugin registered for `phase`, in registration order.
    pub fn run_phase(&self, phase: Phase, ctx: &mut PluginContext) -> Result<()> {
        for plugin in &self.plugins {
            if plugin.phases().contains(&phase) {
                plugin.run(phase, ctx)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}
