//! Image transformation with a derived-artifact cache.
//!
//! Post-render, image references carrying a resize request are rewritten
//! to point at derived artifacts:
//!
//! ```text
//! <img src="static/photo.jpg?w=640&f=webp">
//!   → <img src="/img/photo-3f2a91bc-w640.webp">
//! ```
//!
//! Each distinct (source, format, width) key derives at most once per
//! build pass, however many pages reference it: the first requester
//! computes, concurrent requesters block on the cell and reuse. The cache
//! resets between passes so a rebuild re-emits its derived artifacts and
//! a changed source gets a fresh derivation (and a fresh hash-tagged
//! name). Failed references are reported per page and left untouched.

use crate::artifact::OutputArtifact;
use crate::error::{ImageError, RenderError};
use crate::log;
use crate::plugins::{Phase, Plugin, PluginContext};
use anyhow::Result;
use image::imageops::FilterType;
use parking_lot::Mutex;
use rayon::prelude::*;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::{
    fs, io::Cursor,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, OnceLock},
};

/// `src="path.ext?w=640"` or `src="path.ext?w=640&f=webp"`
static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="([^"?]+)\?w=([0-9]+)(?:&f=([A-Za-z0-9]+))?""#).expect("valid regex")
});

// ============================================================================
// Transform capability
// ============================================================================

/// Derived image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
}

impl TargetFormat {
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub const fn ext(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    const fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Webp => image::ImageFormat::WebP,
        }
    }
}

/// External image capability: source bytes + target format/width to
/// derived bytes.
pub trait ImageTransformer: Send + Sync {
    fn transform(
        &self,
        src: &[u8],
        format: TargetFormat,
        width: u32,
    ) -> Result<Vec<u8>, ImageError>;
}

/// Built-in transformer backed by the `image` crate. Downscales to the
/// requested width (never upscales) preserving aspect ratio.
#[derive(Debug, Default)]
pub struct ResizeTransformer;

impl ImageTransformer for ResizeTransformer {
    fn transform(
        &self,
        src: &[u8],
        format: TargetFormat,
        width: u32,
    ) -> Result<Vec<u8>, ImageError> {
        let img = image::load_from_memory(src).map_err(|e| ImageError::Decode(e.to_string()))?;

        let img = if img.width() > width {
            let height = ((u64::from(width) * u64::from(img.height())) / u64::from(img.width()))
                .max(1) as u32;
            img.resize_exact(width, height, FilterType::Lanczos3)
        } else {
            img
        };

        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format.image_format())
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

// ============================================================================
// Derivation cache
// ============================================================================

type DerivedKey = (PathBuf, TargetFormat, u32);
type DerivedCell = Arc<OnceLock<Result<PathBuf, String>>>;

/// Concurrency-safe key → derived-path map.
///
/// The outer lock only guards cell lookup; derivation itself happens
/// inside the cell's `get_or_init`, so a slow decode never holds the map
/// and duplicate concurrent derivations of one key cannot happen.
#[derive(Default)]
pub struct DerivedCache {
    cells: Mutex<FxHashMap<DerivedKey, DerivedCell>>,
}

impl DerivedCache {
    fn cell(&self, key: &DerivedKey) -> DerivedCell {
        self.cells.lock().entry(key.clone()).or_default().clone()
    }

    /// Drop every cell. Called at the start of each pass: derived
    /// artifacts only land in the pass that computes them, so a cell
    /// surviving into the next pass would leave dangling references.
    fn clear(&self) {
        self.cells.lock().clear();
    }

    /// Look up the derived path for a key, running `derive` exactly once
    /// per key. Failures are cached too so a broken source is decoded
    /// once, not once per referencing page.
    pub fn get_or_derive(
        &self,
        key: &DerivedKey,
        derive: impl FnOnce() -> Result<PathBuf, String>,
    ) -> Result<PathBuf, String> {
        self.cell(key).get_or_init(derive).clone()
    }

    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.lock().is_empty()
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Image transform plugin. Post-render artifact rewriting.
pub struct ImagePlugin {
    transformer: Arc<dyn ImageTransformer>,
    cache: DerivedCache,
}

impl ImagePlugin {
    pub fn new(transformer: Arc<dyn ImageTransformer>) -> Self {
        Self {
            transformer,
            cache: DerivedCache::default(),
        }
    }
}

impl Plugin for ImagePlugin {
    fn name(&self) -> &str {
        "image"
    }

    fn phases(&self) -> &[Phase] {
        &[Phase::PostRender]
    }

    fn run(&self, _phase: Phase, ctx: &mut PluginContext) -> Result<()> {
        if !ctx.config.images.enable {
            return Ok(());
        }

        // Watch mode reuses the plugin instance across passes
        self.cache.clear();

        let derived = Mutex::new(Vec::new());
        let errors = Mutex::new(Vec::new());
        let root = ctx.config.root.clone();
        let out_dir = ctx.config.images.output.clone();

        ctx.artifacts
            .par_iter_mut()
            .filter(|a| a.path.extension().is_some_and(|e| e == "html"))
            .for_each(|artifact| {
                let Ok(html) = std::str::from_utf8(&artifact.content) else {
                    return;
                };

                let rewritten = IMAGE_REF.replace_all(html, |caps: &Captures| {
                    match self.rewrite_ref(caps, &root, &out_dir, &derived) {
                        Ok(url) => format!("src=\"{url}\""),
                        Err(message) => {
                            errors
                                .lock()
                                .push(RenderError::new(artifact.path.clone(), message));
                            caps[0].to_string()
                        }
                    }
                });

                if let std::borrow::Cow::Owned(new_html) = rewritten {
                    artifact.content = new_html.into_bytes();
                }
            });

        let derived = derived.into_inner();
        if !derived.is_empty() {
            log!("image"; "derived {} images", derived.len());
        }
        ctx.artifacts.extend(derived);
        ctx.errors.append(&mut errors.into_inner());
        Ok(())
    }
}

impl ImagePlugin {
    /// Resolve one matched reference to a derived URL, deriving the
    /// artifact on first use of its key.
    fn rewrite_ref(
        &self,
        caps: &Captures,
        root: &Path,
        out_dir: &Path,
        derived: &Mutex<Vec<OutputArtifact>>,
    ) -> Result<String, String> {
        let ref_path = &caps[1];
        let width: u32 = caps[2].parse().map_err(|_| "width out of range".to_string())?;
        if width == 0 {
            return Err("width must be positive".to_string());
        }

        let source_rel = ref_path.trim_start_matches('/');
        let source = root.join(source_rel);

        let format = match caps.get(3) {
            Some(f) => TargetFormat::from_ext(f.as_str())
                .ok_or_else(|| ImageError::UnsupportedFormat(f.as_str().to_string()).to_string())?,
            None => {
                let ext = source
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                TargetFormat::from_ext(ext)
                    .ok_or_else(|| ImageError::UnsupportedFormat(ext.to_string()).to_string())?
            }
        };

        let key = (PathBuf::from(source_rel), format, width);
        let rel = self.cache.get_or_derive(&key, || {
            if !source.is_file() {
                return Err(ImageError::MissingSource(source.clone()).to_string());
            }
            let bytes = fs::read(&source).map_err(|e| e.to_string())?;
            let out = self
                .transformer
                .transform(&bytes, format, width)
                .map_err(|e| e.to_string())?;

            let stem = source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            let digest = blake3::hash(&bytes);
            let tag = hex::encode(&digest.as_bytes()[..4]);
            let rel = out_dir.join(format!("{stem}-{tag}-w{width}.{}", format.ext()));

            derived.lock().push(OutputArtifact::new(rel.clone(), out));
            Ok(rel)
        })?;

        Ok(format!("/{}", rel.display()))
    }
}
