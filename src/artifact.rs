//! Output artifacts and atomic writes.
//!
//! Every terminal product of a pass goes through the [`ArtifactSink`],
//! which enforces path uniqueness within the pass and writes each file
//! atomically (temp file + rename) so readers never observe partial
//! content during a rebuild.

use crate::error::ArtifactCollision;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Destination path (output-root relative) plus byte content.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Collision(#[from] ArtifactCollision),

    #[error("failed to write `{0}`")]
    Io(PathBuf, #[source] io::Error),
}

/// Collision-checked, atomic writer for one build pass.
///
/// Thread-safe: item renders and passthrough copies land here from rayon
/// workers. A fresh sink is created per pass so the uniqueness set does
/// not leak across rebuilds.
pub struct ArtifactSink {
    root: PathBuf,
    claimed: Mutex<FxHashSet<PathBuf>>,
}

impl ArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claimed: Mutex::new(FxHashSet::default()),
        }
    }

    /// Number of artifacts written so far this pass.
    pub fn written(&self) -> usize {
        self.claimed.lock().len()
    }

    /// Claim a relative path for this pass.
    fn claim(&self, rel: &Path) -> Result<(), ArtifactCollision> {
        let mut claimed = self.claimed.lock();
        if !claimed.insert(rel.to_path_buf()) {
            return Err(ArtifactCollision(rel.to_path_buf()));
        }
        Ok(())
    }

    /// Write an artifact under the output root.
    pub fn write(&self, artifact: &OutputArtifact) -> Result<(), SinkError> {
        self.claim(&artifact.path)?;
        let dest = self.root.join(&artifact.path);
        write_atomic(&dest, &artifact.content).map_err(|e| SinkError::Io(dest, e))
    }

    /// Copy a file verbatim to a relative destination, atomically.
    pub fn copy(&self, src: &Path, rel_dest: &Path) -> Result<(), SinkError> {
        self.claim(rel_dest)?;
        let dest = self.root.join(rel_dest);
        copy_atomic(src, &dest).map_err(|e| SinkError::Io(dest, e))
    }
}

/// Write bytes to `dest` via a temp sibling and rename.
///
/// The temp file lives in the destination directory so the rename stays on
/// one filesystem.
fn write_atomic(dest: &Path, content: &[u8]) -> io::Result<()> {
    let tmp = prepare_tmp(dest)?;
    fs::write(&tmp, content)?;
    fs::rename(&tmp, dest)
}

fn copy_atomic(src: &Path, dest: &Path) -> io::Result<()> {
    let tmp = prepare_tmp(dest)?;
    fs::copy(src, &tmp)?;
    fs::rename(&tmp, dest)
}

fn prepare_tmp(dest: &Path) -> io::Result<PathBuf> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("artifact path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(dest.with_file_name(tmp_name))
}
