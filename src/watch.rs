//! File system watcher and rebuild controller.
//!
//! State machine: Idle → Watching → Rebuilding → Watching (loop), and
//! Watching → Stopped on ctrl-c or watcher disconnect.
//!
//! Change events are debounced, and a rebuild in progress never starts a
//! second one: events arriving while Rebuilding queue in the channel, get
//! drained into a single pending batch afterwards, and trigger exactly
//! one follow-up rebuild however many there were.
//!
//! Rebuilds are conservative full passes; items are cheap to recreate and
//! correctness never depends on incremental scoping.

use crate::config::SiteConfig;
use crate::log;
use crate::utils::glob::GlobPattern;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, RecvTimeoutError},
    },
    time::{Duration, Instant},
};

const IDLE_POLL_MS: u64 = 500;

/// Watch controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Rebuilding,
    Stopped,
}

// =============================================================================
// Path utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Deletions rebuild too: a removed source must drop out of the output.
const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Watch targets
// =============================================================================

/// Decides whether a changed path belongs to the watch set.
///
/// Content, template, and config paths are always in; extra glob targets
/// from `[watch]` and passthrough patterns match against root-relative
/// paths.
pub struct TargetMatcher {
    root: PathBuf,
    prefixes: Vec<PathBuf>,
    globs: Vec<GlobPattern>,
}

impl TargetMatcher {
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut globs = Vec::new();
        for pattern in config.watch.targets.iter().chain(&config.build.passthrough) {
            globs.push(
                GlobPattern::new(pattern)
                    .with_context(|| format!("invalid watch target `{pattern}`"))?,
            );
        }

        Ok(Self {
            root: config.root.clone(),
            prefixes: vec![
                config.content_dir(),
                config.templates_dir(),
                config.config_path.clone(),
            ],
            globs,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        if is_temp_file(path) {
            return false;
        }
        if self.prefixes.iter().any(|p| path.starts_with(p)) {
            return true;
        }

        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let Some(rel) = rel.to_str() else {
            return false;
        };
        let rel = rel.replace('\\', "/");
        self.globs.iter().any(|g| g.matches(&rel))
    }

    /// Directories (and the config file) to register with the OS watcher.
    pub fn watch_roots(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots = vec![
            (self.prefixes[0].clone(), RecursiveMode::Recursive),
            (self.prefixes[1].clone(), RecursiveMode::Recursive),
            (self.prefixes[2].clone(), RecursiveMode::NonRecursive),
        ];
        for glob in &self.globs {
            let dir = self.root.join(glob.literal_prefix());
            roots.push((dir, RecursiveMode::Recursive));
        }
        roots.retain(|(p, _)| p.exists());
        roots.dedup_by(|a, b| a.0 == b.0);
        roots
    }
}

// =============================================================================
// Debounce state
// =============================================================================

/// Batches rapid file events behind a quiet period.
pub struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    debounce: Duration,
}

impl Debouncer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            debounce,
        }
    }

    pub fn add(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.pending.extend(paths);
        self.last_event = Some(Instant::now());
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self.last_event.is_some_and(|t| t.elapsed() >= self.debounce)
    }

    pub fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    pub fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(IDLE_POLL_MS)
        } else {
            self.debounce
        }
    }
}

// =============================================================================
// Event loop
// =============================================================================

/// Start the blocking watch loop. `rebuild` runs one full pass.
pub fn watch_for_changes(
    config: &SiteConfig,
    rebuild: impl FnMut(&[PathBuf]) -> Result<()>,
) -> Result<()> {
    let matcher = TargetMatcher::from_config(config)?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;

    for (path, mode) in matcher.watch_roots() {
        if let Err(e) = watcher.watch(&path, mode) {
            // Keep watching the remaining targets
            log!("warn"; "cannot watch {}: {e}", path.display());
        } else {
            log!("watch"; "{}", path.strip_prefix(&config.root).unwrap_or(&path).display());
        }
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install shutdown handler")?;
    }

    let debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));
    run_loop(&rx, |p| matcher.matches(p), debouncer, &stop, rebuild)
}

/// The controller loop, separated from watcher setup so tests can drive
/// it with a plain channel.
fn run_loop(
    rx: &Receiver<notify::Result<Event>>,
    matches: impl Fn(&Path) -> bool,
    mut debouncer: Debouncer,
    stop: &AtomicBool,
    mut rebuild: impl FnMut(&[PathBuf]) -> Result<()>,
) -> Result<()> {
    let mut state = WatchState::Idle;
    debug_assert_eq!(state, WatchState::Idle);
    state = WatchState::Watching;
    log!("watch"; "watching for changes");

    loop {
        if stop.load(Ordering::SeqCst) {
            state = WatchState::Stopped;
            break;
        }
        debug_assert_eq!(state, WatchState::Watching);

        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add(event.paths.into_iter().filter(|p| matches(p)));
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                state = WatchState::Rebuilding;
                run_rebuild(debouncer.take(), &mut rebuild);

                // Events that arrived while Rebuilding coalesce into one
                // pending batch for a single follow-up rebuild.
                while let Ok(Ok(event)) = rx.try_recv() {
                    if is_relevant(&event) {
                        debouncer.add(event.paths.into_iter().filter(|p| matches(p)));
                    }
                }
                debug_assert_eq!(state, WatchState::Rebuilding);
                state = WatchState::Watching;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Flush the coalesced batch before shutting down
                if !debouncer.is_empty() {
                    state = WatchState::Rebuilding;
                    run_rebuild(debouncer.take(), &mut rebuild);
                    debug_assert_eq!(state, WatchState::Rebuilding);
                }
                state = WatchState::Stopped;
                break;
            }
        }
    }

    debug_assert_eq!(state, WatchState::Stopped);
    log!("watch"; "stopped");
    Ok(())
}

fn run_rebuild(mut paths: Vec<PathBuf>, rebuild: &mut impl FnMut(&[PathBuf]) -> Result<()>) {
    paths.sort();
    if paths.is_empty() {
        return;
    }
    log!("watch"; "{} changed, rebuilding...", paths.len());
    if let Err(e) = rebuild(&paths) {
        log!("watch"; "rebuild failed: {e:#}");
    }
}
