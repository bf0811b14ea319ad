//! # Content Hot Reload
//!
//! Watches the content directory and turns file modifications into reload
//! requests.
//!
//! Two documents are watched: `config.json` (tunables) and `content.json`
//! (the type-to-definition map). This module only detects and reads; the
//! server loop applies the parsed results through the same config-sync and
//! content-load paths an admin edit uses. A malformed file is logged and
//! skipped, leaving prior state untouched.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

/// Name of the tunables document inside the content directory.
pub const CONFIG_FILE: &str = "config.json";

/// Name of the definitions document inside the content directory.
pub const CONTENT_FILE: &str = "content.json";

/// Which watched document changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentChange {
    /// `config.json` was modified.
    Config,
    /// `content.json` was modified.
    Definitions,
}

/// Filesystem watcher over the content directory.
pub struct ContentWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    root: PathBuf,
}

impl ContentWatcher {
    /// Starts watching the given directory.
    pub fn new(root: impl AsRef<Path>) -> notify::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        tracing::info!(root = %root.display(), "watching content directory");
        Ok(Self { _watcher: watcher, rx, root })
    }

    /// Path of the tunables document.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Path of the definitions document.
    #[must_use]
    pub fn content_path(&self) -> PathBuf {
        self.root.join(CONTENT_FILE)
    }

    /// Drains pending filesystem events into reload requests.
    ///
    /// Editor write patterns produce bursts of events; duplicates are
    /// collapsed so each document reloads at most once per drain.
    pub fn drain_changes(&mut self) -> Vec<ContentChange> {
        let mut changes = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) => {
                    if !is_relevant(&event.kind) {
                        continue;
                    }
                    for path in &event.paths {
                        let Some(change) = classify(path) else { continue };
                        if !changes.contains(&change) {
                            changes.push(change);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "content watcher error"),
            }
        }
        changes
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn classify(path: &Path) -> Option<ContentChange> {
    match path.file_name()?.to_str()? {
        CONFIG_FILE => Some(ContentChange::Config),
        CONTENT_FILE => Some(ContentChange::Definitions),
        _ => None,
    }
}
