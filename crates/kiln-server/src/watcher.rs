//! File watching and the change dispatch table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use kiln_pipeline::{Layout, Selector, TaskKind};

/// Pending changes are released once no event has arrived for this long.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Created,
    Modified,
    Removed,
}

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

/// File watcher forwarding debounced events over a channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Returns the watcher and a channel to receive events. Events stop when
    /// the watcher is dropped.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            let mut debouncer = Debouncer::new(DEBOUNCE);

            loop {
                let disconnected = match sync_rx.recv_timeout(debouncer.wait(Instant::now())) {
                    Ok(event) => {
                        debouncer.add(&event, Instant::now());
                        false
                    }
                    Err(RecvTimeoutError::Timeout) => false,
                    Err(RecvTimeoutError::Disconnected) => true,
                };

                for event in debouncer.take_ready(Instant::now()) {
                    if async_tx.blocking_send(event).is_err() {
                        return;
                    }
                }
                if disconnected {
                    return;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Collects raw notify events and releases them after a quiet period.
///
/// Repeated events for one path collapse into a single change, so a burst of
/// saves yields one event carrying the final state of the file.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    changes: HashMap<PathBuf, WatchKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            changes: HashMap::new(),
            last_event: None,
        }
    }

    fn add(&mut self, event: &notify::Event, now: Instant) {
        let Some(kind) = classify(&event.kind) else {
            return;
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }

            match (self.changes.get(path).copied(), kind) {
                (None, _) | (Some(WatchKind::Removed), WatchKind::Created | WatchKind::Modified) => {
                    self.changes.insert(path.clone(), kind);
                }
                (Some(WatchKind::Modified), WatchKind::Removed) => {
                    self.changes.insert(path.clone(), WatchKind::Removed);
                }
                // Appeared and vanished inside one window
                (Some(WatchKind::Created), WatchKind::Removed) => {
                    self.changes.remove(path);
                }
                _ => {}
            }
            self.last_event = Some(now);
        }
    }

    /// Pending changes, sorted by path, once the window has been quiet.
    fn take_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        match self.last_event {
            Some(last) if now.duration_since(last) >= self.window => {}
            _ => return Vec::new(),
        }
        self.last_event = None;

        let mut events: Vec<WatchEvent> = self
            .changes
            .drain()
            .map(|(path, kind)| WatchEvent { path, kind })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    /// How long to block for the next raw event.
    fn wait(&self, now: Instant) -> Duration {
        match self.last_event {
            Some(last) => self
                .window
                .saturating_sub(now.duration_since(last))
                .max(Duration::from_millis(1)),
            None => Duration::from_secs(3600),
        }
    }
}

fn classify(kind: &EventKind) -> Option<WatchKind> {
    match kind {
        EventKind::Create(_) => Some(WatchKind::Created),
        // mtime and permission noise
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(WatchKind::Modified),
        EventKind::Remove(_) => Some(WatchKind::Removed),
        _ => None,
    }
}

/// Editor swap files and our own atomic-write temporaries.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "swp" | "swo" | "tmp" | "bak" | "kiln-tmp") || name.ends_with('~')
}

/// Reaction to a matched change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Re-run one asset task
    Run(TaskKind),

    /// Reload the browser without rebuilding
    Reload,
}

/// One row of the dispatch table.
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub selector: Selector,
    pub action: Action,
}

/// The dispatch table for a project.
///
/// With `rebuild_templates` off, template edits only reload the browser.
pub fn default_rules(layout: &Layout, rebuild_templates: bool) -> Vec<WatchRule> {
    let templates = if rebuild_templates {
        Action::Run(TaskKind::Html)
    } else {
        Action::Reload
    };

    vec![
        WatchRule {
            selector: layout.styles(),
            action: Action::Run(TaskKind::Styles),
        },
        WatchRule {
            selector: layout.templates(),
            action: templates,
        },
        WatchRule {
            selector: layout.scripts(),
            action: Action::Run(TaskKind::Scripts),
        },
        WatchRule {
            selector: layout.icons(),
            action: Action::Run(TaskKind::Svg),
        },
    ]
}

/// The action of the first rule matching `path`.
pub fn match_rule(rules: &[WatchRule], path: &Path) -> Option<Action> {
    rules
        .iter()
        .find(|rule| rule.selector.matches(path))
        .map(|rule| rule.action)
}
