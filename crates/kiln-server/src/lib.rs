//! Development server for kiln.
//!
//! Serves the build output, watches the source tree, re-runs the matching
//! asset task on change, and pushes live-reload messages to the browser.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, HubNotifier, ServerError};
pub use watcher::{default_rules, match_rule, Action, FileWatcher, WatchEvent, WatchKind, WatchRule};
pub use websocket::{LiveReloadHub, LiveReloadMessage};
