//! WebSocket live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint path.
pub const SOCKET_PATH: &str = "/__kiln/ws";

/// Client script path.
pub const CLIENT_PATH: &str = "/__kiln/client.js";

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Swap the stylesheet served at `path` without reloading
    CssUpdate { path: String },

    /// A task failed; shown in the browser console
    BuildError { task: String, message: String },
}

/// Hub for broadcasting live-reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<LiveReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: LiveReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The browser side of live reload.
pub fn client_script() -> String {
    format!(
        r#"(function() {{
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var ws = new WebSocket(protocol + location.host + '{socket}');

  function refreshStylesheet(path) {{
    var found = false;
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
      var url = new URL(link.href, location.href);
      if (url.pathname === path) {{
        url.searchParams.set('v', Date.now());
        link.href = url.toString();
        found = true;
      }}
    }});
    if (!found) {{
      location.reload();
    }}
  }}

  ws.onmessage = function(event) {{
    var msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;
      case 'css_update':
        refreshStylesheet(msg.path);
        break;
      case 'build_error':
        console.error('[kiln] ' + msg.task + ' failed:\n' + msg.message);
        break;
      case 'connected':
        console.log('[kiln] live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[kiln] disconnected, waiting for the server');
    var retry = setInterval(function() {{
      fetch('{client}', {{ cache: 'no-store' }}).then(function() {{
        clearInterval(retry);
        location.reload();
      }}, function() {{}});
    }}, 1000);
  }};
}})();
"#,
        socket = SOCKET_PATH,
        client = CLIENT_PATH,
    )
}
