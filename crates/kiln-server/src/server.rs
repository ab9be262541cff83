//! Development server implementation.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;

use kiln_pipeline::{
    BuildConfig, Layout, LiveReload, LogNotifier, Notifier, Orchestrator, TaskError, TaskKind,
    TaskReport,
};

use crate::watcher::{default_rules, match_rule, Action, FileWatcher, WatchEvent, WatchRule};
use crate::websocket::{client_script, LiveReloadHub, LiveReloadMessage, CLIENT_PATH, SOCKET_PATH};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build settings used when re-running tasks
    pub build: BuildConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// Watch sources and push live-reload messages
    pub live_reload: bool,

    /// Re-render templates on change instead of only reloading
    pub rebuild_templates: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
            live_reload: true,
            rebuild_templates: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File watch error: {0}")]
    Watch(String),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Notifier that logs failures and forwards them to connected browsers.
#[derive(Debug, Clone)]
pub struct HubNotifier {
    hub: LiveReloadHub,
}

impl HubNotifier {
    pub fn new(hub: LiveReloadHub) -> Self {
        Self { hub }
    }
}

impl Notifier for HubNotifier {
    fn task_failed(&self, task: TaskKind, error: &TaskError) {
        LogNotifier.task_failed(task, error);
        self.hub.send(LiveReloadMessage::BuildError {
            task: task.to_string(),
            message: error.to_string(),
        });
    }

    fn task_finished(&self, report: &TaskReport) {
        LogNotifier.task_finished(report);
    }
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Serve the output root until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let config = self.config;
        let layout = &config.build.layout;

        let hub = if config.live_reload {
            let hub = LiveReloadHub::new();
            let rules = default_rules(layout, config.rebuild_templates);
            let (watcher, rx) = FileWatcher::new(&[layout.src.clone()])
                .map_err(|e| ServerError::Watch(e.to_string()))?;

            let build = Arc::new(config.build.clone());
            let dispatch_hub = hub.clone();
            tokio::spawn(async move {
                dispatch(rx, rules, build, dispatch_hub).await;
                drop(watcher);
            });

            Some(hub)
        } else {
            None
        };

        let app = router(&layout.out, hub);

        let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| ServerError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source: e,
            })?;
        let addr: SocketAddr = listener.local_addr().map_err(ServerError::Serve)?;
        let url = format!("http://{}", addr);

        tracing::info!("Serving {} at {}", layout.out.display(), url);

        if config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app).await.map_err(ServerError::Serve)
    }
}

/// Routes for the output root, plus the live-reload endpoints when a hub is
/// given.
pub fn router(out: &Path, hub: Option<LiveReloadHub>) -> Router {
    let files = ServeDir::new(out);

    match hub {
        Some(hub) => Router::new()
            .route(SOCKET_PATH, get(ws_handler))
            .route(CLIENT_PATH, get(client_handler))
            .with_state(hub)
            .fallback_service(files)
            .layer(middleware::map_response(inject_live_reload)),
        None => Router::new().fallback_service(files),
    }
}

/// Process watch events one at a time, running the matched task to
/// completion before reading the next event.
async fn dispatch(
    mut rx: mpsc::Receiver<WatchEvent>,
    rules: Vec<WatchRule>,
    build: Arc<BuildConfig>,
    hub: LiveReloadHub,
) {
    while let Some(event) = rx.recv().await {
        let Some(action) = match_rule(&rules, &event.path) else {
            continue;
        };
        tracing::info!("Changed: {}", event.path.display());

        match action {
            Action::Reload => hub.send(LiveReloadMessage::Reload),
            Action::Run(kind) => {
                let config = Arc::clone(&build);
                let notifier = HubNotifier::new(hub.clone());
                let result = tokio::task::spawn_blocking(move || {
                    Orchestrator::new(&config, &notifier).run_task(kind)
                })
                .await;

                match result {
                    Ok(Ok(report)) => {
                        tracing::info!("[{}] done in {}ms", kind, report.duration_ms);
                        if let Some(msg) = reload_message(kind, &build.layout) {
                            hub.send(msg);
                        }
                    }
                    // Already reported through the notifier
                    Ok(Err(_)) => {}
                    Err(e) => tracing::error!("[{}] task panicked: {}", kind, e),
                }
            }
        }
    }
}

/// The message browsers get after `kind` succeeds.
pub fn reload_message(kind: TaskKind, layout: &Layout) -> Option<LiveReloadMessage> {
    match kind.live_reload() {
        LiveReload::None => None,
        LiveReload::Reload => Some(LiveReloadMessage::Reload),
        LiveReload::InjectCss => {
            let output = layout.style_output();
            let relative = output.strip_prefix(&layout.out).unwrap_or(&output);
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some(LiveReloadMessage::CssUpdate {
                path: format!("/{path}"),
            })
        }
    }
}

/// Insert the client script tag before the closing `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);

    // ASCII lowercasing keeps byte offsets
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(i) => format!("{}{}{}", &html[..i], tag, &html[i..]),
        None => format!("{html}{tag}"),
    }
}

async fn inject_live_reload(response: Response) -> Response {
    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn client_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], client_script())
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: LiveReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &LiveReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Live reload client skipped {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &LiveReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
