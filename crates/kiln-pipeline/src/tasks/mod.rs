//! The asset tasks.
//!
//! Every task reads only from the source tree and writes only below its own
//! output path, so tasks can run in any order after `clean`.

mod clean;
mod fonts;
mod html;
mod images;
mod scripts;
mod styles;
mod svg;

pub use clean::clean;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use crate::config::BuildConfig;

/// The seven asset tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Html,
    Styles,
    Scripts,
    Fonts,
    Svg,
    Images,
    Uploads,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::Html,
        TaskKind::Styles,
        TaskKind::Scripts,
        TaskKind::Fonts,
        TaskKind::Svg,
        TaskKind::Images,
        TaskKind::Uploads,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Html => "html",
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Fonts => "fonts",
            TaskKind::Svg => "svg",
            TaskKind::Images => "images",
            TaskKind::Uploads => "uploads",
        }
    }

    /// How connected browsers should react once this task succeeds.
    pub fn live_reload(&self) -> LiveReload {
        match self {
            TaskKind::Html | TaskKind::Scripts => LiveReload::Reload,
            TaskKind::Styles => LiveReload::InjectCss,
            _ => LiveReload::None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown task '{s}'"))
    }
}

/// Browser reaction after a task succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveReload {
    None,
    Reload,
    InjectCss,
}

/// Errors produced by asset tasks.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A source file could not be transformed. The build carries on.
    #[error("{task}: {message}")]
    Transform { task: TaskKind, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transform(task: TaskKind, message: impl Into<String>) -> Self {
        TaskError::Transform {
            task,
            message: message.into(),
        }
    }

    /// Transformation errors are reported and skipped; the rest abort a build.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TaskError::Transform { .. })
    }
}

/// Outcome of a successful task run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskKind,
    /// Files written
    pub outputs: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Run a single asset task.
pub fn run_task(kind: TaskKind, config: &BuildConfig) -> Result<TaskReport, TaskError> {
    let start = Instant::now();

    let outputs = match kind {
        TaskKind::Html => html::run(config)?,
        TaskKind::Styles => styles::run(config)?,
        TaskKind::Scripts => scripts::run(config)?,
        TaskKind::Fonts => fonts::run(config)?,
        TaskKind::Svg => svg::run(config)?,
        TaskKind::Images => images::run_images(config)?,
        TaskKind::Uploads => images::run_uploads(config)?,
    };

    Ok(TaskReport {
        task: kind,
        outputs,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
