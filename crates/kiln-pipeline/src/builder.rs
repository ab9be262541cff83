//! Build orchestration.
//!
//! A build is a [`TaskGraph`] with `clean` ahead of every asset task. The
//! asset tasks share one layer and run concurrently.

use std::fmt;
use std::time::Instant;

use crate::config::BuildConfig;
use crate::graph::{GraphError, TaskGraph};
use crate::notifier::Notifier;
use crate::tasks::{self, TaskError, TaskKind, TaskReport};

/// A node of the build graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Clean,
    Task(TaskKind),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Clean => "clean",
            Step::Task(kind) => kind.name(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The full build: `clean`, then all seven asset tasks.
pub fn build_graph() -> Result<TaskGraph<Step>, GraphError> {
    let mut graph = TaskGraph::new();
    graph.add(Step::Clean.name(), Step::Clean, &[])?;
    for kind in TaskKind::ALL {
        graph.add(kind.name(), Step::Task(kind), &[Step::Clean.name()])?;
    }
    Ok(graph)
}

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Clean failed: {0}")]
    Clean(#[source] TaskError),

    #[error("Task '{task}' failed: {source}")]
    Task {
        task: TaskKind,
        #[source]
        source: TaskError,
    },
}

/// Result of a full build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Tasks that succeeded
    pub reports: Vec<TaskReport>,

    /// Tasks that failed with a recoverable error
    pub failures: Vec<(TaskKind, String)>,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files written.
    pub fn files(&self) -> usize {
        self.reports.iter().map(|r| r.outputs.len()).sum()
    }
}

enum Outcome {
    Cleaned,
    Finished(TaskReport),
    Failed(TaskKind, String),
}

/// Runs builds and single tasks against one configuration.
pub struct Orchestrator<'a> {
    config: &'a BuildConfig,
    notifier: &'a dyn Notifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a BuildConfig, notifier: &'a dyn Notifier) -> Self {
        Self { config, notifier }
    }

    pub fn config(&self) -> &BuildConfig {
        self.config
    }

    /// Clean the output root, then run every asset task.
    ///
    /// Recoverable task failures are notified and recorded in the summary;
    /// any other failure aborts the build.
    pub fn build(&self) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();
        tracing::info!(
            "Building {} ({})",
            self.config.layout.root.display(),
            self.config.mode
        );

        let graph = build_graph()?;
        let outcomes = graph.run(|step| self.step(*step))?;

        let mut summary = BuildSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Cleaned => {}
                Outcome::Finished(report) => summary.reports.push(report),
                Outcome::Failed(task, message) => summary.failures.push((task, message)),
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        Ok(summary)
    }

    fn step(&self, step: Step) -> Result<Outcome, BuildError> {
        match step {
            Step::Clean => {
                tasks::clean(&self.config.layout.out).map_err(BuildError::Clean)?;
                Ok(Outcome::Cleaned)
            }
            Step::Task(kind) => match self.run_task(kind) {
                Ok(report) => Ok(Outcome::Finished(report)),
                Err(e) if e.is_recoverable() => Ok(Outcome::Failed(kind, e.to_string())),
                Err(e) => Err(BuildError::Task {
                    task: kind,
                    source: e,
                }),
            },
        }
    }

    /// Run one asset task, notifying the outcome.
    pub fn run_task(&self, kind: TaskKind) -> Result<TaskReport, TaskError> {
        tracing::debug!("[{}] started", kind);

        match tasks::run_task(kind, self.config) {
            Ok(report) => {
                self.notifier.task_finished(&report);
                Ok(report)
            }
            Err(e) => {
                self.notifier.task_failed(kind, &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        failed: Mutex<Vec<TaskKind>>,
    }

    impl Notifier for Recorder {
        fn task_failed(&self, task: TaskKind, _error: &TaskError) {
            self.failed.lock().unwrap().push(task);
        }
    }

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn scaffold(root: &Path) {
        write(root, "src/templates/layout.html", "<body>{% block content %}{% endblock %}</body>\n");
        write(
            root,
            "src/templates/pages/index.html",
            "{% extends \"layout.html\" %}{% block content %}<h1>Hi</h1>{% endblock %}",
        );
        write(root, "src/styles/style.css", ".a {\n  & .b { color: red; }\n}\n");
        write(root, "src/js/index.js", "import { divide } from \"./lib.js\";\nconsole.log(divide(4, 2));\n");
        write(root, "src/js/lib.js", "export const divide = (a, b) => a / b;\n");
        write(root, "src/fonts/Inter.woff2", "wOF2 font bytes");
        write(
            root,
            "src/img/svg/star.svg",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 8 8\"><path d=\"M0 0h8\" fill=\"gold\"/></svg>",
        );
        write(root, "src/uploads/files/terms.txt", "terms");
    }

    #[test]
    fn graph_cleans_before_every_task() {
        let graph = build_graph().unwrap();
        let layers = graph.layer_names().unwrap();

        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], vec!["clean"]);
        assert_eq!(layers[1].len(), 7);
    }

    #[test]
    fn builds_every_output() {
        let temp = tempdir().unwrap();
        scaffold(temp.path());
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("build/stale.html"), "old").unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);
        let recorder = Recorder::default();

        let summary = Orchestrator::new(&config, &recorder).build().unwrap();

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert_eq!(summary.reports.len(), 7);
        let out = temp.path().join("build");
        for path in [
            "index.html",
            "src/css/style.css",
            "src/js/scripts.js",
            "src/fonts/Inter.woff2",
            "src/img/svg/symbol/sprite.svg",
            "src/img/svg/star.svg",
            "uploads/files/terms.txt",
        ] {
            assert!(out.join(path).is_file(), "missing {path}");
        }
        assert!(!out.join("stale.html").exists());
    }

    #[test]
    fn fonts_are_identical_across_builds() {
        let temp = tempdir().unwrap();
        scaffold(temp.path());
        let config = BuildConfig::new(temp.path(), Mode::Production);
        let orchestrator = Orchestrator::new(&config, &crate::LogNotifier);
        let font = temp.path().join("build/src/fonts/Inter.woff2");

        orchestrator.build().unwrap();
        let first = fs::read(&font).unwrap();
        orchestrator.build().unwrap();

        assert_eq!(fs::read(&font).unwrap(), first);
        assert_eq!(first, b"wOF2 font bytes");
    }

    #[test]
    fn recoverable_failures_do_not_stop_other_tasks() {
        let temp = tempdir().unwrap();
        scaffold(temp.path());
        write(temp.path(), "src/styles/style.css", ".a) { color: red; }\n");
        let config = BuildConfig::new(temp.path(), Mode::Development);
        let recorder = Recorder::default();

        let summary = Orchestrator::new(&config, &recorder).build().unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, TaskKind::Styles);
        assert_eq!(*recorder.failed.lock().unwrap(), vec![TaskKind::Styles]);
        assert!(!config.layout.style_output().exists());
        assert!(config.layout.out.join("index.html").exists());
    }

    #[test]
    fn configuration_errors_abort() {
        let temp = tempdir().unwrap();
        scaffold(temp.path());
        fs::remove_file(temp.path().join("src/js/index.js")).unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);

        let err = Orchestrator::new(&config, &crate::LogNotifier)
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::Task {
                task: TaskKind::Scripts,
                ..
            }
        ));
    }
}
