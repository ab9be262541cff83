//! Asset pipeline for kiln.
//!
//! Each asset task turns one category of source files into build output.
//! The [`Orchestrator`] runs `clean` and then every task concurrently,
//! scheduled through a [`TaskGraph`].

pub mod builder;
pub mod config;
pub mod graph;
pub mod notifier;
pub mod optimize;
pub mod output;
pub mod tasks;

pub use builder::{build_graph, BuildError, BuildSummary, Orchestrator, Step};
pub use config::{BuildConfig, Layout, Mode, Selector};
pub use graph::{GraphError, TaskGraph};
pub use notifier::{LogNotifier, Notifier};
pub use tasks::{clean, run_task, LiveReload, TaskError, TaskKind, TaskReport};
