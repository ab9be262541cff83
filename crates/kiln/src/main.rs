//! kiln CLI - front-end asset pipeline for static sites.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kiln_pipeline::{Mode, TaskKind};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Project;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Front-end asset pipeline for static sites")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Path to kiln.toml, relative to the project root
    #[arg(short, long, default_value = "kiln.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    #[value(alias = "dev")]
    Development,
    #[value(alias = "prod")]
    Production,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Development => Mode::Development,
            ModeArg::Production => Mode::Production,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a demo project
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Clean the output and run every asset task
    Build {
        /// Build mode (defaults to config or production)
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Build, then watch sources and serve with live reload
    Dev {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,

        /// Build mode (defaults to config or development)
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Run a single asset task
    Run {
        /// Task to run
        task: TaskKind,

        /// Build mode (defaults to config or production)
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Watch sources and serve with live reload, without an initial build
    Watch {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,

        /// Build mode (defaults to config or development)
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Delete everything in the output directory
    Clean,

    /// Preview the built output
    Serve {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let load = || -> Result<Project> {
        let root = cli
            .root
            .canonicalize()
            .with_context(|| format!("Project root not found: {}", cli.root.display()))?;
        Project::load(&root, &cli.config)
    };

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.root, yes).await?;
        }
        Commands::Build { mode } => {
            commands::build::run(&load()?, mode.map(Mode::from)).await?;
        }
        Commands::Dev {
            port,
            no_open,
            mode,
        } => {
            commands::dev::run(&load()?, port, !no_open, mode.map(Mode::from), true).await?;
        }
        Commands::Run { task, mode } => {
            commands::run::run(&load()?, task, mode.map(Mode::from)).await?;
        }
        Commands::Watch {
            port,
            no_open,
            mode,
        } => {
            commands::dev::run(&load()?, port, !no_open, mode.map(Mode::from), false).await?;
        }
        Commands::Clean => {
            commands::clean::run(&load()?).await?;
        }
        Commands::Serve { port } => {
            commands::serve::run(&load()?, port).await?;
        }
    }

    Ok(())
}
