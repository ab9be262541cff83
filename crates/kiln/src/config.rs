//! Project configuration (`kiln.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kiln_pipeline::{BuildConfig, Mode};
use kiln_server::DevServerConfig;
use serde::Deserialize;

/// Configuration file structure (kiln.toml).
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    pub mode: Option<Mode>,
    /// browserslist queries for CSS prefixing
    pub browsers: Option<Vec<String>>,
    /// ECMAScript target for script lowering
    pub script_target: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_open")]
    pub open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            open: default_open(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchSettings {
    /// Re-render templates on change; `false` only reloads the browser
    #[serde(default = "default_rebuild_templates")]
    pub rebuild_templates: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            rebuild_templates: default_rebuild_templates(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_open() -> bool {
    true
}
fn default_rebuild_templates() -> bool {
    true
}

/// A project root together with its configuration file.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub file: ConfigFile,
}

impl Project {
    /// Load `config` (relative to `root` unless absolute).
    /// Returns an error if the config file exists but is malformed.
    pub fn load(root: &Path, config: &Path) -> Result<Self> {
        let config_path = root.join(config);

        let file = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let file: ConfigFile = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;
            tracing::debug!("Loaded config from {}", config_path.display());
            file
        } else {
            ConfigFile::default()
        };

        Ok(Self {
            root: root.to_path_buf(),
            file,
        })
    }

    /// Build settings: the command-line mode wins over the file, which wins
    /// over the command's default.
    pub fn build_config(&self, mode: Option<Mode>, default_mode: Mode) -> BuildConfig {
        let settings = &self.file.build;
        let mode = mode.or(settings.mode).unwrap_or(default_mode);

        let mut config = BuildConfig::new(&self.root, mode);
        if let Some(browsers) = &settings.browsers {
            config.browsers = browsers.clone();
        }
        if let Some(target) = &settings.script_target {
            config.script_target = target.clone();
        }
        config
    }

    pub fn server_config(
        &self,
        build: BuildConfig,
        port: Option<u16>,
        open: bool,
        live_reload: bool,
    ) -> DevServerConfig {
        let server = &self.file.server;

        DevServerConfig {
            build,
            port: port.unwrap_or(server.port),
            host: server.host.clone(),
            open: open && server.open,
            live_reload,
            rebuild_templates: self.file.watch.rebuild_templates,
        }
    }
}
