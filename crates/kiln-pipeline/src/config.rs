//! Build configuration and the fixed source/output layout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Font extensions copied by the font task.
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "woff", "woff2", "eot", "svg"];

/// Default browserslist query for vendor prefixing.
pub const DEFAULT_BROWSERS: &str = "> 0.1%";

/// Default ECMAScript target for the transpilation rule.
pub const DEFAULT_SCRIPT_TARGET: &str = "es2015";

/// Whether a build is for local development or for deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// A set of source files: a directory, whether to descend into
/// subdirectories, and an extension allow-list (empty means any file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub dir: PathBuf,
    pub recursive: bool,
    pub extensions: &'static [&'static str],
}

impl Selector {
    pub fn new(dir: impl Into<PathBuf>, recursive: bool, extensions: &'static [&'static str]) -> Self {
        Self {
            dir: dir.into(),
            recursive,
            extensions,
        }
    }

    /// Whether `path` belongs to this selection.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.dir) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }
        if !self.recursive && relative.components().count() != 1 {
            return false;
        }
        self.matches_extension(path)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        self.extensions.contains(&ext.as_str())
    }

    /// Matching files on disk, sorted. A missing directory selects nothing.
    pub fn files(&self) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            return Vec::new();
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.dir)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.matches_extension(p) && !is_hidden(p))
            .collect();

        files.sort();
        files
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Fixed project layout relative to a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Project root
    pub root: PathBuf,
    /// Source root (`src/`)
    pub src: PathBuf,
    /// Output root (`build/`)
    pub out: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            src: root.join("src"),
            out: root.join("build"),
            root,
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.src.join("templates")
    }

    /// Page templates rendered to HTML.
    pub fn pages(&self) -> Selector {
        Selector::new(self.templates_dir().join("pages"), false, &["html"])
    }

    /// Every template, pages and partials.
    pub fn templates(&self) -> Selector {
        Selector::new(self.templates_dir(), true, &["html"])
    }

    pub fn style_entry(&self) -> PathBuf {
        self.src.join("styles").join("style.css")
    }

    pub fn styles(&self) -> Selector {
        Selector::new(self.src.join("styles"), true, &["css"])
    }

    pub fn style_output(&self) -> PathBuf {
        self.out.join("src").join("css").join("style.css")
    }

    pub fn script_entry(&self) -> PathBuf {
        self.src.join("js").join("index.js")
    }

    pub fn scripts(&self) -> Selector {
        Selector::new(self.src.join("js"), true, &["js", "mjs"])
    }

    pub fn script_output(&self) -> PathBuf {
        self.out.join("src").join("js").join("scripts.js")
    }

    pub fn fonts(&self) -> Selector {
        Selector::new(self.src.join("fonts"), true, FONT_EXTENSIONS)
    }

    pub fn fonts_output(&self) -> PathBuf {
        self.out.join("src").join("fonts")
    }

    /// Icons combined into the sprite.
    pub fn icons(&self) -> Selector {
        Selector::new(self.src.join("img").join("svg"), false, &["svg"])
    }

    pub fn sprite_output(&self) -> PathBuf {
        self.out
            .join("src")
            .join("img")
            .join("svg")
            .join("symbol")
            .join("sprite.svg")
    }

    pub fn images(&self) -> Selector {
        Selector::new(self.src.join("img"), true, &[])
    }

    pub fn images_output(&self) -> PathBuf {
        self.out.join("src").join("img")
    }

    pub fn uploads(&self) -> Selector {
        Selector::new(self.src.join("uploads"), true, &[])
    }

    /// Uploads keep their path relative to `src/`.
    pub fn uploads_output(&self) -> PathBuf {
        self.out.join("uploads")
    }
}

/// Process-wide settings for one invocation, passed to every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub layout: Layout,
    pub mode: Mode,
    /// browserslist queries used for CSS prefixing and lowering
    pub browsers: Vec<String>,
    /// ECMAScript target of the transpilation rule
    pub script_target: String,
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            layout: Layout::new(root),
            mode,
            browsers: vec![DEFAULT_BROWSERS.to_string()],
            script_target: DEFAULT_SCRIPT_TARGET.to_string(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(".", Mode::default())
    }
}
