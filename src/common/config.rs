//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct HarnessConfig {
    /// The linker under test
    #[serde(default)]
    pub tool: ToolConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Fixture layout settings
    #[serde(default)]
    pub fixtures: FixtureSettings,

    /// Scale scenario settings
    #[serde(default)]
    pub scale: ScaleSettings,
}

/// How to invoke the linker
#[derive(Debug, Deserialize, Clone)]
pub struct ToolConfig {
    /// Program name or path
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every invocation (e.g. a script for an interpreter)
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "knot".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Upper bound on a single linker invocation
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: default_command_secs(),
        }
    }
}

impl Timeouts {
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

fn default_command_secs() -> u64 {
    30
}

/// Fixture layout settings
#[derive(Debug, Deserialize, Clone)]
pub struct FixtureSettings {
    /// Prefix for temporary fixture roots
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Directory the linker populates inside each app
    #[serde(default = "default_dependency_dir")]
    pub dependency_dir: String,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            dependency_dir: default_dependency_dir(),
        }
    }
}

fn default_prefix() -> String {
    "knot_test".to_string()
}

fn default_dependency_dir() -> String {
    "knot_packages".to_string()
}

/// Scale scenario settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScaleSettings {
    /// Number of generated packages linked into one app
    #[serde(default = "default_package_count")]
    pub package_count: usize,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            package_count: default_package_count(),
        }
    }
}

fn default_package_count() -> usize {
    20
}

impl HarnessConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present, and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tool.program.trim().is_empty() {
            return Err(Error::Config("tool.program must not be empty".to_string()));
        }
        if self.timeouts.command_secs == 0 {
            return Err(Error::Config("timeouts.command_secs must be at least 1".to_string()));
        }
        if self.scale.package_count == 0 {
            return Err(Error::Config("scale.package_count must be at least 1".to_string()));
        }
        if self.fixtures.dependency_dir.trim().is_empty() {
            return Err(Error::Config("fixtures.dependency_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the configured program on PATH, for diagnostics
    pub fn resolved_tool(&self) -> Option<PathBuf> {
        which::which(&self.tool.program).ok()
    }
}
