//! Fixture configuration types
//!
//! Declarative description of one workspace fixture. Scenarios build these in
//! code; the `scaffold` command also reads them from YAML.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::common::{Error, Result};

/// A complete workspace fixture
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Workspace name
    pub name: String,
    /// Workspace description
    #[serde(default = "default_project_description")]
    pub description: String,
    /// Consuming apps, keyed by name
    #[serde(default)]
    pub apps: BTreeMap<String, AppSpec>,
    /// Local packages, keyed by name
    #[serde(default)]
    pub packages: BTreeMap<String, PackageSpec>,
}

/// An app and the packages it links
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AppSpec {
    #[serde(default = "default_app_description")]
    pub description: String,
    /// Required packages, in declaration order
    #[serde(default)]
    pub packages: Vec<String>,
    /// Ask the linker to maintain TypeScript path aliases
    #[serde(default, rename = "tsAlias")]
    pub ts_alias: bool,
    /// Pre-existing `tsconfig.json` contents
    #[serde(default)]
    pub tsconfig: Option<serde_json::Value>,
    /// Unrecognised keys, tolerated and ignored by the scaffolder
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A local package
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PackageSpec {
    #[serde(default = "default_package_description")]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: semver::Version,
    /// Source for `index.ts`; a stub is generated when absent
    #[serde(default)]
    pub code: Option<String>,
    /// package.json dependency mapping
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

fn default_project_description() -> String {
    "Test project".to_string()
}

fn default_app_description() -> String {
    "Test app".to_string()
}

fn default_package_description() -> String {
    "Test package".to_string()
}

fn default_version() -> semver::Version {
    semver::Version::new(1, 0, 0)
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: default_project_description(),
            apps: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }

    pub fn with_app(mut self, name: impl Into<String>, app: AppSpec) -> Self {
        self.apps.insert(name.into(), app);
        self
    }

    pub fn with_package(mut self, name: impl Into<String>, package: PackageSpec) -> Self {
        self.packages.insert(name.into(), package);
        self
    }

    /// Load a fixture description from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse fixture config: {}", e)))
    }
}

impl AppSpec {
    /// An app depending on `packages`, in order
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: default_app_description(),
            packages: packages.into_iter().map(Into::into).collect(),
            ts_alias: false,
            tsconfig: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Enable TypeScript aliases and seed a `tsconfig.json`
    pub fn with_ts_alias(mut self, tsconfig: serde_json::Value) -> Self {
        self.ts_alias = true;
        self.tsconfig = Some(tsconfig);
        self
    }
}

impl PackageSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            version: default_version(),
            code: None,
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: semver::Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }
}
