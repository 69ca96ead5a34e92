//! Fixture scaffolding
//!
//! Rendering a [`ProjectConfig`] into files is a pure step ([`render`]);
//! writing them out is separate ([`write_files`]), so the manifest layout can
//! be checked without touching the filesystem.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::cleanup::CleanupTracker;
use super::config::{AppSpec, PackageSpec, ProjectConfig};
use crate::common::{Error, Result};

/// Workspace manifest file name
pub const WORKSPACE_MANIFEST: &str = "knot.yml";
/// Per-app manifest file name
pub const APP_MANIFEST: &str = "app.yml";
/// Compiler config the linker rewrites when aliases are enabled
pub const TSCONFIG: &str = "tsconfig.json";

const PACKAGE_JSON: &str = "package.json";
const PACKAGE_ENTRY: &str = "index.ts";

/// One file of a rendered fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    /// Path relative to the fixture root
    pub path: PathBuf,
    pub contents: String,
}

/// A materialized fixture tree
#[derive(Debug, Clone)]
pub struct Fixture {
    root: PathBuf,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.root.join("apps").join(app)
    }

    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.root.join("packages").join(package)
    }

    /// Where the linker places an app's packages
    pub fn dependency_dir(&self, app: &str, dir_name: &str) -> PathBuf {
        self.app_dir(app).join(dir_name)
    }
}

// Manifest schemas. Field order is the serialized order.

#[derive(Serialize)]
struct WorkspaceManifest<'a> {
    name: &'a str,
    description: &'a str,
    apps: BTreeMap<&'a str, WorkspaceApp<'a>>,
    packages: BTreeMap<&'a str, WorkspacePackage<'a>>,
}

#[derive(Serialize)]
struct WorkspaceApp<'a> {
    description: &'a str,
    packages: &'a [String],
    #[serde(rename = "tsAlias", skip_serializing_if = "std::ops::Not::not")]
    ts_alias: bool,
}

#[derive(Serialize)]
struct WorkspacePackage<'a> {
    description: &'a str,
}

#[derive(Serialize)]
struct AppManifest<'a> {
    name: &'a str,
    description: &'a str,
    packages: &'a [String],
    #[serde(rename = "tsAlias", skip_serializing_if = "std::ops::Not::not")]
    ts_alias: bool,
}

#[derive(Serialize)]
struct PackageJson<'a> {
    name: &'a str,
    version: String,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    main: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<&'a BTreeMap<String, String>>,
}

/// Render a project config into the files of its fixture
pub fn render(config: &ProjectConfig) -> Result<Vec<FixtureFile>> {
    let mut files = Vec::new();

    let workspace = WorkspaceManifest {
        name: &config.name,
        description: &config.description,
        apps: config
            .apps
            .iter()
            .map(|(name, app)| {
                (
                    name.as_str(),
                    WorkspaceApp {
                        description: &app.description,
                        packages: &app.packages,
                        ts_alias: app.ts_alias,
                    },
                )
            })
            .collect(),
        packages: config
            .packages
            .iter()
            .map(|(name, pkg)| {
                (
                    name.as_str(),
                    WorkspacePackage {
                        description: &pkg.description,
                    },
                )
            })
            .collect(),
    };
    files.push(FixtureFile {
        path: PathBuf::from(WORKSPACE_MANIFEST),
        contents: serde_yaml::to_string(&workspace)?,
    });

    for (name, package) in &config.packages {
        files.extend(render_package(name, package)?);
    }
    for (name, app) in &config.apps {
        files.extend(render_app(name, app)?);
    }

    Ok(files)
}

fn render_package(name: &str, package: &PackageSpec) -> Result<[FixtureFile; 2]> {
    let dir = Path::new("packages").join(name);
    let manifest = PackageJson {
        name,
        version: package.version.to_string(),
        description: &package.description,
        main: Some(PACKAGE_ENTRY),
        dependencies: Some(&package.dependencies).filter(|deps| !deps.is_empty()),
    };
    let source = package
        .code
        .clone()
        .unwrap_or_else(|| default_source(name));

    Ok([
        FixtureFile {
            path: dir.join(PACKAGE_JSON),
            contents: to_json(&manifest)?,
        },
        FixtureFile {
            path: dir.join(PACKAGE_ENTRY),
            contents: source,
        },
    ])
}

fn render_app(name: &str, app: &AppSpec) -> Result<Vec<FixtureFile>> {
    let dir = Path::new("apps").join(name);
    let manifest = AppManifest {
        name,
        description: &app.description,
        packages: &app.packages,
        ts_alias: app.ts_alias,
    };
    let package_json = PackageJson {
        name,
        version: "1.0.0".to_string(),
        description: &app.description,
        main: None,
        dependencies: None,
    };

    let mut files = vec![
        FixtureFile {
            path: dir.join(APP_MANIFEST),
            contents: serde_yaml::to_string(&manifest)?,
        },
        FixtureFile {
            path: dir.join(PACKAGE_JSON),
            contents: to_json(&package_json)?,
        },
    ];
    if let Some(tsconfig) = &app.tsconfig {
        files.push(FixtureFile {
            path: dir.join(TSCONFIG),
            contents: to_json(tsconfig)?,
        });
    }
    Ok(files)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Stub module exporting a function named after the package
pub fn default_source(package: &str) -> String {
    format!(
        "export const {}Function = () => \"Hello from {}!\";\n",
        stub_identifier(package),
        package
    )
}

/// Turn a package name into a JavaScript identifier, one name per identifier
///
/// ASCII letters and digits pass through, `_` doubles to `__` and any other
/// character becomes `_<hex code point>_`, so `package-1` is `package_2d_1`
/// while `package1` stays `package1`. A leading digit gets a `$` prefix.
pub fn stub_identifier(package: &str) -> String {
    let mut ident = String::with_capacity(package.len());
    for c in package.chars() {
        match c {
            c if c.is_ascii_alphanumeric() => ident.push(c),
            '_' => ident.push_str("__"),
            c => ident.push_str(&format!("_{:x}_", u32::from(c))),
        }
    }
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '$');
    }
    ident
}

/// Write rendered files below `root`, creating directories as needed
pub fn write_files(root: &Path, files: &[FixtureFile]) -> Result<()> {
    for file in files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &file.contents)?;
    }
    Ok(())
}

/// Create a tracked temporary root and scaffold `config` into it
///
/// The root is registered with `tracker` before any file is written.
pub fn materialize(
    config: &ProjectConfig,
    tracker: &CleanupTracker,
    label: &str,
) -> Result<Fixture> {
    let files = render(config).map_err(|e| Error::fixture(label, e))?;
    let root = tracker.create_root(label).map_err(|e| Error::fixture(label, e))?;
    write_files(&root, &files).map_err(|e| Error::fixture(label, e))?;
    tracing::debug!("Scaffolded {} file(s) into {}", files.len(), root.display());
    Ok(Fixture { root })
}
