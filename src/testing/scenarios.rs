//! Linker verification scenarios
//!
//! Each scenario scaffolds its own fixture, invokes the linker against it and
//! checks concrete filesystem or output postconditions. `Ok(message)` is a
//! pass; any error is a failure whose text is shown in the report.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use super::cleanup::CleanupTracker;
use super::command::{CommandOutcome, CommandRunner};
use super::config::{AppSpec, PackageSpec, ProjectConfig};
use super::fixture::{self, Fixture, TSCONFIG};
use crate::common::{Error, Result};

/// Everything a scenario may use
pub struct ScenarioContext<'a> {
    pub runner: &'a CommandRunner,
    pub tracker: &'a CleanupTracker,
    /// Directory the linker creates inside each app
    pub dependency_dir: &'a str,
    /// Package count for the scale scenario
    pub scale_packages: usize,
}

impl ScenarioContext<'_> {
    /// Scaffold a tracked fixture
    pub fn scaffold(&self, label: &str, config: &ProjectConfig) -> Result<Fixture> {
        fixture::materialize(config, self.tracker, label)
    }

    /// Run the linker in the fixture root
    pub async fn knot(&self, fixture: &Fixture, args: &[&str]) -> CommandOutcome {
        self.runner.run(args, Some(fixture.root())).await
    }

    pub fn deps(&self, fixture: &Fixture, app: &str) -> std::path::PathBuf {
        fixture.dependency_dir(app, self.dependency_dir)
    }
}

/// A self-verifying linker scenario
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Short name used in the report
    fn name(&self) -> &'static str;

    /// One-line description printed while running
    fn description(&self) -> &'static str;

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String>;
}

/// All scenarios, in execution order
pub fn registry() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(BasicLinking),
        Box::new(SymlinkMode),
        Box::new(MultiAppLinking),
        Box::new(MissingPackage),
        Box::new(TypeScriptAliases),
        Box::new(LargeProject),
        Box::new(Relink),
    ]
}

/// Keep scenarios whose name matches one of `names`, case-insensitively
///
/// Registered order is preserved. An empty filter keeps everything.
pub fn select(scenarios: Vec<Box<dyn Scenario>>, names: &[String]) -> Vec<Box<dyn Scenario>> {
    if names.is_empty() {
        return scenarios;
    }
    scenarios
        .into_iter()
        .filter(|s| names.iter().any(|n| n.eq_ignore_ascii_case(s.name())))
        .collect()
}

fn require_success(outcome: &CommandOutcome) -> Result<()> {
    if outcome.success() {
        Ok(())
    } else {
        Err(Error::command_failed(outcome.exit_code, &outcome.stderr))
    }
}

/// Names of the entries in a dependency directory
fn linked_entries(dir: &Path) -> Result<BTreeSet<String>> {
    if !dir.is_dir() {
        return Err(Error::assertion(format!(
            "Dependency directory {} was not created",
            dir.display()
        )));
    }
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        names.insert(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn expect_exact(dir: &Path, app: &str, declared: &[&str]) -> Result<()> {
    let found = linked_entries(dir)?;
    let expected: BTreeSet<String> = declared.iter().map(|s| s.to_string()).collect();
    if found != expected {
        return Err(Error::assertion(format!(
            "App '{}' expected packages {:?}, found {:?}",
            app, expected, found
        )));
    }
    Ok(())
}

/// Two packages copied into one app
pub struct BasicLinking;

#[async_trait]
impl Scenario for BasicLinking {
    fn name(&self) -> &'static str {
        "Basic Linking"
    }

    fn description(&self) -> &'static str {
        "Basic local package linking"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let config = ProjectConfig::new("Basic Linking Test")
            .with_app("test-app", AppSpec::new(["utils", "helpers"]))
            .with_package("utils", PackageSpec::new("Utility functions"))
            .with_package("helpers", PackageSpec::new("Helper functions"));
        let fixture = ctx.scaffold("basic_linking", &config)?;

        let outcome = ctx.knot(&fixture, &["link"]).await;
        require_success(&outcome)?;

        let deps = ctx.deps(&fixture, "test-app");
        let missing: Vec<_> = ["utils", "helpers"]
            .into_iter()
            .filter(|p| !deps.join(p).exists())
            .collect();
        if !missing.is_empty() {
            return Err(Error::assertion(format!(
                "Packages not found in {}: {}",
                ctx.dependency_dir,
                missing.join(", ")
            )));
        }
        Ok("Both packages linked successfully".to_string())
    }
}

/// `link --symlink` produces links instead of copies
pub struct SymlinkMode;

#[async_trait]
impl Scenario for SymlinkMode {
    fn name(&self) -> &'static str {
        "Symlink Mode"
    }

    fn description(&self) -> &'static str {
        "Symlink mode linking"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let config = ProjectConfig::new("Symlink Test")
            .with_app("test-app", AppSpec::new(["utils"]))
            .with_package("utils", PackageSpec::new("Utility functions"));
        let fixture = ctx.scaffold("symlink_test", &config)?;

        let outcome = ctx.knot(&fixture, &["link", "--symlink"]).await;
        require_success(&outcome)?;

        let entry = ctx.deps(&fixture, "test-app").join("utils");
        match std::fs::symlink_metadata(&entry) {
            Ok(meta) if meta.file_type().is_symlink() => {
                Ok("Symlink created successfully".to_string())
            }
            Ok(_) => Err(Error::assertion("Symlink not created: entry is a copy")),
            Err(_) => Err(Error::assertion("Symlink not created: entry missing")),
        }
    }
}

/// Overlapping package sets across two apps
pub struct MultiAppLinking;

#[async_trait]
impl Scenario for MultiAppLinking {
    fn name(&self) -> &'static str {
        "Multi-App Linking"
    }

    fn description(&self) -> &'static str {
        "Multiple apps with different dependencies"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let apps: [(&str, [&str; 2]); 2] = [
            ("frontend", ["ui-components", "utils"]),
            ("backend", ["database", "utils"]),
        ];
        let config = ProjectConfig::new("Multi-App Test")
            .with_app(apps[0].0, AppSpec::new(apps[0].1))
            .with_app(apps[1].0, AppSpec::new(apps[1].1))
            .with_package("ui-components", PackageSpec::new("UI components"))
            .with_package("utils", PackageSpec::new("Shared utilities"))
            .with_package("database", PackageSpec::new("Database helpers"));
        let fixture = ctx.scaffold("multi_app", &config)?;

        let outcome = ctx.knot(&fixture, &["link"]).await;
        require_success(&outcome)?;

        for (app, packages) in &apps {
            expect_exact(&ctx.deps(&fixture, app), app, packages)?;
        }
        Ok("All apps have correct dependencies".to_string())
    }
}

/// A declared package with no definition must be reported
pub struct MissingPackage;

const NOT_FOUND_PHRASES: [&str; 2] = ["does not exist", "not found"];

#[async_trait]
impl Scenario for MissingPackage {
    fn name(&self) -> &'static str {
        "Missing Package Error"
    }

    fn description(&self) -> &'static str {
        "Missing package error handling"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let config = ProjectConfig::new("Missing Package Test")
            .with_app("test-app", AppSpec::new(["utils", "nonexistent"]))
            .with_package("utils", PackageSpec::new("Utility functions"));
        let fixture = ctx.scaffold("missing_package", &config)?;

        let outcome = ctx.knot(&fixture, &["link"]).await;
        if outcome.success() {
            return Err(Error::assertion("Command should have failed but didn't"));
        }

        let output = outcome.combined_output();
        let lowered = output.to_lowercase();
        let reports_missing = NOT_FOUND_PHRASES.iter().any(|p| lowered.contains(p));
        if lowered.contains("nonexistent") && reports_missing {
            Ok("Proper error message for missing package".to_string())
        } else {
            Err(Error::assertion(format!(
                "Unclear error message: {}",
                output.trim()
            )))
        }
    }
}

/// tsAlias rewrites the app's tsconfig paths
pub struct TypeScriptAliases;

#[async_trait]
impl Scenario for TypeScriptAliases {
    fn name(&self) -> &'static str {
        "TypeScript Aliases"
    }

    fn description(&self) -> &'static str {
        "TypeScript alias configuration"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let tsconfig = json!({
            "compilerOptions": {
                "target": "ES2020",
                "module": "commonjs",
                "strict": true
            }
        });
        let config = ProjectConfig::new("TypeScript Aliases Test")
            .with_app("ts-app", AppSpec::new(["utils"]).with_ts_alias(tsconfig))
            .with_package("utils", PackageSpec::new("Utility functions"));
        let fixture = ctx.scaffold("typescript_aliases", &config)?;

        let outcome = ctx.knot(&fixture, &["link"]).await;
        require_success(&outcome)?;

        let path = fixture.app_dir("ts-app").join(TSCONFIG);
        let updated: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let paths = updated
            .get("compilerOptions")
            .and_then(|c| c.get("paths"))
            .and_then(|p| p.as_object())
            .ok_or_else(|| Error::assertion("tsconfig.json not updated with paths"))?;

        let references_utils = paths
            .iter()
            .any(|(alias, target)| alias.contains("utils") || target.to_string().contains("utils"));
        if !references_utils {
            return Err(Error::assertion(format!(
                "tsconfig.json paths do not reference utils: {}",
                serde_json::Value::Object(paths.clone())
            )));
        }
        Ok("tsconfig.json updated with paths".to_string())
    }
}

/// Many packages into one app
pub struct LargeProject;

#[async_trait]
impl Scenario for LargeProject {
    fn name(&self) -> &'static str {
        "Large Project Performance"
    }

    fn description(&self) -> &'static str {
        "Performance with many packages"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let count = ctx.scale_packages;
        let names: Vec<String> = (0..count).map(|i| format!("package-{}", i)).collect();

        let mut config = ProjectConfig::new("Large Project Test")
            .with_app("large-app", AppSpec::new(names.iter().cloned()));
        for (i, name) in names.iter().enumerate() {
            config = config.with_package(name.clone(), PackageSpec::new(format!("Package {}", i)));
        }
        let fixture = ctx.scaffold("large_project", &config)?;

        let link_start = Instant::now();
        let outcome = ctx.knot(&fixture, &["link"]).await;
        let link_duration = link_start.elapsed();
        require_success(&outcome)?;

        let deps = ctx.deps(&fixture, "large-app");
        let entries = linked_entries(&deps)?;
        let linked = entries.iter().filter(|name| deps.join(name).is_dir()).count();
        if linked != count || entries.len() != count {
            return Err(Error::assertion(format!(
                "Expected {} packages, found {} ({} directories)",
                count,
                entries.len(),
                linked
            )));
        }
        Ok(format!(
            "Linked {} packages in {:.2}s",
            count,
            link_duration.as_secs_f64()
        ))
    }
}

/// A second `link` replaces the previous dependency directory
pub struct Relink;

#[async_trait]
impl Scenario for Relink {
    fn name(&self) -> &'static str {
        "Relink Replaces Dependencies"
    }

    fn description(&self) -> &'static str {
        "Relinking replaces symlinks with copies"
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
        let config = ProjectConfig::new("Relink Test")
            .with_app("test-app", AppSpec::new(["utils", "helpers"]))
            .with_package("utils", PackageSpec::new("Utility functions"))
            .with_package("helpers", PackageSpec::new("Helper functions"));
        let fixture = ctx.scaffold("relink", &config)?;

        require_success(&ctx.knot(&fixture, &["link", "--symlink"]).await)?;
        require_success(&ctx.knot(&fixture, &["link"]).await)?;

        let deps = ctx.deps(&fixture, "test-app");
        expect_exact(&deps, "test-app", &["utils", "helpers"])?;
        for package in ["utils", "helpers"] {
            expect_copied(&deps, package)?;
        }
        Ok("Second link replaced symlinks with copies".to_string())
    }
}

/// `deps/<package>` must be a real directory, not a symlink or a plain file
fn expect_copied(deps: &Path, package: &str) -> Result<()> {
    let meta = std::fs::symlink_metadata(deps.join(package))?;
    if meta.file_type().is_symlink() {
        Err(Error::assertion(format!(
            "'{}' is still a symlink after relinking",
            package
        )))
    } else if !meta.is_dir() {
        Err(Error::assertion(format!(
            "'{}' is not a directory after relinking",
            package
        )))
    } else {
        Ok(())
    }
}
