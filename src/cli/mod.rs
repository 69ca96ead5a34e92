//! CLI command handling
//!
//! Dispatches CLI commands to the harness and maps results to exit codes.

use std::path::Path;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::{Error, HarnessConfig, Result};
use crate::testing::{self, fixture, ProjectConfig};

/// Every selected scenario passed
pub const EXIT_SUCCESS: i32 = 0;
/// At least one scenario failed, or the harness itself errored
pub const EXIT_FAILURE: i32 = 1;
/// The linker could not be run, so no scenario ran
pub const EXIT_TOOL_UNAVAILABLE: i32 = 2;

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            config,
            tool,
            tool_args,
            timeout,
            only,
            verbose: _,
        } => {
            let mut harness = HarnessConfig::load(config.as_deref())?;
            if let Some(tool) = tool {
                harness.tool.program = tool;
            }
            if !tool_args.is_empty() {
                harness.tool.args = tool_args;
            }
            if let Some(secs) = timeout {
                if secs == 0 {
                    return Err(Error::Config("--timeout must be at least 1".to_string()));
                }
                harness.timeouts.command_secs = secs;
            }

            let scenarios = testing::select(testing::registry(), &only);
            if scenarios.is_empty() {
                return Err(Error::Config(format!(
                    "No scenario matches {:?}. Use 'knot-integration list' to see the names",
                    only
                )));
            }

            match testing::run_suite(&harness, scenarios).await {
                Ok(reporter) if reporter.summary().all_passed() => Ok(EXIT_SUCCESS),
                Ok(_) => Ok(EXIT_FAILURE),
                Err(e) if e.is_fatal() => {
                    println!("{} {}", "✗".red().bold(), e);
                    Ok(EXIT_TOOL_UNAVAILABLE)
                }
                Err(e) => Err(e),
            }
        }

        Commands::List => {
            for (i, scenario) in testing::registry().iter().enumerate() {
                println!(
                    "{:>2}. {} - {}",
                    i + 1,
                    scenario.name().bold(),
                    scenario.description().dimmed()
                );
            }
            Ok(EXIT_SUCCESS)
        }

        Commands::Scaffold { config, out } => {
            let project = ProjectConfig::from_yaml_file(&config)?;
            scaffold_into(&project, &out)?;
            println!("Scaffolded '{}' into {}", project.name, out.display());
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Render `project` into a user-owned directory
fn scaffold_into(project: &ProjectConfig, out: &Path) -> Result<()> {
    if out.exists() && std::fs::read_dir(out)?.next().is_some() {
        return Err(Error::Config(format!(
            "Output directory {} is not empty",
            out.display()
        )));
    }
    let files = fixture::render(project)?;
    std::fs::create_dir_all(out)?;
    fixture::write_files(out, &files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AppSpec, PackageSpec};

    fn project() -> ProjectConfig {
        ProjectConfig::new("Scaffold")
            .with_app("web", AppSpec::new(["utils"]))
            .with_package("utils", PackageSpec::new("Utility functions"))
    }

    #[test]
    fn test_scaffold_into_new_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("workspace");
        scaffold_into(&project(), &out).unwrap();
        assert!(out.join("knot.yml").is_file());
        assert!(out.join("apps/web/app.yml").is_file());
        assert!(out.join("packages/utils/index.ts").is_file());
    }

    #[test]
    fn test_scaffold_refuses_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), "mine").unwrap();
        let err = scaffold_into(&project(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!dir.path().join("knot.yml").exists());
    }

    #[tokio::test]
    async fn test_run_with_unknown_filter_is_an_error() {
        let err = dispatch(Commands::Run {
            config: None,
            tool: Some("true".to_string()),
            tool_args: Vec::new(),
            timeout: None,
            only: vec!["No Such Scenario".to_string()],
            verbose: false,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No Such Scenario"));
    }

    #[tokio::test]
    async fn test_run_without_tool_exits_with_tool_unavailable() {
        let code = dispatch(Commands::Run {
            config: None,
            tool: Some("definitely-not-a-real-knot-binary".to_string()),
            tool_args: Vec::new(),
            timeout: Some(5),
            only: Vec::new(),
            verbose: false,
        })
        .await
        .unwrap();
        assert_eq!(code, EXIT_TOOL_UNAVAILABLE);
    }
}
