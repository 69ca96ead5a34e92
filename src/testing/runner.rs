//! Suite runner
//!
//! Preflight, then every scenario in order, then cleanup, then the summary.
//! Scenario errors and panics are turned into failed outcomes here so that
//! one broken scenario never stops the run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use colored::Colorize;
use futures_util::FutureExt;

use super::cleanup::CleanupTracker;
use super::command::CommandRunner;
use super::report::{Reporter, TestOutcome};
use super::scenarios::{Scenario, ScenarioContext};
use crate::common::{Error, HarnessConfig, Result};

/// Run one scenario and convert whatever happens into a single outcome
pub async fn run_scenario(scenario: &dyn Scenario, ctx: &ScenarioContext<'_>) -> TestOutcome {
    let start = Instant::now();
    let result = AssertUnwindSafe(scenario.run(ctx)).catch_unwind().await;
    let duration = start.elapsed();

    match result {
        Ok(Ok(message)) => TestOutcome::pass(scenario.name(), message, duration),
        Ok(Err(e)) => TestOutcome::fail(scenario.name(), e.to_string(), duration),
        Err(panic) => {
            let err = Error::ScenarioPanicked(panic_message(panic.as_ref()));
            tracing::warn!("{} panicked: {}", scenario.name(), err);
            TestOutcome::fail(scenario.name(), err.to_string(), duration)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Check that the linker can be invoked at all
pub async fn preflight(runner: &CommandRunner, config: &HarnessConfig) -> Result<()> {
    let outcome = runner.preflight().await;
    if outcome.success() {
        tracing::info!("Using {}: {}", runner.program(), outcome.stdout.trim());
        return Ok(());
    }

    let location = match config.resolved_tool() {
        Some(path) => format!("found at {}", path.display()),
        None => "not found on PATH".to_string(),
    };
    let detail = match outcome.combined_output().trim() {
        "" => format!("--version exited with {}, {}", outcome.exit_code, location),
        output => format!("--version exited with {}: {}, {}", outcome.exit_code, output, location),
    };
    Err(Error::tool_unavailable(runner.program(), detail))
}

/// Run `scenarios` against the configured linker
///
/// Returns the reporter holding one outcome per scenario. Fails only when
/// the preflight check does, in which case no scenario runs. All fixtures
/// are removed before this returns, whichever way it returns.
pub async fn run_suite(
    config: &HarnessConfig,
    scenarios: Vec<Box<dyn Scenario>>,
) -> Result<Reporter> {
    let tracker = CleanupTracker::new(config.fixtures.prefix.clone());
    let scope = tracker.scope();
    let runner = CommandRunner::from_config(&config.tool, &config.timeouts);

    println!("{}", "Starting Knot Integration Tests...".blue().bold());
    println!("{}", "=".repeat(50));

    preflight(&runner, config).await?;

    let ctx = ScenarioContext {
        runner: &runner,
        tracker: &tracker,
        dependency_dir: &config.fixtures.dependency_dir,
        scale_packages: config.scale.package_count,
    };

    let mut reporter = Reporter::new();
    for scenario in &scenarios {
        println!("{} {}...", "Running".cyan(), scenario.description());
        let outcome = run_scenario(scenario.as_ref(), &ctx).await;
        if outcome.passed() {
            println!("  {} {}", "✓".green(), outcome.name());
        } else {
            println!("  {} {}", "✗".red(), outcome.name());
        }
        reporter.record(outcome);
    }

    let cleanup = scope.release();
    if !cleanup.failed.is_empty() {
        eprintln!(
            "{} {} fixture director{} could not be removed",
            "Warning:".yellow(),
            cleanup.failed.len(),
            if cleanup.failed.len() == 1 { "y" } else { "ies" }
        );
    }

    reporter.print_results();
    Ok(reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::command::CommandOutcome;
    use crate::testing::config::{AppSpec, PackageSpec, ProjectConfig};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Passing;
    struct Failing;
    struct Panicking;

    /// Scaffolds a fixture, remembers its root, then fails
    struct Scaffolding {
        root: Arc<Mutex<Option<PathBuf>>>,
    }

    #[async_trait]
    impl Scenario for Passing {
        fn name(&self) -> &'static str {
            "Passing"
        }
        fn description(&self) -> &'static str {
            "always passes"
        }
        async fn run(&self, _ctx: &ScenarioContext<'_>) -> Result<String> {
            Ok("fine".to_string())
        }
    }

    #[async_trait]
    impl Scenario for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }
        fn description(&self) -> &'static str {
            "always fails"
        }
        async fn run(&self, _ctx: &ScenarioContext<'_>) -> Result<String> {
            Err(Error::assertion("expected failure"))
        }
    }

    #[async_trait]
    impl Scenario for Panicking {
        fn name(&self) -> &'static str {
            "Panicking"
        }
        fn description(&self) -> &'static str {
            "always panics"
        }
        async fn run(&self, _ctx: &ScenarioContext<'_>) -> Result<String> {
            panic!("scenario exploded")
        }
    }

    #[async_trait]
    impl Scenario for Scaffolding {
        fn name(&self) -> &'static str {
            "Scaffolding"
        }
        fn description(&self) -> &'static str {
            "scaffolds then fails"
        }
        async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<String> {
            let config = ProjectConfig::new("Scratch")
                .with_app("app", AppSpec::new(["pkg"]))
                .with_package("pkg", PackageSpec::new("Scratch package"));
            let fixture = ctx.scaffold("scratch", &config)?;
            *self.root.lock().unwrap() = Some(fixture.root().to_path_buf());
            let outcome: CommandOutcome = ctx.knot(&fixture, &["link"]).await;
            Err(Error::assertion(format!("linker exited with {}", outcome.exit_code)))
        }
    }

    fn context<'a>(runner: &'a CommandRunner, tracker: &'a CleanupTracker) -> ScenarioContext<'a> {
        ScenarioContext {
            runner,
            tracker,
            dependency_dir: "knot_packages",
            scale_packages: 3,
        }
    }

    fn true_runner() -> CommandRunner {
        CommandRunner::new("true", Vec::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_boundary_converts_results() {
        let runner = true_runner();
        let tracker = CleanupTracker::new("knot_test");
        let ctx = context(&runner, &tracker);

        let pass = run_scenario(&Passing, &ctx).await;
        assert!(pass.passed());
        assert_eq!(pass.message(), "fine");

        let fail = run_scenario(&Failing, &ctx).await;
        assert!(!fail.passed());
        assert_eq!(fail.message(), "expected failure");
    }

    #[tokio::test]
    async fn test_boundary_catches_panics() {
        let runner = true_runner();
        let tracker = CleanupTracker::new("knot_test");
        let ctx = context(&runner, &tracker);

        let outcome = run_scenario(&Panicking, &ctx).await;
        assert!(!outcome.passed());
        assert_eq!(outcome.name(), "Panicking");
        assert!(outcome.message().contains("scenario exploded"));
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_suite_records_one_outcome_per_scenario_and_cleans_up() {
        let mut config = HarnessConfig::default();
        config.tool.program = "true".to_string();

        let root = Arc::new(Mutex::new(None));
        let scenarios: Vec<Box<dyn Scenario>> = vec![
            Box::new(Passing),
            Box::new(Panicking),
            Box::new(Scaffolding { root: Arc::clone(&root) }),
            Box::new(Failing),
        ];

        let reporter = run_suite(&config, scenarios).await.unwrap();

        let fixture_root = root.lock().unwrap().clone().expect("fixture was scaffolded");
        assert!(!fixture_root.exists(), "{} survived the run", fixture_root.display());

        let names: Vec<_> = reporter.outcomes().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["Passing", "Panicking", "Scaffolding", "Failing"]);
        let summary = reporter.summary();
        assert_eq!((summary.total, summary.passed, summary.failed), (4, 1, 3));
    }

    #[tokio::test]
    async fn test_preflight_failure_runs_nothing() {
        let mut config = HarnessConfig::default();
        config.tool.program = "definitely-not-a-real-knot-binary".to_string();

        let err = run_suite(&config, vec![Box::new(Passing)]).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("not found on PATH"));
    }
}
