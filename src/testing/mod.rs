//! Integration-test harness for the knot linker
//!
//! Scaffolds disposable workspaces, runs the linker against them with a
//! bounded command runner, and checks the resulting filesystem state and
//! diagnostics. Every fixture is removed at the end of the run.

pub mod cleanup;
pub mod command;
mod config;
pub mod fixture;
pub mod report;
mod runner;
pub mod scenarios;

pub use cleanup::{CleanupReport, CleanupScope, CleanupTracker};
pub use command::{run_command, CommandOutcome, CommandRunner, LAUNCH_FAILURE_CODE};
pub use config::*;
pub use fixture::{materialize, render, write_files, Fixture, FixtureFile};
pub use report::{Reporter, Summary, TestOutcome};
pub use runner::{preflight, run_scenario, run_suite};
pub use scenarios::{registry, select, Scenario, ScenarioContext};
