//! Bounded command execution
//!
//! Runs the linker as a subprocess and always hands back a [`CommandOutcome`].
//! Launch failures and timeouts are folded into the outcome; nothing here
//! returns an error.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::common::config::{Timeouts, ToolConfig};

/// Exit code reported when the command could not run or timed out
pub const LAUNCH_FAILURE_CODE: i32 = -1;

/// Captured result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    /// Outcome for a command that never produced an exit status
    pub fn launch_failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: LAUNCH_FAILURE_CODE,
            stdout: String::new(),
            stderr: message.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stderr followed by stdout
    pub fn combined_output(&self) -> String {
        let mut combined = self.stderr.clone();
        if !combined.is_empty() && !self.stdout.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&self.stdout);
        combined
    }
}

/// Run `program` with `args` in `cwd`, bounded by `limit`
pub async fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    limit: Duration,
) -> CommandOutcome {
    tracing::debug!("Running {} {:?} in {:?}", program, args, cwd);

    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("Failed to launch {}: {}", program, e);
            return CommandOutcome::launch_failure(format!("Failed to run '{}': {}", program, e));
        }
    };

    // Dropping the wait future on timeout drops the child, which kills it
    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => CommandOutcome {
            exit_code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Ok(Err(e)) => CommandOutcome::launch_failure(format!(
            "Failed to collect output of '{}': {}",
            program, e
        )),
        Err(_) => {
            tracing::warn!("{} {:?} timed out after {:?}", program, args, limit);
            CommandOutcome::launch_failure(format!(
                "Command timed out after {} seconds",
                limit.as_secs_f64()
            ))
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    LAUNCH_FAILURE_CODE
}

/// Runs the configured linker
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    base_args: Vec<String>,
    limit: Duration,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, base_args: Vec<String>, limit: Duration) -> Self {
        Self {
            program: program.into(),
            base_args,
            limit,
        }
    }

    pub fn from_config(tool: &ToolConfig, timeouts: &Timeouts) -> Self {
        Self::new(tool.program.clone(), tool.args.clone(), timeouts.command())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.limit
    }

    /// Invoke the tool with `args` after any configured leading arguments
    pub async fn run(&self, args: &[&str], cwd: Option<&Path>) -> CommandOutcome {
        let argv: Vec<String> = self
            .base_args
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string()))
            .collect();
        run_command(&self.program, &argv, cwd, self.limit).await
    }

    /// Availability check run once before any scenario
    pub async fn preflight(&self) -> CommandOutcome {
        self.run(&["--version"], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams_and_exit_code() {
        let outcome = run_command(
            "sh",
            &sh("echo out; echo err >&2; exit 3"),
            None,
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
        assert!(!outcome.success());
        assert_eq!(outcome.combined_output(), "err\nout\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let outcome = run_command("sh", &sh("ls"), Some(dir.path()), Duration::from_secs(10)).await;
        assert!(outcome.success());
        assert!(outcome.stdout.contains("marker"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_returns_sentinel_within_bound() {
        let start = Instant::now();
        let outcome = run_command("sh", &sh("sleep 30"), None, Duration::from_millis(300)).await;
        let elapsed = start.elapsed();

        assert_eq!(outcome.exit_code, LAUNCH_FAILURE_CODE);
        assert!(outcome.stderr.contains("timed out"), "stderr: {}", outcome.stderr);
        assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_missing_program_becomes_outcome() {
        let outcome = run_command(
            "definitely-not-a-real-knot-binary",
            &[],
            None,
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.exit_code, LAUNCH_FAILURE_CODE);
        assert!(outcome.stderr.contains("definitely-not-a-real-knot-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_exit_is_not_sentinel() {
        let outcome = run_command("sh", &sh("kill -9 $$"), None, Duration::from_secs(10)).await;
        assert_eq!(outcome.exit_code, 128 + 9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_prepends_base_args() {
        let runner = CommandRunner::new("sh", sh("echo \"$@\""), Duration::from_secs(10));
        // With `sh -c script`, the first extra argument becomes $0
        let outcome = runner.run(&["argv0", "link", "--symlink"], None).await;
        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "link --symlink");
    }

    #[test]
    fn test_combined_output_without_stderr() {
        let outcome = CommandOutcome {
            exit_code: 0,
            stdout: "linked".into(),
            stderr: String::new(),
        };
        assert_eq!(outcome.combined_output(), "linked");
        assert!(outcome.success());
    }
}
