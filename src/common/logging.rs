//! Logging and tracing configuration
//!
//! Diagnostics go to stderr so they never interleave with the report
//! printed on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "knot_harness=debug,warn"
    } else {
        "knot_harness=warn"
    }
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// `verbose` raises the default for this crate from WARN to DEBUG.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for verbose in [false, true] {
            assert!(default_filter(verbose).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_cli(false);
        init_cli(true);
    }
}
