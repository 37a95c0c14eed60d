//! Tracing setup for the CLI.
//!
//! Logs go to stderr; stdout is reserved for JSON output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "TRENDLINE_LOG";

/// Filter precedence: `TRENDLINE_LOG`, then `RUST_LOG`, then `warn`
/// (`debug` for our crates with `--verbose`).
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "warn,trendline_ingest=debug,trendline_llm=debug,trendline=debug"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
