use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr log subscriber used by the binaries.
///
/// `RUST_LOG` overrides the default level, which is `info`, or `warn` when
/// `quiet` is set. Logs go to stderr so stdout only carries results.
pub fn init_logging(quiet: bool) {
    let log_level = if quiet { "warn" } else { "info" };

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .try_init();
}
