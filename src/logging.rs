use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TWIG_LOG=debug`
pub const LOG_ENV: &str = "TWIG_LOG";

/// Install the stderr subscriber. Defaults to `warn` when `TWIG_LOG` is
/// unset or unparsable. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
