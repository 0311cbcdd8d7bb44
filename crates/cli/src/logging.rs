use tracing_subscriber::{fmt, EnvFilter};

use crate::config::TallyConfig;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the config file's `[log] filter`; `--quiet` limits
/// output to errors.
pub(crate) fn init(config: &TallyConfig, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
