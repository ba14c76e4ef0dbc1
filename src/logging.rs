//! Diagnostics go to stderr only; stdout belongs to the statusline.

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "CC_STATUSLINE_LOG";

/// Install the stderr subscriber. Without `debug` and without a
/// `CC_STATUSLINE_LOG` filter no subscriber is installed and every event is
/// dropped.
pub fn init_logging(debug: bool) {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) if debug => EnvFilter::new("cc_statusline=debug"),
        Err(_) => return,
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
