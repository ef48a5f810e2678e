//! One entry point so every binary in the workspace configures
//! structured logging the same way.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Installs a global `tracing` subscriber reading `NODE_LOG` for the
/// filter directive (falls back to `info`). Safe to call more than
/// once; only the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("NODE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(true).init();
    });
}

pub use tracing::{debug, error, info, trace, warn};
