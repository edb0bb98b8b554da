//! Progress logging for backup runs.
//!
//! Events go to stderr. `RUST_LOG` overrides the level from the command line;
//! an unparsable level falls back to `info` and says so once logging is up.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

pub fn init(level: &str) -> anyhow::Result<()> {
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(from_env) => (from_env, None),
        Err(_) => match EnvFilter::try_new(level) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(FALLBACK_LEVEL), Some(e)),
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;

    if let Some(e) = rejected {
        tracing::warn!("Invalid log level {:?} ({}), using {}", level, e, FALLBACK_LEVEL);
    }

    Ok(())
}
