//! Tracing subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Default filter directive, honouring the verbose logging switch
pub fn default_directive(config: &Config) -> &'static str {
    if config.xwayland.verbose_logging {
        "area_xwayland=debug,info"
    } else {
        "area_xwayland=info,warn"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &Config) -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(config).into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
