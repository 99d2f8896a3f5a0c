use std::env;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "warn,folio=info";

/// Logs to stderr. `FOLIO_LOG` wins over `RUST_LOG`; without either, only
/// warnings and the folio crates' info lines are shown.
pub fn init() -> Result<()> {
    let filter = match env::var("FOLIO_LOG") {
        Ok(directives) => EnvFilter::try_new(directives)?,
        Err(_) => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVES))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
}
