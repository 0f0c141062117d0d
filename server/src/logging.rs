use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "numbrush_server=info,tower_http=info";

/// Installs the stdout logger. `RUST_LOG` overrides the default filter.
pub fn init() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::Registry::default()
        .with(fmt::Layer::new().with_target(false).with_filter(filter));
    tracing::subscriber::set_global_default(subscriber)
}
