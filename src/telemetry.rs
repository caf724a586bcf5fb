use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "claims_ledger=info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
/// Calling twice is harmless; the second install is ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
