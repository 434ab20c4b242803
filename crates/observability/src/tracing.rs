//! JSON log output filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

pub fn init() {
    init_with_default_filter(DEFAULT_FILTER);
}

/// Install the global subscriber. `RUST_LOG` wins over `directives`; an
/// unparsable fallback degrades to [`DEFAULT_FILTER`].
pub fn init_with_default_filter(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Batch and row ids travel as structured fields; the target adds nothing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
