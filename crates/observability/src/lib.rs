//! Process-wide tracing setup for binaries, tests and benches that embed the
//! engine. Library crates only emit events; installing a subscriber is the
//! host's call.

/// Initialize tracing with the `info` default filter.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Like [`init`], with `directives` used when `RUST_LOG` is unset.
pub fn init_with_default_filter(directives: &str) {
    tracing::init_with_default_filter(directives);
}

/// Subscriber configuration (filters, JSON formatting).
pub mod tracing;
