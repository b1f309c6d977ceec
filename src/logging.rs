//! Log initialization for binaries and integration harnesses embedding the
//! engine. Libraries only emit `tracing` events; whoever owns `main` decides
//! the subscriber.

use tracing_subscriber::fmt;

const DEFAULT_FILTER: &str = "procurement_engine=info";

/// Installs a global `tracing` subscriber reading its filter from `RUST_LOG`,
/// falling back to engine-level info. Safe to call more than once; later
/// calls are no-ops.
pub fn init(json: bool) {
    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}
