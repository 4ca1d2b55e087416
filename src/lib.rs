pub mod api;
pub mod core;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global `fmt` subscriber once; `RUST_LOG` overrides the
/// default `payoff=info` filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("payoff=info"));
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
