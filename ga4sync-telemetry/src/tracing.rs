use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Guards against double installation of the global subscriber.
//
// `init_tracing` is called once during normal operation, but tests that spin
// up pipeline pieces may call it from several test functions in the same
// process, and a second `init` on the registry would panic.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for a binary.
///
/// The filter comes from `RUST_LOG` when set; otherwise every crate logs at
/// `info` and `bin_name` logs at `debug`. Subsequent calls are no-ops.
pub fn init_tracing(bin_name: &str) {
    INIT.call_once(|| {
        // Tracing targets use the crate name, so a binary called
        // `ga4sync-loader` logs under `ga4sync_loader`.
        let default_filter = format!("info,{}=debug", bin_name.replace('-', "_"));

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_filter)),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
