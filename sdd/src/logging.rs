//! Diagnostic tracing for the `sdd` binary.
//!
//! Tracing output goes to stderr and is controlled by `RUST_LOG`. It is
//! separate from the run log under the temp dir, which is always written.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `warn`, or `info` for this
/// crate when `verbose` is on.
///
/// # Example
/// ```bash
/// RUST_LOG=sdd=debug sdd generate spec.md
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,sdd=info" } else { "warn" })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
