//! tracing subscriber setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber. `filter` is a tracing-subscriber directive
/// such as `info` or `hyphae_lib=debug`; an invalid one falls back to `info`.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("[Log] Invalid filter '{}': {}, using 'info'", filter, e);
        EnvFilter::new("info")
    });

    // A second init (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
