/// Install a fmt subscriber. `RUST_LOG` wins over `default_filter` when set.
/// Safe to call more than once; only the first call installs anything.
pub fn init(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
