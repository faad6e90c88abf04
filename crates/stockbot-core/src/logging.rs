use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging/tracing for the notifier.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(service_name: &str) {
    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,stockbot=info,stockbot_core=info,stockbot_mysql=info,stockbot_telegram=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();
}
