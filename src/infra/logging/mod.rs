use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RIDERTRACK_LOG";

const DEFAULT_DIRECTIVES: &str = "ridertrack=info,ridertrack_lib=info,tauri=info,warn";

// RIDERTRACK_LOG takes precedence over RUST_LOG.
fn tracker_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(tracker_filter())
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter_env = LOG_ENV, "tracing initialised");
    }
}
