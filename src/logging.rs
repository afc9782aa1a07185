use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PGCOMPARE_LOG";

/// Later calls are ignored.
pub fn init(filter: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// Explicit filter, then PGCOMPARE_LOG, then RUST_LOG, then the build default.
fn build_env_filter(custom_filter: Option<&str>) -> EnvFilter {
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter)
            .unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "debug,sqlx=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "info,sqlx=warn"
    }
}
