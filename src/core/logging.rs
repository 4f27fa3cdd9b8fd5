// Start of file: /src/core/logging.rs

use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::fmt::format::FmtSpan;

const DEVELOPMENT_DIRECTIVES: &str = "sentinel_chat_api=debug,tower_http=debug,axum=trace";
const PRODUCTION_DIRECTIVES: &str = "sentinel_chat_api=info,tower_http=info";

/// Filter used when RUST_LOG is not set
pub fn default_directives(production: bool) -> &'static str {
    if production {
        PRODUCTION_DIRECTIVES
    } else {
        DEVELOPMENT_DIRECTIVES
    }
}

// Initialize the tracing subscriber; RUST_LOG takes precedence over the defaults.
// Runs before the configuration is parsed so its warnings are not lost.
pub fn init_tracing(production: bool) {
    let env_filter: EnvFilter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(production)));

    // A subscriber may already be installed (e.g. by tests)
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}


// End of file: /src/core/logging.rs
