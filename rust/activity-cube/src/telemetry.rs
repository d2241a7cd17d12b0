use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

const LOG_ENV: &str = "ACTIVITY_LOG";
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";

/// Installs the global subscriber once.
///
/// `RUST_LOG` wins, then `ACTIVITY_LOG`; otherwise request spans from the
/// trace layer are shown on top of `info`.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let filter = log_filter(std::env::var(LOG_ENV).ok().as_deref());
        fmt().with_env_filter(filter).with_target(false).init();
    });
}

fn log_filter(service_directives: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| match service_directives {
            Some(directives) => EnvFilter::try_new(directives),
            None => EnvFilter::try_new(DEFAULT_DIRECTIVES),
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}
