use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Request spans from `TraceLayer` are logged at debug level.
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";

static INIT: OnceCell<()> = OnceCell::new();

pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        fmt().with_env_filter(env_filter()).with_target(false).init();
    });
}

/// `NLQ_LOG` wins over `RUST_LOG`; both fall back to [`DEFAULT_DIRECTIVES`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("NLQ_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }
}
