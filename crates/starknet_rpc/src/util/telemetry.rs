use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Initialize tracing
///
/// `RUST_LOG` drives the filter (defaults to `info`), `LOG_FORMAT=json` switches
/// to structured output for log collectors.
pub async fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);

    let result = if json {
        let logger = tracing_subscriber::fmt::layer().json();
        tracing::subscriber::set_global_default(Registry::default().with(logger).with(env_filter))
    } else {
        let logger = tracing_subscriber::fmt::layer().compact();
        tracing::subscriber::set_global_default(Registry::default().with(logger).with(env_filter))
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
