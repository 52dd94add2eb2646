use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

/// Install the global subscriber. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,planner_client=info,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    // try_init: a host application may already own the global subscriber
    match format {
        LogFormat::Json => registry.with(base.with_ansi(false).json()).try_init().ok(),
        LogFormat::Text => registry.with(base.without_time()).try_init().ok(),
    };
}
