//! Test subscriber shared by the client's unit and integration tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the test subscriber once per process.
///
/// `TEST_LOG` wins over `RUST_LOG`; with neither set only warnings show.
/// A bare level in `TEST_LOG` (e.g. `TEST_LOG=debug`) is scoped to the
/// client crates so reqwest/hyper stay at `warn`.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let directives = match std::env::var("TEST_LOG") {
            Ok(value) => scope_bare_level(&value),
            Err(_) => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_DIRECTIVES.into()),
        };

        let _ = fmt()
            .with_env_filter(EnvFilter::new(directives))
            .with_test_writer()
            .without_time()
            .try_init();
    });
}

fn scope_bare_level(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.contains(['=', ',']) {
        return value.to_string();
    }
    format!("{DEFAULT_DIRECTIVES},planner_client={value},session_cli={value}")
}
