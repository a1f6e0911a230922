// ABOUTME: Log capture for unit tests.
// ABOUTME: Routes tracing output through the test harness so it shows on failure only.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub(crate) fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tinyci=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
