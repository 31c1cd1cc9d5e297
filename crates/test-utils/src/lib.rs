//! Shared fixtures for the backstage integration tests: config and catalog
//! builders, scriptable fakes for every backend seam, and a few async helpers.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Upper bound for any single await in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a per-test capturing subscriber once per test binary.
///
/// Filter with `RUST_LOG` (defaults to `backstage=debug,warn`); output only
/// shows for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("backstage=debug,warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<T>(fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(value) => value,
        Err(_) => panic!("test future did not finish within {TEST_TIMEOUT:?}"),
    }
}
