//! Shared helpers for `tooldag` integration tests.
//!
//! - [`builders`] assembles validated workflow configs without TOML.
//! - [`tools`] provides fake tools that record calls, fail, sleep or panic.

pub mod builders;
pub mod tools;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for a single orchestrator run in tests. Tool delays in the
/// suite stay well below this.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Orchestrator logs (level dispatch, node start/finish, skips) go to the
/// harness's captured output, so they only show up for failing tests.
/// `RUST_LOG` overrides the default `tooldag=debug` filter.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,tooldag=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`RUN_TIMEOUT`].
///
/// Wrap every `execute` call in this so a stuck level fails the test
/// instead of hanging the suite.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(RUN_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("orchestrator run did not finish within {RUN_TIMEOUT:?}"))
}
