//! Test utilities for dcgen
//!
//! Shared by the unit tests and, through the `test-utils` feature, by the
//! `tests/` targets:
//! - one-time tracing setup that writes through the test harness
//! - manifest and configuration fixtures written into temporary directories
//! - in-code catalogs for the resolution scenarios
//!
//! # Example
//!
//! ```rust,no_run
//! use dcgen_cli::test_utils::{ConfigFixture, ManifestFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let temp = tempfile::tempdir().unwrap();
//! let manifest = ManifestFixture::cluster().write_to(temp.path()).unwrap();
//! let config = ConfigFixture::cluster().write_to(temp.path()).unwrap();
//! ```

pub mod fixtures;

pub use fixtures::{
    ConfigFixture, ManifestFixture, bootstrap_sources, bootstrap_target, late_sources,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=dcgen_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
