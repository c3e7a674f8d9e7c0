//! Logger setup for binaries and tests that use the crate.

use std::sync::atomic::{AtomicBool, Ordering};

static IS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs `env_logger` as the global logger.
///
/// The filter is taken from `RUST_LOG` and defaults to `info`. Calling it more
/// than once, or after another logger was installed, does nothing.
pub fn init_logger() {
    if IS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("Logger initialized");
    }
}
