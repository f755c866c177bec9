//! Logging utilities
//!
//! Library code only talks to the `log` facade; binaries call [`init`] or
//! [`init_with_default`] once at startup.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    init_with_default("info");
}

/// Initialize logging, falling back to `filter` when `RUST_LOG` is unset.
///
/// Calling it again is harmless; later calls are ignored.
pub fn init_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::trace!("Logger already initialized");
    }
}
