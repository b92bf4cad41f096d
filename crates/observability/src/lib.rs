//! Structured logging setup shared by the binaries.

pub mod logging;

pub use logging::{DEFAULT_FILTER, ENV_LOG_FORMAT, LogFormat};

/// Initialize process-wide logging with the format chosen by
/// `CARTLEDGER_LOG_FORMAT` (JSON unless set to `pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(LogFormat::from_env());
}
