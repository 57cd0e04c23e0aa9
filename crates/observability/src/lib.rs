//! Process-wide tracing/logging setup.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};

/// Initialize process-wide observability with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
