//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line (default).
    #[default]
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

impl LogFormat {
    /// `json` or `pretty` (case-insensitive); anything else falls back to JSON.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Initialize tracing/logging for the process with JSON output.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(LogFormat::Json);
}

/// Initialize tracing/logging with the given output format.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Timestamps always; level filter configurable via RUST_LOG.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_thread_names(true);

    let installed = match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };
    if installed {
        ::tracing::debug!(?format, "tracing initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        assert!(!init_with(LogFormat::Pretty));
    }

    #[test]
    fn format_names_parse() {
        assert_eq!(LogFormat::from_name("Pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("xml"), LogFormat::Json);
    }
}
