//! Structured logging setup for the `lynx` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left to the
//! binary. `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingConfig;
use crate::error::{GamepackError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber described by `config`.
///
/// # Errors
/// Returns `GamepackError::Config` if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| GamepackError::Config(format!("Failed to install logger: {e}")))
}

/// Wrapper that hides secret material in log output, showing only its length.
pub struct Redacted<'a>(pub &'a str);

impl std::fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} chars]", self.0.len())
    }
}

impl std::fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_value() {
        let shown = Redacted("AAECAwQFBgcICQoLDA0ODw").to_string();
        assert_eq!(shown, "[22 chars]");
        assert!(!shown.contains("AAEC"));
    }
}
