// ============================================================================
// Logging
// ============================================================================

use crate::error::{BookError, BookResult};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. `"info"` or
/// `"limit_order_book=debug"`) is used. Fails if a subscriber is already
/// installed or the filter does not parse.
pub fn init_tracing(default_level: &str) -> BookResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| BookError::InvalidConfig(format!("invalid log filter: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| BookError::InvalidConfig(format!("failed to initialize tracing: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing("warn");
        assert!(init_tracing("warn").is_err());
    }
}
