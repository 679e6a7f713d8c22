// ============================================================================
// Utilities Module
// Process-level helpers for binaries, benches and demos
// ============================================================================

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::init_tracing;
