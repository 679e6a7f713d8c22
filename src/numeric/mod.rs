// ============================================================================
// Numeric Module
// Fixed-point arithmetic for prices and volumes
// ============================================================================
//
// This module provides:
// - FixedDecimal<D>: Fixed-point decimal with compile-time precision
// - NumericError: Error types for arithmetic operations
// - Price (4 decimals) / Quantity (8 decimals) type aliases
//
// Design principles:
// - No floating-point operations inside the matching path
// - All arithmetic returns Result (no panics)
// - Cross-scale products go through i128 (notional, VWAP)

mod errors;
mod fixed_decimal;

pub use errors::{NumericError, NumericResult};
pub use fixed_decimal::{FixedDecimal, Price, Quantity};
