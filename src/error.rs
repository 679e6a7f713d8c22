// ============================================================================
// Book Errors
// Invariant violations and internal accounting failures raised by the core
// ============================================================================

use crate::domain::OrderId;
use crate::numeric::{NumericError, Price, Quantity};
use thiserror::Error;

/// Errors returned synchronously from `add`/`cancel`/`change`.
///
/// Policy rejections (an unsatisfiable fill-or-kill, say) are not errors:
/// they surface as a CANCEL event on the order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("invalid order {order_id:?}: {reason}")]
    InvalidOrder { order_id: OrderId, reason: String },

    #[error("order {order_id:?} is for {found}, book trades {expected}")]
    InstrumentMismatch {
        order_id: OrderId,
        expected: String,
        found: String,
    },

    #[error("order {order_id:?} not found at price {price}")]
    OrderNotFound { order_id: OrderId, price: Price },

    #[error("no price level at {price}")]
    LevelNotFound { price: Price },

    #[error("order {order_id:?} overfilled: filled {filled} of volume {volume}")]
    Overfill {
        order_id: OrderId,
        filled: Quantity,
        volume: Quantity,
    },

    #[error("invalid amendment for order {order_id:?}: {reason}")]
    InvalidAmendment { order_id: OrderId, reason: String },

    #[error("trade accounting mismatch: taker filled {filled}, makers supplied {accumulated}")]
    AccountingMismatch {
        filled: Quantity,
        accumulated: Quantity,
    },

    /// `dropped` lists the triggered targets that never ran; each was
    /// cancelled with a CANCEL event.
    #[error("secondary order cascade exceeded {limit} orders, {} dropped", dropped.len())]
    CascadeLimit { limit: usize, dropped: Vec<OrderId> },

    #[error("depth snapshot is crossed: bid {bid} >= ask {ask}")]
    CrossedSnapshot { bid: Price, ask: Price },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),
}

/// Result type alias for book operations
pub type BookResult<T> = Result<T, BookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversion() {
        let err: BookError = NumericError::Overflow.into();
        assert!(matches!(err, BookError::Numeric(NumericError::Overflow)));
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_cascade_message() {
        let err = BookError::CascadeLimit {
            limit: 8,
            dropped: vec![OrderId::new(), OrderId::new()],
        };
        assert_eq!(
            err.to_string(),
            "secondary order cascade exceeded 8 orders, 2 dropped"
        );
    }
}
