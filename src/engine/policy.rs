// ============================================================================
// Order Policy
// Order-type and flag dispatch, kept apart from the sweep loop
// ============================================================================

use crate::domain::{Order, OrderFlag, OrderType, Side};
use crate::numeric::{Price, Quantity};

/// How an incoming order is treated once its sweep is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Unflagged market order: take what is there, drop the rest
    MarketSweep,
    /// FOK/AON market order, capped at its price
    MarketAllOrNothing,
    /// FOK/AON limit order
    LimitAllOrNothing,
    LimitImmediateOrCancel,
    /// Plain limit order; any remainder rests
    LimitResting,
}

/// What the sweep achieved for the taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Volume filled during this call
    pub filled: Quantity,
    pub remaining: Quantity,
    /// An all-or-none taker hit a maker it could not fully consume
    pub aborted: bool,
}

/// Fate of the staged transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Fully filled; nothing left to rest
    Commit,
    /// Commit what filled, rest the remainder
    CommitAndRest,
    /// Commit what filled, cancel the remainder
    CommitAndCancelRemainder,
    /// Undo everything and cancel the order
    RevertAndCancel,
}

impl OrderPolicy {
    /// Stop orders never sweep; they resolve as their target once triggered.
    pub fn for_order(order: &Order) -> Self {
        match (order.order_type, order.flag) {
            (OrderType::Market, flag) if flag.is_all_or_nothing() => Self::MarketAllOrNothing,
            (OrderType::Market, _) => Self::MarketSweep,
            (_, flag) if flag.is_all_or_nothing() => Self::LimitAllOrNothing,
            (_, OrderFlag::ImmediateOrCancel) => Self::LimitImmediateOrCancel,
            _ => Self::LimitResting,
        }
    }

    /// Worst price the order accepts. Unflagged market orders use the
    /// infinite sentinel of their side.
    pub fn effective_price(self, order: &Order) -> Price {
        match (self, order.side) {
            (Self::MarketSweep, Side::Buy) => Price::MAX,
            (Self::MarketSweep, Side::Sell) => Price::MIN,
            _ => order.price,
        }
    }

    /// Whether a taker at `limit` may trade against a maker at `level`.
    /// The bound is inclusive.
    pub fn crosses(side: Side, limit: Price, level: Price) -> bool {
        match side {
            Side::Buy => level <= limit,
            Side::Sell => level >= limit,
        }
    }

    pub fn resolve(self, outcome: FillOutcome) -> Resolution {
        if outcome.remaining.is_zero() && !outcome.aborted {
            return Resolution::Commit;
        }

        match self {
            Self::MarketAllOrNothing => Resolution::RevertAndCancel,
            Self::MarketSweep => Resolution::CommitAndCancelRemainder,
            Self::LimitAllOrNothing if outcome.aborted || outcome.filled.is_positive() => {
                Resolution::RevertAndCancel
            },
            Self::LimitAllOrNothing => Resolution::CommitAndRest,
            Self::LimitImmediateOrCancel if outcome.filled.is_positive() => {
                Resolution::CommitAndCancelRemainder
            },
            Self::LimitImmediateOrCancel => Resolution::CommitAndRest,
            Self::LimitResting => Resolution::CommitAndRest,
        }
    }
}
