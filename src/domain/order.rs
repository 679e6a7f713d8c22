// ============================================================================
// Order Domain Model
// ============================================================================

use crate::domain::instrument::{ExchangeId, Instrument};
use crate::error::{BookError, BookResult};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    Market,
    Limit,
    /// Zero-volume trigger; submits its `stop_target` once its price is crossed.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderFlag {
    #[default]
    None,
    /// Fill entire order immediately or cancel all
    FillOrKill,
    /// Fill entire order or nothing, no partial fill retained
    AllOrNone,
    /// Fill what is immediately possible, cancel the remainder
    ImmediateOrCancel,
}

impl OrderFlag {
    /// FOK and AON both refuse to keep a partial fill.
    pub fn is_all_or_nothing(self) -> bool {
        matches!(self, OrderFlag::FillOrKill | OrderFlag::AllOrNone)
    }
}

// ============================================================================
// Order State Machine
// ============================================================================

pub mod state {
    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    /// `New -> (Open <-> PartiallyFilled) -> Filled | Cancelled`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderState {
        New = 0,
        Open = 1,
        PartiallyFilled = 2,
        Filled = 3,
        Cancelled = 4,
    }

    impl OrderState {
        pub fn from_u8(val: u8) -> Self {
            match val {
                0 => OrderState::New,
                1 => OrderState::Open,
                2 => OrderState::PartiallyFilled,
                3 => OrderState::Filled,
                _ => OrderState::Cancelled,
            }
        }

        pub fn is_terminal(&self) -> bool {
            matches!(self, OrderState::Filled | OrderState::Cancelled)
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum OrderStateTransition {
        Rest,
        PartialFill,
        Fill,
        Cancel,
    }

    impl OrderState {
        pub fn transition(&self, transition: OrderStateTransition) -> Result<OrderState, String> {
            match (self, transition) {
                (OrderState::New, OrderStateTransition::Rest) => Ok(OrderState::Open),
                (OrderState::PartiallyFilled, OrderStateTransition::Rest) => {
                    Ok(OrderState::PartiallyFilled)
                },

                (
                    OrderState::New | OrderState::Open | OrderState::PartiallyFilled,
                    OrderStateTransition::PartialFill,
                ) => Ok(OrderState::PartiallyFilled),
                (
                    OrderState::New | OrderState::Open | OrderState::PartiallyFilled,
                    OrderStateTransition::Fill,
                ) => Ok(OrderState::Filled),
                (
                    OrderState::New | OrderState::Open | OrderState::PartiallyFilled,
                    OrderStateTransition::Cancel,
                ) => Ok(OrderState::Cancelled),

                _ => Err(format!(
                    "Invalid transition from {:?} via {:?}",
                    self, transition
                )),
            }
        }
    }
}

use state::{OrderState, OrderStateTransition};

// ============================================================================
// Shared Order Entity
// ============================================================================

/// An order shared between its originator and the book.
///
/// Callers hold an `Arc<Order>` and observe `filled`, `volume` and state;
/// only the book writes them, in place, while matching.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub instrument: Arc<Instrument>,
    pub exchange: ExchangeId,
    pub side: Side,
    pub order_type: OrderType,
    pub flag: OrderFlag,
    /// Limit price, stop trigger price, or worst-price cap for flagged market orders
    pub price: Price,
    pub stop_target: Option<Arc<Order>>,

    timestamp_nanos: AtomicI64,
    volume: AtomicI64,
    filled: AtomicI64,
    state: AtomicU8,
}

impl Order {
    pub fn new(
        instrument: Arc<Instrument>,
        exchange: ExchangeId,
        side: Side,
        order_type: OrderType,
        price: Price,
        volume: Quantity,
        flag: OrderFlag,
    ) -> Self {
        Self {
            id: OrderId::new(),
            instrument,
            exchange,
            side,
            order_type,
            flag,
            price,
            stop_target: None,
            timestamp_nanos: AtomicI64::new(now_nanos()),
            volume: AtomicI64::new(volume.raw_value()),
            filled: AtomicI64::new(0),
            state: AtomicU8::new(OrderState::New as u8),
        }
    }

    pub fn limit(instrument: Arc<Instrument>, side: Side, price: Price, volume: Quantity) -> Self {
        Self::new(
            instrument,
            ExchangeId::default(),
            side,
            OrderType::Limit,
            price,
            volume,
            OrderFlag::None,
        )
    }

    /// Unflagged market orders ignore `price`; flagged ones use it as a cap
    /// (see [`with_price`](Self::with_price)).
    pub fn market(instrument: Arc<Instrument>, side: Side, volume: Quantity) -> Self {
        Self::new(
            instrument,
            ExchangeId::default(),
            side,
            OrderType::Market,
            Price::ZERO,
            volume,
            OrderFlag::None,
        )
    }

    /// Stop order triggering `target` once `trigger_price` is crossed.
    pub fn stop(trigger_price: Price, target: Order) -> Self {
        let mut stop = Self::new(
            Arc::clone(&target.instrument),
            target.exchange.clone(),
            target.side,
            OrderType::Stop,
            trigger_price,
            Quantity::ZERO,
            OrderFlag::None,
        );
        stop.stop_target = Some(Arc::new(target));
        stop
    }

    pub fn with_flag(mut self, flag: OrderFlag) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_exchange(mut self, exchange: ExchangeId) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = price;
        self
    }

    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        self.set_timestamp(timestamp);
        self
    }

    /// Copy of this order carrying a new volume, used to request a `change`.
    pub fn amended(&self, volume: Quantity) -> Order {
        let amended = self.clone();
        amended.volume.store(volume.raw_value(), Ordering::Release);
        amended
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn volume(&self) -> Quantity {
        Quantity::from_raw(self.volume.load(Ordering::Acquire))
    }

    pub fn filled(&self) -> Quantity {
        Quantity::from_raw(self.filled.load(Ordering::Acquire))
    }

    pub fn remaining(&self) -> Quantity {
        self.volume().saturating_sub_to_zero(self.filled())
    }

    pub fn state(&self) -> OrderState {
        OrderState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp_nanos.load(Ordering::Acquire))
    }

    /// Filled completely, or force-cancelled with residual volume. A stop
    /// carries no volume of its own and only finishes when cancelled.
    pub fn finished(&self) -> bool {
        if self.state() == OrderState::Cancelled {
            return true;
        }
        !self.is_stop_order() && self.filled() >= self.volume()
    }

    /// `price × volume`, at full decimal precision.
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.price.to_decimal() * self.volume().to_decimal()
    }

    pub fn is_market_order(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_stop_order(&self) -> bool {
        matches!(self.order_type, OrderType::Stop)
    }

    /// Ladder this order lives on while in the book. Stops wait on the
    /// opposite ladder, where opposing takers sweep through their price.
    pub fn resting_side(&self) -> Side {
        if self.is_stop_order() {
            self.side.opposite()
        } else {
            self.side
        }
    }

    /// Check the structural invariants of a submitted order.
    pub fn validate(&self) -> BookResult<()> {
        let reject = |reason: &str| {
            Err(BookError::InvalidOrder {
                order_id: self.id,
                reason: reason.to_string(),
            })
        };

        if self.filled() > self.volume() {
            return reject("filled exceeds volume");
        }
        if self.filled().is_negative() {
            return reject("filled is negative");
        }

        match (&self.order_type, &self.stop_target) {
            (OrderType::Stop, None) => reject("stop order without a target"),
            (OrderType::Stop, Some(_)) if !self.volume().is_zero() => {
                reject("stop order must carry zero volume")
            },
            (OrderType::Stop, Some(target)) if target.is_stop_order() => {
                reject("stop target cannot itself be a stop order")
            },
            (OrderType::Stop, Some(target)) if target.side != self.side => {
                reject("stop target must trade on the stop's side")
            },
            (OrderType::Stop, Some(_)) if self.price.is_sentinel() || !self.price.is_positive() => {
                reject("stop trigger price must be positive")
            },
            (OrderType::Stop, Some(_)) => Ok(()),
            (_, Some(_)) => reject("only stop orders carry a target"),
            (_, None) if !self.volume().is_positive() => reject("volume must be positive"),
            (OrderType::Limit, None) if self.price.is_sentinel() || !self.price.is_positive() => {
                reject("limit price must be positive")
            },
            (OrderType::Market, None)
                if self.flag.is_all_or_nothing()
                    && (self.price.is_sentinel() || !self.price.is_positive()) =>
            {
                reject("flagged market order needs a positive price cap")
            },
            (_, None) => Ok(()),
        }
    }

    // ========================================================================
    // Book-side mutation
    // ========================================================================

    /// Credit `quantity` to `filled`.
    pub(crate) fn fill(&self, quantity: Quantity) -> BookResult<()> {
        let filled = self.filled().checked_add(quantity)?;
        let volume = self.volume();
        if filled > volume {
            return Err(BookError::Overfill {
                order_id: self.id,
                filled,
                volume,
            });
        }

        self.filled.store(filled.raw_value(), Ordering::Release);
        let transition = if filled == volume {
            OrderStateTransition::Fill
        } else {
            OrderStateTransition::PartialFill
        };
        self.apply(transition);
        Ok(())
    }

    /// Put `filled` and state back to values recorded before a crossing attempt.
    pub(crate) fn restore(&self, filled: Quantity, state: OrderState) {
        self.filled.store(filled.raw_value(), Ordering::Release);
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn set_volume(&self, volume: Quantity) {
        self.volume.store(volume.raw_value(), Ordering::Release);
    }

    pub(crate) fn set_timestamp(&self, timestamp: DateTime<Utc>) {
        let nanos = timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.timestamp_nanos.store(nanos, Ordering::Release);
    }

    pub(crate) fn mark_resting(&self) {
        self.apply(OrderStateTransition::Rest);
    }

    pub(crate) fn force_cancel(&self) {
        self.apply(OrderStateTransition::Cancel);
    }

    fn apply(&self, transition: OrderStateTransition) {
        if let Ok(next) = self.state().transition(transition) {
            self.state.store(next as u8, Ordering::Release);
        }
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            instrument: Arc::clone(&self.instrument),
            exchange: self.exchange.clone(),
            side: self.side,
            order_type: self.order_type,
            flag: self.flag,
            price: self.price,
            stop_target: self.stop_target.clone(),
            timestamp_nanos: AtomicI64::new(self.timestamp_nanos.load(Ordering::Acquire)),
            volume: AtomicI64::new(self.volume.load(Ordering::Acquire)),
            filled: AtomicI64::new(self.filled.load(Ordering::Acquire)),
            state: AtomicU8::new(self.state.load(Ordering::Acquire)),
        }
    }
}
