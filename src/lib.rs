// ============================================================================
// Limit Order Book Library
// Transactional price-time matching with order-flag aware crossing
// ============================================================================

//! # Limit Order Book
//!
//! A limit order book matching core: two sorted ladders of price levels,
//! a transactional collector that commits or reverts every side effect of
//! one incoming order, and order-flag aware matching.
//!
//! ## Features
//!
//! - **Price-time priority** with partially filled makers keeping their place
//! - **Fill-or-kill, all-or-none and immediate-or-cancel** on both sides of a match
//! - **Atomic commit/revert** across every price level an order touches
//! - **Stop orders** whose targets are replayed through a bounded work queue
//! - **Fixed-point prices and volumes**, with VWAP trade prices
//!
//! ## Example
//!
//! ```rust
//! use limit_order_book::prelude::*;
//! use std::sync::Arc;
//!
//! let instrument = Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair));
//! let handler = Arc::new(RecordingEventHandler::new());
//! let mut book = OrderBook::new(Arc::clone(&instrument), ExchangeId::new("coinbase"), handler.clone());
//!
//! let ask = Arc::new(Order::limit(
//!     Arc::clone(&instrument),
//!     Side::Sell,
//!     Price::from_integer(50_000).unwrap(),
//!     Quantity::from_integer(1).unwrap(),
//! ));
//! book.add(Arc::clone(&ask)).unwrap();
//!
//! let bid = Arc::new(Order::limit(
//!     instrument,
//!     Side::Buy,
//!     Price::from_integer(50_000).unwrap(),
//!     Quantity::from_integer(1).unwrap(),
//! ));
//! book.add(bid).unwrap();
//!
//! assert!(ask.finished());
//! assert_eq!(handler.trades().len(), 1);
//! assert!(book.is_empty());
//! ```

pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod numeric;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::order::state::{OrderState, OrderStateTransition};
    pub use crate::domain::{
        DepthLevel, ExchangeId, Instrument, InstrumentRegistry, InstrumentType, LevelPair,
        MakerFill, Order, OrderBookConfig, OrderBookSnapshot, OrderFlag, OrderId, OrderType,
        Side, TopOfBook, Trade,
    };
    pub use crate::engine::{
        create_from_config, BookRegistry, OrderBook, OrderBookBuilder, OrderBookLite,
    };
    pub use crate::error::{BookError, BookResult};
    #[cfg(feature = "async")]
    pub use crate::interfaces::TokioEventHandler;
    pub use crate::interfaces::{
        BookEvent, ChannelEventHandler, EventHandler, EventKind, LoggingEventHandler,
        NoOpEventHandler, RecordingEventHandler,
    };
    pub use crate::numeric::{Price, Quantity};
}
