// ============================================================================
// Engine Module
// Contains the core order book business logic
// ============================================================================

mod book_side;
mod collector;
mod lite;
mod order_book;
mod policy;
mod price_level;
mod registry;
mod stop_level;

pub mod factory;

pub use book_side::{BookSide, Ladders};
pub use collector::{Collector, LevelKey, LevelStore};
pub use factory::{create_from_config, OrderBookBuilder};
pub use lite::OrderBookLite;
pub use order_book::OrderBook;
pub use policy::{FillOutcome, OrderPolicy, Resolution};
pub use price_level::{CrossStatus, PriceLevel};
pub use registry::{BookKey, BookRegistry};
pub use stop_level::{StopLevel, TriggeredStops};
