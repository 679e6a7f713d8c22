// ============================================================================
// Order Book Factory
// Creates order books with validated configuration
// ============================================================================

use crate::domain::{ExchangeId, Instrument, OrderBookConfig};
use crate::engine::OrderBook;
use crate::error::BookResult;
use crate::interfaces::EventHandler;
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates an order book from configuration
///
/// # Example
/// ```
/// use limit_order_book::prelude::*;
/// use std::sync::Arc;
///
/// let instrument = Arc::new(Instrument::new("AAPL", InstrumentType::Equity));
/// let config = OrderBookConfig::new(instrument, ExchangeId::new("nasdaq"));
/// let book = create_from_config(config, Arc::new(NoOpEventHandler)).unwrap();
/// assert!(book.is_empty());
/// ```
pub fn create_from_config(
    config: OrderBookConfig,
    event_handler: Arc<dyn EventHandler>,
) -> BookResult<OrderBook> {
    config.validate()?;
    tracing::debug!(
        instrument = %config.instrument,
        exchange = %config.exchange,
        max_cascade = config.max_cascade,
        "creating order book"
    );
    Ok(OrderBook::with_config(config, event_handler))
}

// ============================================================================
// Builder Pattern
// ============================================================================

/// Fluent builder for order books
///
/// # Example
/// ```
/// use limit_order_book::prelude::*;
/// use std::sync::Arc;
///
/// let book = OrderBookBuilder::new(Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)))
///     .on_exchange(ExchangeId::new("coinbase"))
///     .with_max_depth(20)
///     .build(Arc::new(NoOpEventHandler))
///     .unwrap();
/// assert_eq!(book.exchange().as_str(), "coinbase");
/// ```
pub struct OrderBookBuilder {
    config: OrderBookConfig,
}

impl OrderBookBuilder {
    pub fn new(instrument: Arc<Instrument>) -> Self {
        Self {
            config: OrderBookConfig::new(instrument, ExchangeId::default()),
        }
    }

    pub fn on_exchange(mut self, exchange: ExchangeId) -> Self {
        self.config.exchange = exchange;
        self
    }

    /// Cap on secondary orders replayed per `add`
    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.config.max_cascade = max_cascade;
        self
    }

    /// Set maximum snapshot depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn build(self, event_handler: Arc<dyn EventHandler>) -> BookResult<OrderBook> {
        create_from_config(self.config, event_handler)
    }

    /// Get the configuration without building (for inspection)
    pub fn config(&self) -> &OrderBookConfig {
        &self.config
    }
}
