// ============================================================================
// Book Registry
// One lock per book, books addressed by instrument and exchange
// ============================================================================

use crate::domain::{ExchangeId, Instrument, Order, OrderBookConfig, DEFAULT_MAX_CASCADE};
use crate::engine::order_book::OrderBook;
use crate::error::{BookError, BookResult};
use crate::interfaces::EventHandler;
use crossbeam_skiplist::SkipMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Identifies one book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookKey {
    pub instrument: Instrument,
    pub exchange: ExchangeId,
}

impl BookKey {
    pub fn new(instrument: &Instrument, exchange: &ExchangeId) -> Self {
        Self {
            instrument: instrument.clone(),
            exchange: exchange.clone(),
        }
    }
}

/// Concurrent directory of books.
///
/// Lookups and inserts are lock-free; each book is guarded by its own
/// mutex, so orders for different books proceed in parallel while orders
/// for the same book are serialized.
pub struct BookRegistry {
    books: SkipMap<BookKey, Arc<Mutex<OrderBook>>>,
    event_handler: Arc<dyn EventHandler>,
    max_cascade: usize,
}

impl BookRegistry {
    pub fn new(event_handler: Arc<dyn EventHandler>) -> Self {
        Self {
            books: SkipMap::new(),
            event_handler,
            max_cascade: DEFAULT_MAX_CASCADE,
        }
    }

    /// Cascade cap applied to books created from now on.
    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade;
        self
    }

    pub fn get_or_create(
        &self,
        instrument: &Arc<Instrument>,
        exchange: &ExchangeId,
    ) -> Arc<Mutex<OrderBook>> {
        let entry = self
            .books
            .get_or_insert_with(BookKey::new(instrument, exchange), || {
                tracing::debug!(instrument = %instrument, exchange = %exchange, "creating book");
                let config = OrderBookConfig::new(Arc::clone(instrument), exchange.clone())
                    .with_max_cascade(self.max_cascade);
                Arc::new(Mutex::new(OrderBook::with_config(
                    config,
                    Arc::clone(&self.event_handler),
                )))
            });
        Arc::clone(entry.value())
    }

    pub fn get(&self, instrument: &Instrument, exchange: &ExchangeId) -> Option<Arc<Mutex<OrderBook>>> {
        self.books
            .get(&BookKey::new(instrument, exchange))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Route `order` to the book for its instrument and exchange.
    pub fn submit(&self, order: Arc<Order>) -> BookResult<()> {
        let book = self.get_or_create(&order.instrument, &order.exchange);
        let mut book = book.lock();
        book.add(order)
    }

    pub fn cancel(&self, order: &Order) -> BookResult<()> {
        let book = self.existing(order)?;
        let mut book = book.lock();
        book.cancel(order)
    }

    pub fn change(&self, order: &Order) -> BookResult<()> {
        let book = self.existing(order)?;
        let mut book = book.lock();
        book.change(order)
    }

    fn existing(&self, order: &Order) -> BookResult<Arc<Mutex<OrderBook>>> {
        self.get(&order.instrument, &order.exchange)
            .ok_or(BookError::OrderNotFound {
                order_id: order.id,
                price: order.price,
            })
    }

    pub fn keys(&self) -> Vec<BookKey> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentRegistry, InstrumentType, Side};
    use crate::interfaces::{NoOpEventHandler, RecordingEventHandler};
    use crate::numeric::{Price, Quantity};

    #[test]
    fn test_books_are_keyed_by_instrument_and_exchange() {
        let mut instruments = InstrumentRegistry::new();
        let btc = instruments.get_or_register("BTC-USD", InstrumentType::Pair);
        let registry = BookRegistry::new(Arc::new(NoOpEventHandler));

        let a = registry.get_or_create(&btc, &ExchangeId::new("coinbase"));
        let b = registry.get_or_create(&btc, &ExchangeId::new("coinbase"));
        let c = registry.get_or_create(&btc, &ExchangeId::new("kraken"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&btc, &ExchangeId::new("binance")).is_none());
    }

    #[test]
    fn test_submit_and_cancel_route_to_book() {
        let handler = Arc::new(RecordingEventHandler::new());
        let registry = BookRegistry::new(handler.clone());
        let instrument = Arc::new(Instrument::new("AAPL", InstrumentType::Equity));
        let order = Arc::new(Order::limit(
            Arc::clone(&instrument),
            Side::Buy,
            "150".parse().unwrap(),
            "10".parse().unwrap(),
        ));

        registry.submit(Arc::clone(&order)).unwrap();
        let book = registry.get(&instrument, &ExchangeId::default()).unwrap();
        assert_eq!(book.lock().best_bid(), Some("150".parse().unwrap()));

        registry.change(&order.amended("12".parse().unwrap())).unwrap();
        registry.cancel(&order).unwrap();
        assert!(book.lock().is_empty());
        assert_eq!(handler.events().len(), 3);
    }

    #[test]
    fn test_parallel_submission() {
        let registry = BookRegistry::new(Arc::new(NoOpEventHandler));
        let instruments: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| Arc::new(Instrument::new(*name, InstrumentType::Equity)))
            .collect();

        std::thread::scope(|scope| {
            for instrument in &instruments {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 1..=50 {
                        let order = Order::limit(
                            Arc::clone(instrument),
                            Side::Sell,
                            Price::from_integer(100 + i).unwrap(),
                            Quantity::ONE,
                        );
                        registry.submit(Arc::new(order)).unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.len(), 4);
        for instrument in &instruments {
            let book = registry.get(instrument, &ExchangeId::default()).unwrap();
            assert_eq!(book.lock().side(Side::Sell).level_count(), 50);
        }
    }
}
