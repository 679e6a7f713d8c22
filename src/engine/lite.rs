// ============================================================================
// Lite Order Book
// Book rebuilt from aggregated vendor depth
// ============================================================================

use crate::domain::{ExchangeId, Instrument, Order, OrderBookConfig, Side};
use crate::engine::order_book::OrderBook;
use crate::error::{BookError, BookResult};
use crate::interfaces::EventHandler;
use crate::numeric::{Price, Quantity};
use std::sync::Arc;

/// Mirror of a venue that only publishes per-price totals.
///
/// Each snapshot replaces the book wholesale; every level becomes one
/// synthetic resting order carrying the level's full volume.
pub struct OrderBookLite {
    book: OrderBook,
    config: OrderBookConfig,
    event_handler: Arc<dyn EventHandler>,
}

impl OrderBookLite {
    pub fn new(
        instrument: Arc<Instrument>,
        exchange: ExchangeId,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        let config = OrderBookConfig::new(instrument, exchange);
        Self {
            book: OrderBook::with_config(config.clone(), Arc::clone(&event_handler)),
            config,
            event_handler,
        }
    }

    /// Build a lite book straight from `(price, volume)` depth.
    pub fn from_depth(
        instrument: Arc<Instrument>,
        exchange: ExchangeId,
        event_handler: Arc<dyn EventHandler>,
        bids: &[(Price, Quantity)],
        asks: &[(Price, Quantity)],
    ) -> BookResult<Self> {
        let mut lite = Self::new(instrument, exchange, event_handler);
        lite.apply_snapshot(bids, asks)?;
        Ok(lite)
    }

    /// Replace the book with `bids` and `asks`. Levels with zero volume are
    /// skipped. A crossed snapshot is rejected and leaves the book untouched.
    pub fn apply_snapshot(
        &mut self,
        bids: &[(Price, Quantity)],
        asks: &[(Price, Quantity)],
    ) -> BookResult<()> {
        let best_bid = live(bids).map(|(price, _)| price).max();
        let best_ask = live(asks).map(|(price, _)| price).min();
        if let (Some(bid), Some(ask)) = (best_bid, best_ask) {
            if bid >= ask {
                tracing::warn!(
                    instrument = %self.config.instrument,
                    bid = %bid,
                    ask = %ask,
                    "rejecting crossed depth snapshot"
                );
                return Err(BookError::CrossedSnapshot { bid, ask });
            }
        }

        let mut book =
            OrderBook::with_config(self.config.clone(), Arc::clone(&self.event_handler));
        for (side, levels) in [(Side::Buy, bids), (Side::Sell, asks)] {
            for (price, volume) in live(levels) {
                let order = Order::limit(Arc::clone(&self.config.instrument), side, price, volume)
                    .with_exchange(self.config.exchange.clone());
                book.add(Arc::new(order))?;
            }
        }

        tracing::debug!(
            instrument = %self.config.instrument,
            bids = book.side(Side::Buy).level_count(),
            asks = book.side(Side::Sell).level_count(),
            "applied depth snapshot"
        );
        self.book = book;
        Ok(())
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }
}

fn live(levels: &[(Price, Quantity)]) -> impl Iterator<Item = (Price, Quantity)> + '_ {
    levels
        .iter()
        .copied()
        .filter(|(_, volume)| !volume.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentType;
    use crate::interfaces::{EventKind, NoOpEventHandler, RecordingEventHandler};

    fn level(price: &str, volume: &str) -> (Price, Quantity) {
        (price.parse().unwrap(), volume.parse().unwrap())
    }

    fn instrument() -> Arc<Instrument> {
        Arc::new(Instrument::new("ESZ6", InstrumentType::Future))
    }

    #[test]
    fn test_from_depth() {
        let lite = OrderBookLite::from_depth(
            instrument(),
            ExchangeId::new("cme"),
            Arc::new(NoOpEventHandler),
            &[level("99", "5"), level("98", "1"), level("97", "0")],
            &[level("101", "2")],
        )
        .unwrap();

        let book = lite.book();
        assert_eq!(book.top_of_book().quote(Side::Buy), Some(level("99", "5")));
        assert_eq!(book.top_of_book().quote(Side::Sell), Some(level("101", "2")));
        assert_eq!(book.levels(10).bids.len(), 2);
        assert!(book.iter().all(|depth| depth.order_count == 1));
    }

    #[test]
    fn test_snapshot_replaces_book() {
        let handler = Arc::new(RecordingEventHandler::new());
        let mut lite = OrderBookLite::new(instrument(), ExchangeId::default(), handler.clone());
        lite.apply_snapshot(&[level("99", "5")], &[level("101", "2")])
            .unwrap();
        lite.apply_snapshot(&[level("100", "1")], &[]).unwrap();

        assert_eq!(lite.book().best_bid(), Some("100".parse().unwrap()));
        assert_eq!(lite.book().best_ask(), None);
        assert!(handler.kinds().iter().all(|kind| *kind == EventKind::Open));
    }

    #[test]
    fn test_crossed_snapshot_rejected() {
        let mut lite = OrderBookLite::new(
            instrument(),
            ExchangeId::default(),
            Arc::new(NoOpEventHandler),
        );
        lite.apply_snapshot(&[level("99", "1")], &[level("101", "1")])
            .unwrap();

        let err = lite
            .apply_snapshot(&[level("102", "1")], &[level("101", "1")])
            .unwrap_err();
        assert!(matches!(err, BookError::CrossedSnapshot { .. }));
        assert_eq!(lite.book().best_bid(), Some("99".parse().unwrap()));
    }
}
