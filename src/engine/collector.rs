// ============================================================================
// Collector
// Transactional buffer for the side effects of one incoming order
// ============================================================================

use crate::domain::order::state::OrderState;
use crate::domain::{MakerFill, Order, Side, Trade};
use crate::error::{BookError, BookResult};
use crate::interfaces::{BookEvent, EventHandler};
use crate::numeric::{Price, Quantity};
use std::sync::Arc;

/// Identifies a price level touched during a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelKey {
    pub side: Side,
    pub price: Price,
}

/// Storage the collector commits or reverts touched levels in.
pub trait LevelStore {
    /// Make staged changes at `key` permanent, then drop whatever is left
    /// empty there.
    fn commit_level(&mut self, key: LevelKey);

    /// Undo staged changes at `key`.
    fn revert_level(&mut self, key: LevelKey);
}

/// Taker state captured when a transaction begins, restored on revert.
#[derive(Debug)]
struct TakerCheckpoint {
    order: Arc<Order>,
    filled: Quantity,
    state: OrderState,
}

/// Accumulates events while one order is processed and releases them
/// atomically: either every event reaches the handler on `commit`, or none
/// does and every touched level is restored on `revert`.
#[derive(Debug, Default)]
pub struct Collector {
    events: Vec<BookEvent>,
    maker_fills: Vec<MakerFill>,
    taker: Option<TakerCheckpoint>,
    touched: Vec<LevelKey>,
    cleared: Vec<LevelKey>,
    /// Sum of price × volume over accumulated maker fills, at 4 + 8 decimals
    notional: i128,
    volume: Quantity,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transaction for `taker`.
    pub fn begin(&mut self, taker: &Arc<Order>) {
        self.reset();
        self.taker = Some(TakerCheckpoint {
            order: Arc::clone(taker),
            filled: taker.filled(),
            state: taker.state(),
        });
    }

    // ========================================================================
    // Event staging
    // ========================================================================

    pub fn push_open(&mut self, order: &Arc<Order>) {
        self.events.push(BookEvent::Open(Arc::clone(order)));
    }

    /// FILL event. `accumulate` carries the volume a maker contributed to the
    /// pending trade.
    pub fn push_fill(&mut self, order: &Arc<Order>, accumulate: Option<Quantity>) -> BookResult<()> {
        self.accumulate(order, accumulate)?;
        self.events.push(BookEvent::Fill(Arc::clone(order)));
        Ok(())
    }

    /// CHANGE event, see [`push_fill`](Self::push_fill).
    pub fn push_change(
        &mut self,
        order: &Arc<Order>,
        accumulate: Option<Quantity>,
    ) -> BookResult<()> {
        self.accumulate(order, accumulate)?;
        self.events.push(BookEvent::Change(Arc::clone(order)));
        Ok(())
    }

    pub fn push_cancel(&mut self, order: &Arc<Order>) {
        self.events.push(BookEvent::Cancel(Arc::clone(order)));
    }

    /// Enqueue the aggregated trade for everything accumulated so far.
    ///
    /// `filled_in_txn` must equal the accumulated maker volume; anything else
    /// is a bug in the matching loop and aborts the transaction.
    pub fn push_trade(&mut self, taker: &Arc<Order>, filled_in_txn: Quantity) -> BookResult<()> {
        if filled_in_txn != self.volume {
            tracing::warn!(
                taker = ?taker.id,
                filled = %filled_in_txn,
                accumulated = %self.volume,
                "trade accounting mismatch"
            );
            return Err(BookError::AccountingMismatch {
                filled: filled_in_txn,
                accumulated: self.volume,
            });
        }
        if self.volume.is_zero() {
            return Ok(());
        }

        let price = Price::from_weighted_average(self.notional, self.volume)?;
        let trade = Trade::new(
            price,
            self.volume,
            Arc::clone(taker),
            std::mem::take(&mut self.maker_fills),
        );
        self.events.push(BookEvent::Trade(trade));
        self.notional = 0;
        self.volume = Quantity::ZERO;
        Ok(())
    }

    fn accumulate(&mut self, order: &Arc<Order>, volume: Option<Quantity>) -> BookResult<()> {
        let Some(volume) = volume else {
            return Ok(());
        };

        self.notional += order.price.weighted_product(volume);
        self.volume = self.volume.checked_add(volume)?;
        self.maker_fills.push(MakerFill {
            order: Arc::clone(order),
            price: order.price,
            volume,
        });
        Ok(())
    }

    // ========================================================================
    // Level bookkeeping
    // ========================================================================

    /// Record that `key` participates in this transaction.
    pub fn touch(&mut self, key: LevelKey) {
        if !self.touched.contains(&key) {
            self.touched.push(key);
        }
    }

    /// Register a level drained by this transaction. Returns how many levels
    /// have been drained so far.
    pub fn clear_level(&mut self, key: LevelKey) -> usize {
        self.touch(key);
        if !self.cleared.contains(&key) {
            self.cleared.push(key);
        }
        self.cleared.len()
    }

    pub fn cleared_levels(&self) -> &[LevelKey] {
        &self.cleared
    }

    /// Volume the taker gained since `begin`.
    pub fn taker_filled(&self, taker: &Order) -> Quantity {
        match &self.taker {
            Some(checkpoint) if checkpoint.order.id == taker.id => {
                taker.filled().saturating_sub_to_zero(checkpoint.filled)
            },
            _ => taker.filled(),
        }
    }

    /// Maker volume accumulated but not yet reported in a trade.
    pub fn accumulated_volume(&self) -> Quantity {
        self.volume
    }

    pub fn pending_events(&self) -> &[BookEvent] {
        &self.events
    }

    // ========================================================================
    // Commit / Revert
    // ========================================================================

    /// Deliver queued events in enqueue order, make level changes permanent,
    /// prune touched levels that ended up empty, then reset.
    pub fn commit<S: LevelStore>(&mut self, store: &mut S, handler: &dyn EventHandler) {
        let events = std::mem::take(&mut self.events);
        tracing::trace!(
            events = events.len(),
            levels = self.touched.len(),
            cleared = self.cleared.len(),
            "commit"
        );
        if !events.is_empty() {
            handler.on_events(events);
        }

        for key in &self.touched {
            store.commit_level(*key);
        }
        self.reset();
    }

    /// Restore every touched level and the taker, discard all queued events.
    pub fn revert<S: LevelStore>(&mut self, store: &mut S) {
        tracing::trace!(
            discarded = self.events.len(),
            levels = self.touched.len(),
            "revert"
        );
        for key in self.touched.iter().rev() {
            store.revert_level(*key);
        }
        if let Some(checkpoint) = &self.taker {
            checkpoint.order.restore(checkpoint.filled, checkpoint.state);
        }
        self.reset();
    }

    /// Drop all per-transaction state.
    pub fn reset(&mut self) {
        self.events.clear();
        self.maker_fills.clear();
        self.taker = None;
        self.touched.clear();
        self.cleared.clear();
        self.notional = 0;
        self.volume = Quantity::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, InstrumentType};
    use crate::engine::price_level::PriceLevel;
    use crate::interfaces::{EventKind, RecordingEventHandler};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore {
        levels: HashMap<i64, PriceLevel>,
    }

    impl LevelStore for MapStore {
        fn commit_level(&mut self, key: LevelKey) {
            let raw = key.price.raw_value();
            if let Some(level) = self.levels.get_mut(&raw) {
                level.commit();
            }
            if self.levels.get(&raw).is_some_and(PriceLevel::is_empty) {
                self.levels.remove(&raw);
            }
        }

        fn revert_level(&mut self, key: LevelKey) {
            if let Some(level) = self.levels.get_mut(&key.price.raw_value()) {
                level.revert();
            }
        }
    }

    fn order(side: Side, price: &str, volume: &str) -> Arc<Order> {
        Arc::new(Order::limit(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            side,
            price.parse().unwrap(),
            volume.parse().unwrap(),
        ))
    }

    #[test]
    fn test_trade_reports_vwap() {
        let mut collector = Collector::new();
        let taker = order(Side::Buy, "6", "3");
        let a = order(Side::Sell, "5.5", "1");
        let b = order(Side::Sell, "6", "2");

        collector.begin(&taker);
        collector.push_fill(&a, Some("1".parse().unwrap())).unwrap();
        collector.push_fill(&b, Some("2".parse().unwrap())).unwrap();
        collector.push_trade(&taker, "3".parse().unwrap()).unwrap();

        let trade = collector.pending_events().last().and_then(BookEvent::trade).unwrap();
        assert_eq!(trade.price.to_string(), "5.8333");
        assert_eq!(trade.volume, "3".parse().unwrap());
        assert_eq!(trade.maker_fills.len(), 2);
        assert_eq!(collector.accumulated_volume(), Quantity::ZERO);
    }

    #[test]
    fn test_trade_accounting_mismatch() {
        let mut collector = Collector::new();
        let taker = order(Side::Buy, "6", "3");
        let maker = order(Side::Sell, "6", "1");

        collector.begin(&taker);
        collector.push_fill(&maker, Some("1".parse().unwrap())).unwrap();
        let err = collector.push_trade(&taker, "2".parse().unwrap()).unwrap_err();

        assert!(matches!(err, BookError::AccountingMismatch { .. }));
    }

    #[test]
    fn test_commit_delivers_in_enqueue_order() {
        let mut collector = Collector::new();
        let mut store = MapStore::default();
        let handler = RecordingEventHandler::new();
        let o = order(Side::Buy, "1", "1");

        collector.begin(&o);
        collector.push_open(&o);
        collector.push_change(&o, None).unwrap();
        collector.push_cancel(&o);
        collector.commit(&mut store, &handler);

        assert_eq!(
            handler.kinds(),
            vec![EventKind::Open, EventKind::Change, EventKind::Cancel]
        );
        assert!(collector.pending_events().is_empty());
    }

    #[test]
    fn test_revert_discards_events_and_restores_taker() {
        let mut collector = Collector::new();
        let mut store = MapStore::default();
        let taker = order(Side::Buy, "1", "2");

        collector.begin(&taker);
        taker.fill("1".parse().unwrap()).unwrap();
        collector.push_change(&taker, None).unwrap();
        collector.revert(&mut store);

        assert_eq!(taker.filled(), Quantity::ZERO);
        assert_eq!(taker.state(), OrderState::New);
        assert!(collector.pending_events().is_empty());
    }

    #[test]
    fn test_clear_level_counts_distinct_levels() {
        let mut collector = Collector::new();
        let a = LevelKey {
            side: Side::Sell,
            price: "1".parse().unwrap(),
        };
        let b = LevelKey {
            side: Side::Sell,
            price: "2".parse().unwrap(),
        };

        assert_eq!(collector.clear_level(a), 1);
        assert_eq!(collector.clear_level(a), 1);
        assert_eq!(collector.clear_level(b), 2);
        assert_eq!(collector.cleared_levels(), &[a, b]);
    }

    #[test]
    fn test_commit_prunes_empty_touched_levels() {
        let mut collector = Collector::new();
        let mut store = MapStore::default();
        let price: Price = "3".parse().unwrap();
        store
            .levels
            .insert(price.raw_value(), PriceLevel::new(Side::Sell, price));

        collector.clear_level(LevelKey {
            side: Side::Sell,
            price,
        });
        collector.commit(&mut store, &RecordingEventHandler::new());

        assert!(store.levels.is_empty());
    }
}
