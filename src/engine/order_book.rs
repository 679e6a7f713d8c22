// ============================================================================
// Order Book
// Order-flag-aware matching over two price ladders
// ============================================================================

use crate::domain::{
    DepthLevel, ExchangeId, Instrument, LevelPair, Order, OrderBookConfig, OrderBookSnapshot,
    OrderId, Side, TopOfBook,
};
use crate::engine::book_side::{BookSide, Ladders};
use crate::engine::collector::{Collector, LevelKey};
use crate::engine::policy::{FillOutcome, OrderPolicy, Resolution};
use crate::engine::price_level::CrossStatus;
use crate::error::{BookError, BookResult};
use crate::interfaces::EventHandler;
use crate::numeric::Price;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;

/// Limit order book for one instrument on one exchange.
///
/// Every mutating call runs to completion on the caller's thread; results
/// reach the event handler only when the call's transaction commits.
pub struct OrderBook {
    /// Trading instrument (e.g., "BTC-USD")
    instrument: Arc<Instrument>,

    exchange: ExchangeId,

    ladders: Ladders,

    /// Staging area for the order currently being processed
    collector: Collector,

    /// Event handler for committed events
    event_handler: Arc<dyn EventHandler>,

    config: OrderBookConfig,
}

impl OrderBook {
    pub fn new(
        instrument: Arc<Instrument>,
        exchange: ExchangeId,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self::with_config(OrderBookConfig::new(instrument, exchange), event_handler)
    }

    pub fn with_config(config: OrderBookConfig, event_handler: Arc<dyn EventHandler>) -> Self {
        Self {
            instrument: Arc::clone(&config.instrument),
            exchange: config.exchange.clone(),
            ladders: Ladders::new(),
            collector: Collector::new(),
            event_handler,
            config,
        }
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    pub fn config(&self) -> &OrderBookConfig {
        &self.config
    }

    pub fn side(&self, side: Side) -> &BookSide {
        self.ladders.side(side)
    }

    // ========================================================================
    // Order Entry
    // ========================================================================

    /// Submit an order.
    ///
    /// Stop targets triggered along the way are replayed afterwards, in
    /// trigger order, each stamped with its trigger's timestamp. Once
    /// `max_cascade` targets have run, or a replay fails, the targets still
    /// waiting are cancelled.
    pub fn add(&mut self, order: Arc<Order>) -> BookResult<()> {
        let triggered = self.execute(&order)?;
        let mut pending = VecDeque::new();
        Self::enqueue_triggered(&order, triggered, &mut pending);

        let mut replayed = 0usize;
        while let Some(target) = pending.pop_front() {
            if replayed == self.config.max_cascade {
                tracing::warn!(
                    instrument = %self.instrument,
                    limit = self.config.max_cascade,
                    dropped = pending.len() + 1,
                    "secondary order cascade limit reached"
                );
                pending.push_front(target);
                let dropped = self.cancel_unreplayed(pending);
                return Err(BookError::CascadeLimit {
                    limit: self.config.max_cascade,
                    dropped,
                });
            }
            replayed += 1;

            match self.execute(&target) {
                Ok(triggered) => Self::enqueue_triggered(&target, triggered, &mut pending),
                Err(err) => {
                    pending.push_front(target);
                    self.cancel_unreplayed(pending);
                    return Err(err);
                },
            }
        }
        Ok(())
    }

    fn enqueue_triggered(
        trigger: &Order,
        triggered: Vec<Arc<Order>>,
        pending: &mut VecDeque<Arc<Order>>,
    ) {
        for target in triggered {
            tracing::debug!(
                trigger = ?trigger.id,
                target = ?target.id,
                "queueing triggered stop target"
            );
            target.set_timestamp(trigger.timestamp());
            pending.push_back(target);
        }
    }

    /// Cancel stop targets whose stops already fired but which never ran.
    fn cancel_unreplayed(&mut self, targets: VecDeque<Arc<Order>>) -> Vec<OrderId> {
        let mut dropped = Vec::with_capacity(targets.len());
        for target in targets {
            target.force_cancel();
            self.collector.push_cancel(&target);
            dropped.push(target.id);
        }
        self.collector
            .commit(&mut self.ladders, self.event_handler.as_ref());
        dropped
    }

    /// Process one order as a single transaction. Returns the stop targets
    /// it triggered, if its outcome was committed.
    fn execute(&mut self, order: &Arc<Order>) -> BookResult<Vec<Arc<Order>>> {
        self.validate_order(order)?;

        if order.is_stop_order() {
            return self.register_stop(order).map(|()| Vec::new());
        }

        self.collector.begin(order);
        let result = self.match_order(order);
        if let Err(err) = &result {
            tracing::warn!(order_id = ?order.id, error = %err, "matching failed, reverting");
            self.collector.revert(&mut self.ladders);
        }
        self.collector.reset();
        result
    }

    fn validate_order(&self, order: &Order) -> BookResult<()> {
        order.validate()?;

        if *order.instrument != *self.instrument {
            return Err(BookError::InstrumentMismatch {
                order_id: order.id,
                expected: self.instrument.to_string(),
                found: order.instrument.to_string(),
            });
        }
        if order.finished() {
            return Err(BookError::InvalidOrder {
                order_id: order.id,
                reason: "order is already finished".to_string(),
            });
        }
        Ok(())
    }

    /// Park a stop at its trigger price on the ladder its target will sweep.
    fn register_stop(&mut self, stop: &Arc<Order>) -> BookResult<()> {
        let side = stop.resting_side();
        tracing::debug!(
            stop = ?stop.id,
            side = ?side,
            trigger = %stop.price,
            "registering stop"
        );
        self.ladders.side_mut(side).stop_entry(stop.price).add(stop)
    }

    fn match_order(&mut self, order: &Arc<Order>) -> BookResult<Vec<Arc<Order>>> {
        let policy = OrderPolicy::for_order(order);
        let limit = policy.effective_price(order);
        let opposite = order.side.opposite();

        let mut triggered = Vec::new();
        let mut aborted = false;
        let mut cursor = None;

        while order.remaining().is_positive() {
            let Some(price) = self.ladders.side(opposite).next_price(cursor) else {
                break;
            };
            if !OrderPolicy::crosses(order.side, limit, price) {
                break;
            }
            cursor = Some(price);

            let key = LevelKey {
                side: opposite,
                price,
            };
            self.collector.touch(key);
            let book_side = self.ladders.side_mut(opposite);
            if let Some(stops) = book_side.stop_level_mut(price) {
                triggered.extend(stops.release());
            }
            let Some(level) = book_side.level_mut(price) else {
                continue;
            };

            let status = level.cross(order, &mut self.collector)?;
            let drained = !level.has_orders();
            if status == CrossStatus::Aborted {
                aborted = true;
                break;
            }
            if drained {
                self.collector.clear_level(key);
            }
        }

        let outcome = FillOutcome {
            filled: self.collector.taker_filled(order),
            remaining: order.remaining(),
            aborted,
        };
        let resolution = policy.resolve(outcome);
        tracing::debug!(
            order_id = ?order.id,
            policy = ?policy,
            filled = %outcome.filled,
            remaining = %outcome.remaining,
            cleared_levels = self.collector.cleared_levels().len(),
            resolution = ?resolution,
            "sweep resolved"
        );

        if resolution == Resolution::RevertAndCancel {
            self.collector.revert(&mut self.ladders);
            order.force_cancel();
            self.collector.push_cancel(order);
            self.collector
                .commit(&mut self.ladders, self.event_handler.as_ref());
            return Ok(Vec::new());
        }

        if self.collector.accumulated_volume().is_positive() {
            let filled = self.collector.taker_filled(order);
            self.collector.push_trade(order, filled)?;
        }

        match resolution {
            Resolution::CommitAndRest => self.rest(order)?,
            Resolution::CommitAndCancelRemainder => {
                order.force_cancel();
                self.collector.push_cancel(order);
            },
            Resolution::Commit | Resolution::RevertAndCancel => {},
        }

        self.collector
            .commit(&mut self.ladders, self.event_handler.as_ref());
        Ok(triggered)
    }

    fn rest(&mut self, order: &Arc<Order>) -> BookResult<()> {
        let key = LevelKey {
            side: order.side,
            price: order.price,
        };
        self.collector.touch(key);
        self.ladders
            .side_mut(order.side)
            .level_entry(order.price)
            .add(order, &mut self.collector)
    }

    /// Remove a resting order, or the pending target of a stop, and emit CANCEL.
    pub fn cancel(&mut self, order: &Order) -> BookResult<()> {
        let key = LevelKey {
            side: order.resting_side(),
            price: order.price,
        };
        let book_side = self.ladders.side_mut(key.side);
        let not_found = BookError::LevelNotFound { price: key.price };
        let removed = if order.is_stop_order() {
            book_side.stop_level_mut(key.price).ok_or(not_found)?.remove(order)
        } else {
            book_side.level_mut(key.price).ok_or(not_found)?.remove(order)
        };
        let Some(removed) = removed else {
            tracing::warn!(order_id = ?order.id, price = %order.price, "cancel target not found");
            return Err(BookError::OrderNotFound {
                order_id: order.id,
                price: order.price,
            });
        };

        removed.force_cancel();
        self.collector.reset();
        self.collector.push_cancel(&removed);
        self.collector.touch(key);
        self.collector
            .commit(&mut self.ladders, self.event_handler.as_ref());
        Ok(())
    }

    /// Amend the volume of a resting order and emit CHANGE.
    ///
    /// `order` names the resting order by id, side and price; only its
    /// volume may differ.
    pub fn change(&mut self, order: &Order) -> BookResult<()> {
        let reject = |reason: &str| {
            Err(BookError::InvalidAmendment {
                order_id: order.id,
                reason: reason.to_string(),
            })
        };
        if order.is_stop_order() {
            return reject("stop orders cannot be amended");
        }
        if !order.volume().is_positive() {
            return reject("volume must be positive");
        }

        let level = self
            .ladders
            .side_mut(order.side)
            .level_mut(order.price)
            .ok_or(BookError::LevelNotFound { price: order.price })?;

        self.collector.reset();
        if let Err(err) = level.modify(order, &mut self.collector) {
            tracing::warn!(order_id = ?order.id, error = %err, "change rejected");
            self.collector.reset();
            return Err(err);
        }
        self.collector
            .commit(&mut self.ladders, self.event_handler.as_ref());
        Ok(())
    }

    /// Resting order sharing `order.id`, or the pending target of a stop.
    pub fn find(&self, order: &Order) -> Option<Arc<Order>> {
        let book_side = self.ladders.side(order.resting_side());
        if order.is_stop_order() {
            let target = order.stop_target.as_ref()?;
            return book_side.stop_level(order.price)?.find(target.id).cloned();
        }
        book_side.level(order.price)?.find(order.id).cloned()
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    pub fn best_bid(&self) -> Option<Price> {
        self.ladders.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.ladders.asks.best_price()
    }

    pub fn top_of_book(&self) -> TopOfBook {
        self.level(0)
    }

    /// Bid and ask at depth index `n`, zero being the best.
    pub fn level(&self, n: usize) -> LevelPair {
        LevelPair {
            bid: self.ladders.bids.nth_level(n),
            ask: self.ladders.asks.nth_level(n),
        }
    }

    /// Aggregated level at an exact price, if orders rest there.
    pub fn level_at(&self, side: Side, price: Price) -> Option<DepthLevel> {
        let level = self.ladders.side(side).level(price)?;
        level.has_orders().then(|| DepthLevel {
            side,
            price,
            volume: level.volume(),
            order_count: level.len(),
        })
    }

    /// Up to `depth` levels per side, further capped by the configured
    /// `max_depth`.
    pub fn levels(&self, depth: usize) -> OrderBookSnapshot {
        let depth = self.config.max_depth.map_or(depth, |max| depth.min(max));
        OrderBookSnapshot::with_depth(
            Arc::clone(&self.instrument),
            self.exchange.clone(),
            self.ladders.bids.depth(depth),
            self.ladders.asks.depth(depth),
        )
    }

    pub fn spread(&self) -> Option<Price> {
        self.top_of_book().spread()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        Some((bid.to_decimal() + ask.to_decimal()) / Decimal::from(2))
    }

    /// Ask levels then bid levels, each best to worst.
    pub fn iter(&self) -> impl Iterator<Item = DepthLevel> + '_ {
        self.ladders
            .asks
            .depth_levels()
            .chain(self.ladders.bids.depth_levels())
    }

    /// True when no order rests on either side.
    pub fn is_empty(&self) -> bool {
        self.best_bid().is_none() && self.best_ask().is_none()
    }
}

impl<'a> IntoIterator for &'a OrderBook {
    type Item = DepthLevel;
    type IntoIter = Box<dyn Iterator<Item = DepthLevel> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("instrument", &self.instrument)
            .field("exchange", &self.exchange)
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .finish()
    }
}
