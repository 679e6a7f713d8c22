// ============================================================================
// Price Level
// Resting orders at one exact price, with revert staging
// ============================================================================

use crate::domain::order::state::OrderState;
use crate::domain::{Order, OrderFlag, OrderId, Side};
use crate::engine::collector::Collector;
use crate::error::{BookError, BookResult};
use crate::numeric::{Price, Quantity};
use std::collections::VecDeque;
use std::sync::Arc;

/// How a crossing attempt against one level ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossStatus {
    /// The taker was filled completely; its trade has been pushed.
    Filled,
    /// The level ran out of resting volume before the taker was filled.
    Exhausted,
    /// An all-or-none taker could not be completed here.
    Aborted,
}

/// A maker pulled off the queue during the current crossing attempt.
#[derive(Debug)]
struct StagedOrder {
    order: Arc<Order>,
    /// Volume credited to the maker during this attempt
    filled_delta: Quantity,
    state_before: OrderState,
    /// Maker went back to the head of the queue
    requeued: bool,
}

/// All resting orders at one price on one side of the book.
///
/// Orders are kept in arrival order; a partially filled maker is put back
/// at the head so it keeps its time priority.
#[derive(Debug)]
pub struct PriceLevel {
    side: Side,
    price: Price,
    orders: VecDeque<Arc<Order>>,
    staged: Vec<StagedOrder>,
    /// Remaining volume of every resting order
    volume: Quantity,
}

impl PriceLevel {
    pub fn new(side: Side, price: Price) -> Self {
        Self {
            side,
            price,
            orders: VecDeque::new(),
            staged: Vec::new(),
            volume: Quantity::ZERO,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn volume(&self) -> Quantity {
        self.volume
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn has_orders(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }

    pub fn find(&self, id: OrderId) -> Option<&Arc<Order>> {
        self.orders.iter().find(|order| order.id == id)
    }

    // ========================================================================
    // Add / Modify / Remove
    // ========================================================================

    /// Rest `order` here.
    ///
    /// An order whose id already rests here is treated as a volume amendment.
    /// Stops wait on a `StopLevel` instead.
    pub fn add(&mut self, order: &Arc<Order>, collector: &mut Collector) -> BookResult<()> {
        if order.is_stop_order() {
            return Err(BookError::InvalidOrder {
                order_id: order.id,
                reason: "stop orders cannot rest on a price level".to_string(),
            });
        }

        if self.find(order.id).is_some() {
            return self.modify(order, collector);
        }

        if !order.finished() {
            self.volume = self.volume.checked_add(order.remaining())?;
            order.mark_resting();
            self.orders.push_back(Arc::clone(order));
            collector.push_open(order);
        }
        Ok(())
    }

    /// Amend the volume of the resting order sharing `amended.id`.
    /// Price and side must not change.
    pub fn modify(&mut self, amended: &Order, collector: &mut Collector) -> BookResult<()> {
        let resting = self
            .find(amended.id)
            .cloned()
            .ok_or(BookError::OrderNotFound {
                order_id: amended.id,
                price: self.price,
            })?;

        let reject = |reason: &str| {
            Err(BookError::InvalidAmendment {
                order_id: amended.id,
                reason: reason.to_string(),
            })
        };
        if amended.side != resting.side || amended.price != resting.price {
            return reject("only volume may change");
        }
        let volume = amended.volume();
        if volume <= resting.filled() {
            return reject("volume must exceed filled volume");
        }

        let before = resting.remaining();
        resting.set_volume(volume);
        self.volume = self
            .volume
            .checked_sub(before)?
            .checked_add(resting.remaining())?;
        collector.push_change(&resting, None)
    }

    /// Take the order sharing `order.id` off the queue.
    pub fn remove(&mut self, order: &Order) -> Option<Arc<Order>> {
        let position = self.orders.iter().position(|resting| resting.id == order.id)?;
        let removed = self.orders.remove(position)?;
        self.volume = self.volume.saturating_sub_to_zero(removed.remaining());
        Some(removed)
    }

    // ========================================================================
    // Crossing
    // ========================================================================

    /// Match `taker` against the resting orders in time priority. All
    /// changes are staged until `commit` or `revert`.
    pub fn cross(&mut self, taker: &Arc<Order>, collector: &mut Collector) -> BookResult<CrossStatus> {
        if taker.filled() > taker.volume() {
            tracing::warn!(taker = ?taker.id, "crossing an overfilled taker");
            return Err(BookError::Overfill {
                order_id: taker.id,
                filled: taker.filled(),
                volume: taker.volume(),
            });
        }

        while taker.remaining().is_positive() {
            let Some(maker) = self.orders.pop_front() else {
                break;
            };
            let maker_remaining = maker.remaining();
            let to_fill = taker.remaining();
            self.staged.push(StagedOrder {
                order: Arc::clone(&maker),
                filled_delta: Quantity::ZERO,
                state_before: maker.state(),
                requeued: false,
            });

            if maker_remaining > to_fill {
                if maker.flag.is_all_or_nothing() {
                    tracing::trace!(maker = ?maker.id, price = %self.price, "killing maker that cannot fill whole");
                    self.volume = self.volume.saturating_sub_to_zero(maker_remaining);
                    maker.force_cancel();
                    collector.push_cancel(&maker);
                    continue;
                }

                self.execute(&maker, taker, to_fill)?;
                collector.push_fill(taker, None)?;
                collector.push_change(&maker, Some(to_fill))?;

                if maker.flag == OrderFlag::ImmediateOrCancel {
                    self.volume = self.volume.saturating_sub_to_zero(maker.remaining());
                    maker.force_cancel();
                    collector.push_cancel(&maker);
                } else {
                    self.requeue_last(maker);
                }
            } else if maker_remaining < to_fill {
                if taker.flag == OrderFlag::AllOrNone {
                    tracing::trace!(taker = ?taker.id, price = %self.price, "all-or-none taker cannot complete");
                    self.requeue_last(maker);
                    return Ok(CrossStatus::Aborted);
                }

                self.execute(&maker, taker, maker_remaining)?;
                collector.push_change(taker, None)?;
                collector.push_fill(&maker, Some(maker_remaining))?;
            } else {
                self.execute(&maker, taker, maker_remaining)?;
                collector.push_fill(taker, None)?;
                collector.push_fill(&maker, Some(maker_remaining))?;
            }
        }

        if taker.remaining().is_zero() {
            let filled = collector.taker_filled(taker);
            collector.push_trade(taker, filled)?;
            Ok(CrossStatus::Filled)
        } else {
            Ok(CrossStatus::Exhausted)
        }
    }

    /// Move `quantity` between the most recently staged maker and the taker.
    fn execute(&mut self, maker: &Arc<Order>, taker: &Arc<Order>, quantity: Quantity) -> BookResult<()> {
        tracing::trace!(
            maker = ?maker.id,
            taker = ?taker.id,
            price = %self.price,
            volume = %quantity,
            "execute"
        );
        maker.fill(quantity)?;
        if let Some(staged) = self.staged.last_mut() {
            staged.filled_delta = quantity;
        }
        taker.fill(quantity)?;
        self.volume = self.volume.saturating_sub_to_zero(quantity);
        Ok(())
    }

    fn requeue_last(&mut self, maker: Arc<Order>) {
        if let Some(staged) = self.staged.last_mut() {
            staged.requeued = true;
        }
        self.orders.push_front(maker);
    }

    // ========================================================================
    // Commit / Revert
    // ========================================================================

    /// Forget staged state; consumed makers are gone for good.
    pub fn commit(&mut self) {
        self.staged.clear();
    }

    /// Restore the queue and every maker's `filled` and state to what they
    /// were before the crossing attempt.
    pub fn revert(&mut self) {
        while let Some(staged) = self.staged.pop() {
            if staged.requeued
                && self
                    .orders
                    .front()
                    .is_some_and(|front| Arc::ptr_eq(front, &staged.order))
            {
                self.orders.pop_front();
            }
            let filled = staged.order.filled().saturating_sub_to_zero(staged.filled_delta);
            staged.order.restore(filled, staged.state_before);
            self.orders.push_front(staged.order);
        }

        self.volume = self.orders.iter().map(|order| order.remaining()).sum();
    }
}
