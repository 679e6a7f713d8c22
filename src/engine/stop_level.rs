// ============================================================================
// Stop Level
// Stop targets waiting for a taker to cross one trigger price
// ============================================================================

use crate::domain::{Order, OrderId};
use crate::error::{BookError, BookResult};
use crate::numeric::Price;
use smallvec::SmallVec;
use std::sync::Arc;

/// Stop targets released by crossing a trigger price.
pub type TriggeredStops = SmallVec<[Arc<Order>; 4]>;

/// Pending stop targets at one trigger price.
///
/// Kept in a map of their own next to the resting orders, so quoting the
/// best price never walks past levels that only hold stops.
#[derive(Debug)]
pub struct StopLevel {
    price: Price,
    pending: Vec<Arc<Order>>,
    /// Released during the current transaction
    staged: Vec<Arc<Order>>,
}

impl StopLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            pending: Vec::new(),
            staged: Vec::new(),
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Targets in registration order
    pub fn pending(&self) -> &[Arc<Order>] {
        &self.pending
    }

    /// Pending target with id `target_id`.
    pub fn find(&self, target_id: OrderId) -> Option<&Arc<Order>> {
        self.pending.iter().find(|target| target.id == target_id)
    }

    /// Register the target of `stop`. A target already waiting here is kept once.
    pub fn add(&mut self, stop: &Order) -> BookResult<()> {
        let target = stop.stop_target.as_ref().ok_or_else(|| BookError::InvalidOrder {
            order_id: stop.id,
            reason: "stop order without a target".to_string(),
        })?;
        if self.find(target.id).is_none() {
            self.pending.push(Arc::clone(target));
        }
        Ok(())
    }

    /// Drop the pending target of `stop`. Returns the target.
    pub fn remove(&mut self, stop: &Order) -> Option<Arc<Order>> {
        let target = stop.stop_target.as_ref()?;
        let position = self
            .pending
            .iter()
            .position(|pending| pending.id == target.id)?;
        Some(self.pending.remove(position))
    }

    /// Release every pending target. The release is staged until `commit`
    /// or `revert`.
    pub fn release(&mut self) -> TriggeredStops {
        let triggered: TriggeredStops = self.pending.drain(..).collect();
        if !triggered.is_empty() {
            tracing::trace!(price = %self.price, count = triggered.len(), "stops released");
        }
        self.staged.extend(triggered.iter().cloned());
        triggered
    }

    pub fn commit(&mut self) {
        self.staged.clear();
    }

    /// Put released targets back ahead of anything registered since.
    pub fn revert(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        let mut restored = std::mem::take(&mut self.staged);
        restored.append(&mut self.pending);
        self.pending = restored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, InstrumentType, Side};

    fn stop(trigger: &str) -> Order {
        let instrument = Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair));
        let target = Order::market(instrument, Side::Buy, "1".parse().unwrap());
        Order::stop(trigger.parse().unwrap(), target)
    }

    #[test]
    fn test_add_keeps_target_once() {
        let first = stop("10");
        let mut level = StopLevel::new(first.price);
        level.add(&first).unwrap();
        level.add(&first).unwrap();
        level.add(&stop("10")).unwrap();

        assert_eq!(level.len(), 2);
        let target_id = first.stop_target.as_ref().unwrap().id;
        assert_eq!(level.pending()[0].id, target_id);
        assert!(level.find(target_id).is_some());
    }

    #[test]
    fn test_release_then_revert_restores_order() {
        let first = stop("10");
        let second = stop("10");
        let mut level = StopLevel::new(first.price);
        level.add(&first).unwrap();
        level.add(&second).unwrap();

        let triggered = level.release();
        assert_eq!(triggered.len(), 2);
        assert!(level.is_empty());

        let late = stop("10");
        level.add(&late).unwrap();
        level.revert();

        let ids: Vec<_> = level.pending().iter().map(|target| target.id).collect();
        let expected: Vec<_> = [&first, &second, &late]
            .iter()
            .map(|stop| stop.stop_target.as_ref().unwrap().id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_commit_forgets_released_targets() {
        let only = stop("10");
        let mut level = StopLevel::new(only.price);
        level.add(&only).unwrap();

        level.release();
        level.commit();
        level.revert();
        assert!(level.is_empty());
    }

    #[test]
    fn test_remove_returns_target() {
        let only = stop("10");
        let mut level = StopLevel::new(only.price);
        level.add(&only).unwrap();

        let removed = level.remove(&only).unwrap();
        assert_eq!(Some(removed.id), only.stop_target.as_ref().map(|t| t.id));
        assert!(level.remove(&only).is_none());
        assert!(level.is_empty());
    }
}
