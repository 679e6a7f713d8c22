// ============================================================================
// Book Side
// One sorted ladder of price levels (bids or asks)
// ============================================================================

use crate::domain::{DepthLevel, Side};
use crate::engine::collector::{LevelKey, LevelStore};
use crate::engine::price_level::PriceLevel;
use crate::engine::stop_level::StopLevel;
use crate::numeric::Price;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Price levels of one side, keyed by exact price.
///
/// The maps are ascending; bids read them from the back so that iteration is
/// always best price first. Stops wait on this ladder at their trigger price,
/// in a map of their own.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    stops: BTreeMap<Price, StopLevel>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            stops: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Level at `price`, created empty when missing.
    pub fn level_entry(&mut self, price: Price) -> &mut PriceLevel {
        let side = self.side;
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(side, price))
    }

    pub fn stop_level(&self, price: Price) -> Option<&StopLevel> {
        self.stops.get(&price)
    }

    pub fn stop_level_mut(&mut self, price: Price) -> Option<&mut StopLevel> {
        self.stops.get_mut(&price)
    }

    /// Stop level at `price`, created empty when missing.
    pub fn stop_entry(&mut self, price: Price) -> &mut StopLevel {
        self.stops
            .entry(price)
            .or_insert_with(|| StopLevel::new(price))
    }

    /// Best price holding resting orders.
    ///
    /// Empty levels are pruned on every commit, so outside a sweep this is
    /// the first level in priority order.
    pub fn best_price(&self) -> Option<Price> {
        self.levels_by_priority()
            .find(|level| level.has_orders())
            .map(PriceLevel::price)
    }

    /// Next price in priority order strictly after `after`, or the first one
    /// when `after` is `None`, holding resting orders or pending stops.
    pub fn next_price(&self, after: Option<Price>) -> Option<Price> {
        let orders = next_key(&self.levels, self.side, after);
        let stops = next_key(&self.stops, self.side, after);
        match (orders, stops) {
            (Some(order_price), Some(stop_price)) => Some(match self.side {
                Side::Sell => order_price.min(stop_price),
                Side::Buy => order_price.max(stop_price),
            }),
            (orders, stops) => orders.or(stops),
        }
    }

    /// All levels, best price first.
    pub fn levels_by_priority(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    /// Aggregated view of the levels holding resting orders, best first.
    pub fn depth_levels(&self) -> impl Iterator<Item = DepthLevel> + '_ {
        self.levels_by_priority()
            .filter(|level| level.has_orders())
            .map(|level| DepthLevel {
                side: level.side(),
                price: level.price(),
                volume: level.volume(),
                order_count: level.len(),
            })
    }

    /// Get depth at N levels
    pub fn depth(&self, num_levels: usize) -> Vec<DepthLevel> {
        self.depth_levels().take(num_levels).collect()
    }

    /// The `n`-th level with resting orders, zero being the best.
    pub fn nth_level(&self, n: usize) -> Option<DepthLevel> {
        self.depth_levels().nth(n)
    }

    /// Remove the order level and stop level at `price` that no longer hold
    /// anything. Returns whether either went away.
    pub fn prune_if_empty(&mut self, price: Price) -> bool {
        let mut pruned = false;
        if self.levels.get(&price).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&price);
            pruned = true;
        }
        if self.stops.get(&price).is_some_and(StopLevel::is_empty) {
            self.stops.remove(&price);
            pruned = true;
        }
        pruned
    }

    /// Number of price levels with resting orders
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of trigger prices with pending stops
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.stops.is_empty()
    }
}

fn next_key<V>(map: &BTreeMap<Price, V>, side: Side, after: Option<Price>) -> Option<Price> {
    match (side, after) {
        (Side::Sell, None) => map.keys().next().copied(),
        (Side::Buy, None) => map.keys().next_back().copied(),
        (Side::Sell, Some(price)) => map
            .range((Bound::Excluded(price), Bound::Unbounded))
            .next()
            .map(|(price, _)| *price),
        (Side::Buy, Some(price)) => map.range(..price).next_back().map(|(price, _)| *price),
    }
}

/// Both sides of a book.
#[derive(Debug)]
pub struct Ladders {
    pub bids: BookSide,
    pub asks: BookSide,
}

impl Ladders {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

impl Default for Ladders {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelStore for Ladders {
    fn commit_level(&mut self, key: LevelKey) {
        let side = self.side_mut(key.side);
        if let Some(level) = side.level_mut(key.price) {
            level.commit();
        }
        if let Some(stops) = side.stop_level_mut(key.price) {
            stops.commit();
        }
        side.prune_if_empty(key.price);
    }

    fn revert_level(&mut self, key: LevelKey) {
        let side = self.side_mut(key.side);
        if let Some(level) = side.level_mut(key.price) {
            level.revert();
        }
        if let Some(stops) = side.stop_level_mut(key.price) {
            stops.revert();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, InstrumentType, Order};
    use crate::engine::collector::Collector;
    use std::sync::Arc;

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn rest(book_side: &mut BookSide, price: &str, volume: &str) -> Arc<Order> {
        let order = Arc::new(Order::limit(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            book_side.side(),
            px(price),
            volume.parse().unwrap(),
        ));
        let mut collector = Collector::new();
        book_side
            .level_entry(order.price)
            .add(&order, &mut collector)
            .unwrap();
        order
    }

    #[test]
    fn test_bid_priority_is_descending() {
        let mut bids = BookSide::new(Side::Buy);
        rest(&mut bids, "50000", "1");
        rest(&mut bids, "50100", "1");
        rest(&mut bids, "49900", "2");

        assert_eq!(bids.best_price(), Some(px("50100")));
        let prices: Vec<_> = bids.depth(3).iter().map(|level| level.price).collect();
        assert_eq!(prices, vec![px("50100"), px("50000"), px("49900")]);
        assert_eq!(bids.next_price(Some(px("50100"))), Some(px("50000")));
    }

    #[test]
    fn test_ask_priority_is_ascending() {
        let mut asks = BookSide::new(Side::Sell);
        rest(&mut asks, "10", "1");
        rest(&mut asks, "9.5", "1");

        assert_eq!(asks.best_price(), Some(px("9.5")));
        assert_eq!(asks.next_price(None), Some(px("9.5")));
        assert_eq!(asks.next_price(Some(px("9.5"))), Some(px("10")));
        assert_eq!(asks.next_price(Some(px("10"))), None);
    }

    #[test]
    fn test_depth_aggregates_volume() {
        let mut asks = BookSide::new(Side::Sell);
        rest(&mut asks, "10", "1");
        rest(&mut asks, "10", "2.5");

        let top = asks.nth_level(0).unwrap();
        assert_eq!(top.volume, "3.5".parse().unwrap());
        assert_eq!(top.order_count, 2);
        assert!(asks.nth_level(1).is_none());
    }

    #[test]
    fn test_prune_keeps_non_empty_levels() {
        let mut asks = BookSide::new(Side::Sell);
        let order = rest(&mut asks, "10", "1");

        assert!(!asks.prune_if_empty(px("10")));
        asks.level_mut(px("10")).unwrap().remove(&order);
        assert!(asks.prune_if_empty(px("10")));
        assert!(asks.is_empty());
    }

    fn register_stop(book_side: &mut BookSide, trigger: &str) -> Order {
        let instrument = Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair));
        let target = Order::market(instrument, book_side.side().opposite(), "1".parse().unwrap());
        let stop = Order::stop(px(trigger), target);
        book_side.stop_entry(stop.price).add(&stop).unwrap();
        stop
    }

    #[test]
    fn test_stops_stay_out_of_quotes() {
        let mut asks = BookSide::new(Side::Sell);
        register_stop(&mut asks, "11");
        register_stop(&mut asks, "12");
        rest(&mut asks, "13", "1");

        assert_eq!(asks.best_price(), Some(px("13")));
        assert_eq!(asks.depth(5).len(), 1);
        assert_eq!(asks.level_count(), 1);
        assert_eq!(asks.stop_count(), 2);
    }

    #[test]
    fn test_next_price_interleaves_stops_and_orders() {
        let mut bids = BookSide::new(Side::Buy);
        rest(&mut bids, "10", "1");
        register_stop(&mut bids, "9");
        register_stop(&mut bids, "10");
        rest(&mut bids, "8", "1");

        let mut prices = Vec::new();
        let mut cursor = None;
        while let Some(price) = bids.next_price(cursor) {
            prices.push(price);
            cursor = Some(price);
        }
        assert_eq!(prices, vec![px("10"), px("9"), px("8")]);
    }

    #[test]
    fn test_prune_drops_emptied_stop_level() {
        let mut asks = BookSide::new(Side::Sell);
        let stop = register_stop(&mut asks, "12");

        assert!(!asks.prune_if_empty(px("12")));
        asks.stop_level_mut(px("12")).unwrap().remove(&stop);
        assert!(asks.prune_if_empty(px("12")));
        assert!(asks.is_empty());
    }
}
