// ============================================================================
// Order Book Snapshots
// Read-only views of aggregated depth
// ============================================================================

use crate::domain::instrument::{ExchangeId, Instrument};
use crate::domain::Side;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Aggregated volume resting at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DepthLevel {
    pub side: Side,
    pub price: Price,
    pub volume: Quantity,
    pub order_count: usize,
}

/// The bid and ask level at the same depth index. A missing side is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelPair {
    pub bid: Option<DepthLevel>,
    pub ask: Option<DepthLevel>,
}

/// Best bid and best ask.
pub type TopOfBook = LevelPair;

impl LevelPair {
    pub fn get(&self, side: Side) -> Option<&DepthLevel> {
        match side {
            Side::Buy => self.bid.as_ref(),
            Side::Sell => self.ask.as_ref(),
        }
    }

    /// `(price, volume)` for `side`
    pub fn quote(&self, side: Side) -> Option<(Price, Quantity)> {
        self.get(side).map(|level| (level.price, level.volume))
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => ask.price.checked_sub(bid.price).ok(),
            _ => None,
        }
    }

    pub fn is_crossed(&self) -> bool {
        matches!((self.bid, self.ask), (Some(bid), Some(ask)) if bid.price >= ask.price)
    }
}

/// Immutable snapshot of the order book state
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    pub instrument: Arc<Instrument>,
    pub exchange: ExchangeId,
    /// Bid levels, best (highest) first
    pub bids: Vec<DepthLevel>,
    /// Ask levels, best (lowest) first
    pub asks: Vec<DepthLevel>,
    /// Current spread (ask - bid)
    pub spread: Option<Price>,
    /// Mid price, at full decimal precision
    pub mid_price: Option<Decimal>,
}

impl OrderBookSnapshot {
    pub fn with_depth(
        instrument: Arc<Instrument>,
        exchange: ExchangeId,
        bids: Vec<DepthLevel>,
        asks: Vec<DepthLevel>,
    ) -> Self {
        let top = LevelPair {
            bid: bids.first().copied(),
            ask: asks.first().copied(),
        };
        let mid_price = match (top.bid, top.ask) {
            (Some(bid), Some(ask)) => {
                Some((bid.price.to_decimal() + ask.price.to_decimal()) / Decimal::from(2))
            },
            _ => None,
        };

        Self {
            instrument,
            exchange,
            bids,
            asks,
            spread: top.spread(),
            mid_price,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    pub fn total_bid_volume(&self) -> Quantity {
        self.bids.iter().map(|level| level.volume).sum()
    }

    pub fn total_ask_volume(&self) -> Quantity {
        self.asks.iter().map(|level| level.volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentType;

    fn level(side: Side, price: &str, volume: &str) -> DepthLevel {
        DepthLevel {
            side,
            price: price.parse().unwrap(),
            volume: volume.parse().unwrap(),
            order_count: 1,
        }
    }

    #[test]
    fn test_order_book_snapshot() {
        let snapshot = OrderBookSnapshot::with_depth(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            ExchangeId::default(),
            vec![level(Side::Buy, "50000", "1"), level(Side::Buy, "49999", "2")],
            vec![level(Side::Sell, "50100", "2")],
        );

        assert_eq!(snapshot.best_bid(), Some("50000".parse().unwrap()));
        assert_eq!(snapshot.best_ask(), Some("50100".parse().unwrap()));
        assert_eq!(snapshot.spread, Some("100".parse().unwrap()));
        assert_eq!(snapshot.mid_price, Some(Decimal::from(50050)));
        assert_eq!(snapshot.total_bid_volume(), "3".parse().unwrap());
    }

    #[test]
    fn test_one_sided_snapshot() {
        let snapshot = OrderBookSnapshot::with_depth(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            ExchangeId::default(),
            Vec::new(),
            vec![level(Side::Sell, "10", "1")],
        );

        assert_eq!(snapshot.spread, None);
        assert_eq!(snapshot.mid_price, None);
    }

    #[test]
    fn test_level_pair_quote_and_cross() {
        let pair = LevelPair {
            bid: Some(level(Side::Buy, "4", "1")),
            ask: Some(level(Side::Sell, "4.5", "3")),
        };

        assert_eq!(
            pair.quote(Side::Sell),
            Some(("4.5".parse().unwrap(), "3".parse().unwrap()))
        );
        assert!(!pair.is_crossed());
        assert!(LevelPair::default().quote(Side::Buy).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_serializes() {
        let snapshot = OrderBookSnapshot::with_depth(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            ExchangeId::new("coinbase"),
            vec![level(Side::Buy, "99", "1")],
            vec![level(Side::Sell, "101", "2")],
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"BTC-USD\""));
        assert!(json.contains("\"coinbase\""));

        let back: OrderBookSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bids, snapshot.bids);
        assert_eq!(back.spread, snapshot.spread);
    }
}
