// ============================================================================
// Trade Domain Model
// ============================================================================

use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::Order;

/// One maker's contribution to a trade.
#[derive(Debug, Clone)]
pub struct MakerFill {
    pub order: Arc<Order>,
    pub price: Price,
    pub volume: Quantity,
}

/// A completed match episode: one taker against one or more makers,
/// reported at the volume-weighted average price.
#[derive(Debug, Clone)]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    /// VWAP across every maker consumed
    pub price: Price,

    /// Total executed volume
    pub volume: Quantity,

    /// The aggressive (incoming) order
    pub taker_order: Arc<Order>,

    /// Makers in the order they were consumed
    pub maker_fills: Vec<MakerFill>,

    pub timestamp: DateTime<Utc>,

    my_order: Option<Arc<Order>>,
}

impl Trade {
    pub fn new(
        price: Price,
        volume: Quantity,
        taker_order: Arc<Order>,
        maker_fills: Vec<MakerFill>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            price,
            volume,
            taker_order,
            maker_fills,
            timestamp: Utc::now(),
            my_order: None,
        }
    }

    pub fn maker_orders(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.maker_fills.iter().map(|fill| &fill.order)
    }

    /// Volume this trade took from `order`, zero if it was not a maker here.
    pub fn volume_for(&self, order: &Order) -> Quantity {
        self.maker_fills
            .iter()
            .filter(|fill| fill.order.id == order.id)
            .map(|fill| fill.volume)
            .sum()
    }

    /// `price × volume` at full decimal precision.
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.price.to_decimal() * self.volume.to_decimal()
    }

    /// Strategy order this trade belongs to, if a caller tagged one.
    pub fn my_order(&self) -> Option<&Arc<Order>> {
        self.my_order.as_ref()
    }

    pub fn set_my_order(&mut self, order: Arc<Order>) {
        self.my_order = Some(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, InstrumentType, Side};

    fn order(side: Side, price: &str, volume: &str) -> Arc<Order> {
        Arc::new(Order::limit(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            side,
            price.parse().unwrap(),
            volume.parse().unwrap(),
        ))
    }

    #[test]
    fn test_trade_creation() {
        let taker = order(Side::Buy, "101", "3");
        let maker_a = order(Side::Sell, "100", "1");
        let maker_b = order(Side::Sell, "101", "2");

        let trade = Trade::new(
            "100.6667".parse().unwrap(),
            "3".parse().unwrap(),
            Arc::clone(&taker),
            vec![
                MakerFill {
                    order: Arc::clone(&maker_a),
                    price: maker_a.price,
                    volume: "1".parse().unwrap(),
                },
                MakerFill {
                    order: Arc::clone(&maker_b),
                    price: maker_b.price,
                    volume: "2".parse().unwrap(),
                },
            ],
        );

        let makers: Vec<_> = trade.maker_orders().map(|o| o.id).collect();
        assert_eq!(makers, vec![maker_a.id, maker_b.id]);
        assert_eq!(trade.volume_for(&maker_b), "2".parse().unwrap());
        assert_eq!(trade.volume_for(&taker), Quantity::ZERO);
        assert_eq!(trade.notional(), rust_decimal::Decimal::new(3_020_001, 4));
    }

    #[test]
    fn test_my_order_back_reference() {
        let taker = order(Side::Buy, "1", "1");
        let mut trade = Trade::new(Price::ONE, Quantity::ONE, Arc::clone(&taker), Vec::new());
        assert!(trade.my_order().is_none());

        trade.set_my_order(Arc::clone(&taker));
        assert_eq!(trade.my_order().map(|o| o.id), Some(taker.id));
    }
}
