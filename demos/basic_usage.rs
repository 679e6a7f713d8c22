// ============================================================================
// Basic Usage Example
// ============================================================================

use limit_order_book::numeric::{Price, Quantity};
use limit_order_book::prelude::*;
use std::sync::Arc;

fn main() -> BookResult<()> {
    println!("=== Limit Order Book Example ===\n");

    let mut instruments = InstrumentRegistry::new();
    let btc = instruments.get_or_register("BTC-USD", InstrumentType::Pair);

    let handler = Arc::new(RecordingEventHandler::new());
    let mut book = OrderBookBuilder::new(Arc::clone(&btc))
        .on_exchange(ExchangeId::new("coinbase"))
        .with_max_depth(10)
        .build(handler.clone())?;

    println!("Created order book for {} on {}\n", btc, book.exchange());

    // Add sell orders at different prices
    println!("Adding sell orders...");
    for i in 0i64..5 {
        let sell = Order::limit(
            Arc::clone(&btc),
            Side::Sell,
            Price::from_integer(50_000 + i * 100)?,
            Quantity::from_integer(1)?,
        );
        book.add(Arc::new(sell))?;
    }

    // Add buy orders
    println!("Adding buy orders...");
    for i in 0i64..5 {
        let buy = Order::limit(
            Arc::clone(&btc),
            Side::Buy,
            Price::from_integer(49_900 - i * 100)?,
            Quantity::from_integer(1)?,
        );
        book.add(Arc::new(buy))?;
    }

    // A stop that buys 1 more once 50_100 trades
    let stop = Order::stop(
        Price::from_integer(50_100)?,
        Order::market(Arc::clone(&btc), Side::Buy, Quantity::from_integer(1)?),
    );
    book.add(Arc::new(stop))?;

    print_snapshot(&book.levels(5));

    // Immediate-or-cancel buy crossing the first two ask levels
    println!("\n=== Submitting IOC Order ===");
    handler.drain();
    let ioc = Arc::new(
        Order::limit(
            Arc::clone(&btc),
            Side::Buy,
            Price::from_integer(50_100)?,
            Quantity::from_integer(3)?,
        )
        .with_flag(OrderFlag::ImmediateOrCancel),
    );
    book.add(Arc::clone(&ioc))?;

    println!("\nEvents generated:");
    for event in handler.drain() {
        match &event {
            BookEvent::Trade(trade) => println!(
                "  Trade: {} @ {} (makers: {})",
                trade.volume,
                trade.price,
                trade.maker_fills.len()
            ),
            other => {
                if let Some(order) = other.order() {
                    println!(
                        "  {:?}: {:?} {:?} {} filled {}/{}",
                        other.kind(),
                        order.order_type,
                        order.side,
                        order.price,
                        order.filled(),
                        order.volume()
                    );
                }
            },
        }
    }
    println!("IOC order final state: {:?}", ioc.state());

    // Final snapshot
    println!("\n=== Final Order Book ===");
    print_snapshot(&book.levels(10));
    Ok(())
}

fn print_snapshot(snapshot: &OrderBookSnapshot) {
    println!("\nBids:");
    for level in &snapshot.bids {
        println!("  {} @ {} ({} orders)", level.volume, level.price, level.order_count);
    }

    println!("\nAsks:");
    for level in &snapshot.asks {
        println!("  {} @ {} ({} orders)", level.volume, level.price, level.order_count);
    }

    println!("\nSpread: {:?}", snapshot.spread.map(|spread| spread.to_string()));
    println!("Mid Price: {:?}", snapshot.mid_price);
}
