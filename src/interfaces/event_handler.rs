// ============================================================================
// Event Handler Interface
// The single outbound channel for committed matching results
// ============================================================================

use crate::domain::{Order, Trade};
use parking_lot::Mutex;
use std::sync::Arc;

/// Kinds of events a book emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Change,
    Fill,
    Cancel,
    Trade,
}

/// Events released by a committed transaction.
///
/// Order events carry the shared order handle, so a handler observes the
/// order's state as of delivery.
#[derive(Debug, Clone)]
pub enum BookEvent {
    /// Order rests on the book
    Open(Arc<Order>),

    /// Order partially filled or its volume amended
    Change(Arc<Order>),

    /// Order fully filled
    Fill(Arc<Order>),

    /// Order cancelled (explicitly or by flag policy)
    Cancel(Arc<Order>),

    /// Aggregated execution of one taker against its makers
    Trade(Trade),
}

impl BookEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BookEvent::Open(_) => EventKind::Open,
            BookEvent::Change(_) => EventKind::Change,
            BookEvent::Fill(_) => EventKind::Fill,
            BookEvent::Cancel(_) => EventKind::Cancel,
            BookEvent::Trade(_) => EventKind::Trade,
        }
    }

    pub fn order(&self) -> Option<&Arc<Order>> {
        match self {
            BookEvent::Open(order)
            | BookEvent::Change(order)
            | BookEvent::Fill(order)
            | BookEvent::Cancel(order) => Some(order),
            BookEvent::Trade(_) => None,
        }
    }

    pub fn trade(&self) -> Option<&Trade> {
        match self {
            BookEvent::Trade(trade) => Some(trade),
            _ => None,
        }
    }
}

/// Event handler trait for committed book events.
/// Implementations feed strategies, risk, persistence or telemetry.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: BookEvent);

    /// Batch delivery; events arrive in the order they were generated.
    fn on_events(&self, events: Vec<BookEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

impl<F> EventHandler for F
where
    F: Fn(BookEvent) + Send + Sync,
{
    fn on_event(&self, event: BookEvent) {
        self(event)
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: BookEvent) {}
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: BookEvent) {
        match &event {
            BookEvent::Trade(trade) => tracing::debug!(
                price = %trade.price,
                volume = %trade.volume,
                makers = trade.maker_fills.len(),
                "book trade"
            ),
            other => {
                if let Some(order) = other.order() {
                    tracing::debug!(
                        kind = ?other.kind(),
                        order_id = ?order.id,
                        side = ?order.side,
                        price = %order.price,
                        filled = %order.filled(),
                        volume = %order.volume(),
                        "book event"
                    );
                }
            },
        }
    }
}

/// Keeps every delivered event in memory.
#[derive(Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<BookEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BookEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(BookEvent::kind).collect()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| event.trade().cloned())
            .collect()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<BookEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: BookEvent) {
        self.events.lock().push(event);
    }

    fn on_events(&self, events: Vec<BookEvent>) {
        self.events.lock().extend(events);
    }
}

/// Forwards events to a crossbeam channel, for a consumer thread.
pub struct ChannelEventHandler {
    sender: crossbeam::channel::Sender<BookEvent>,
}

impl ChannelEventHandler {
    pub fn new(sender: crossbeam::channel::Sender<BookEvent>) -> Self {
        Self { sender }
    }

    /// Handler plus the unbounded receiver it feeds.
    pub fn unbounded() -> (Self, crossbeam::channel::Receiver<BookEvent>) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl EventHandler for ChannelEventHandler {
    fn on_event(&self, event: BookEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("event receiver dropped, discarding book event");
        }
    }
}

/// Forwards events into a tokio event loop.
#[cfg(feature = "async")]
pub struct TokioEventHandler {
    sender: tokio::sync::mpsc::UnboundedSender<BookEvent>,
}

#[cfg(feature = "async")]
impl TokioEventHandler {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<BookEvent>) -> Self {
        Self { sender }
    }
}

#[cfg(feature = "async")]
impl EventHandler for TokioEventHandler {
    fn on_event(&self, event: BookEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("event loop closed, discarding book event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Instrument, InstrumentType, Side};

    fn order() -> Arc<Order> {
        Arc::new(Order::limit(
            Arc::new(Instrument::new("BTC-USD", InstrumentType::Pair)),
            Side::Buy,
            "1".parse().unwrap(),
            "1".parse().unwrap(),
        ))
    }

    #[test]
    fn test_noop_handler() {
        NoOpEventHandler.on_event(BookEvent::Open(order()));
    }

    #[test]
    fn test_recording_handler_keeps_order() {
        let handler = RecordingEventHandler::new();
        let o = order();
        handler.on_events(vec![BookEvent::Open(Arc::clone(&o)), BookEvent::Cancel(o)]);

        assert_eq!(handler.kinds(), vec![EventKind::Open, EventKind::Cancel]);
        assert_eq!(handler.drain().len(), 2);
        assert!(handler.events().is_empty());
    }

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let handler = move |_event: BookEvent| *counter.lock() += 1;

        handler.on_events(vec![BookEvent::Open(order()), BookEvent::Fill(order())]);
        assert_eq!(*seen.lock(), 2);
    }

    #[test]
    fn test_channel_handler() {
        let (handler, receiver) = ChannelEventHandler::unbounded();
        handler.on_event(BookEvent::Change(order()));

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.kind(), EventKind::Change);
    }
}
