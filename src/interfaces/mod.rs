// ============================================================================
// Interfaces Module
// Contains the outbound event contract of the book
// ============================================================================

mod event_handler;

#[cfg(feature = "async")]
pub use event_handler::TokioEventHandler;
pub use event_handler::{
    BookEvent, ChannelEventHandler, EventHandler, EventKind, LoggingEventHandler,
    NoOpEventHandler, RecordingEventHandler,
};
