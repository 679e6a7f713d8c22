// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod instrument;
pub mod order;
pub mod snapshot;
pub mod trade;

pub use config::{OrderBookConfig, DEFAULT_MAX_CASCADE};
pub use instrument::{ExchangeId, Instrument, InstrumentRegistry, InstrumentType};
pub use order::{Order, OrderFlag, OrderId, OrderType, Side};
pub use snapshot::{DepthLevel, LevelPair, OrderBookSnapshot, TopOfBook};
pub use trade::{MakerFill, Trade};

// Re-export state machine
pub use order::state::{OrderState, OrderStateTransition};
