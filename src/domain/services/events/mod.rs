//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the event side of the placement service, allowing for non-blocking
// event emission once a placement has committed.
//
// | Component                | Description                                                |
// |--------------------------|-----------------------------------------------------------|
// | MarketEvent              | Enum representing all possible events in the system       |
// | EventBus                 | Central hub for publishing and subscribing to events      |
//--------------------------------------------------------------------------------------------------

mod event_bus;
mod event_types;

// Re-exports
pub use event_bus::EventBus;
pub use event_types::{EventError, EventResult, MarketEvent};
