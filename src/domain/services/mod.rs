pub mod events;
pub mod placement;
