//! Capability traits for hardware and network access.
//!
//! The control core consumes abstracted operations only: read a pin, drive
//! a motor, read the clock, exchange a datagram. Concrete implementations
//! live with the platform (or in [`crate::hal::mock`] for tests).
//!
//! # Submodules
//!
//! - `hardware`: sensor inputs, motor drive, clock, operator lever
//! - `network`: non-blocking datagram transport for guard coordination

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
