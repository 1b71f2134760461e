//! Datagram capability for guard-style coordination.
//!
//! The guard protocol exchanges short ASCII commands between two endpoints
//! with no shared memory. The core only needs two operations: send a short
//! string somewhere, and poll for a received string without blocking.
//! Socket setup, WiFi association, and addressing live outside the core;
//! an [`Endpoint`] is an opaque handle the transport hands back with each
//! received message.
//!
//! # Design
//!
//! - `send` is fire-and-forget. Datagrams may be lost or duplicated; every
//!   guard command is idempotent, so no acknowledgement layer is needed.
//! - `recv` never blocks. `None` means "no message this tick", which is the
//!   normal steady-state result and not an error.
//!
//! ```text
//! controller                      actuator
//!    | --- MARCO (broadcast) ------> |
//!    | <-- POLO --------------------- |
//!    | --- CONTROL F 40 -----------> |
//!    | --- AUTO -------------------> |
//!    | <-- BOUNCE ------------------- |
//!    | <-- FORWARD_END -------------- |
//! ```

use heapless::Vec;

/// Maximum datagram payload the core will send or buffer.
pub const MAX_DATAGRAM: usize = 64;

/// Bytes of one received datagram.
pub type Payload = Vec<u8, MAX_DATAGRAM>;

/// Destination or source of a datagram.
///
/// Unicast handles are transport-defined (an index into the transport's
/// peer table, a packed address, whatever fits in a `u32`). The core only
/// stores and echoes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endpoint {
    /// The transport's broadcast address.
    Broadcast,
    /// A specific peer, by transport-defined handle.
    Unicast(u32),
}

/// Datagram transport capability.
///
/// # Example
///
/// ```rust
/// use rs_shunter::traits::{Datagram, Endpoint};
/// use rs_shunter::hal::MockSocket;
///
/// let mut socket = MockSocket::new();
/// socket.queue_incoming(b"MARCO", Endpoint::Unicast(7));
///
/// let (payload, from) = socket.recv().unwrap();
/// assert_eq!(&payload[..], b"MARCO");
/// socket.send("POLO", from).unwrap();
///
/// // quiet network: recv returns None, not an error
/// assert!(socket.recv().is_none());
/// ```
pub trait Datagram {
    /// Error type for send failures (transport down, payload oversized).
    type Error;

    /// Send a short ASCII message to the given destination.
    fn send(&mut self, message: &str, dest: Endpoint) -> Result<(), Self::Error>;

    /// Poll for a received message. Must never block; `None` means no
    /// datagram arrived since the last poll.
    fn recv(&mut self) -> Option<(Payload, Endpoint)>;
}
