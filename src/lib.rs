//! Netflux is a lightweight keep-alive protocol on top of UDP. Two peers continuously exchange
//!  fixed-size payloads at a fixed interval, and each peer tracks whether its partner is alive
//!  and how well the connection performs - without any timestamps on the wire.
//!
//! ## Design goals
//!
//! * Symmetric peer-to-peer operation: each peer runs the same engine, there is no client vs.
//!   server and no handshake
//! * The most recent data is what matters: stale or duplicate packets are dropped rather than
//!   delivered late, and nothing is ever re-sent
//! * Minimal overhead: two header bytes per packet
//! * Detect a lost partner within a bounded time (watchdog), optionally clearing the received
//!   data so the application does not act on outdated values
//! * Derive interval, round trip time and loss estimates from sequence numbers alone
//!
//! ## Wire format
//!
//! ```ascii
//! 0: own sequence number (u8, wrapping)
//! 1: feedback sequence number (u8): the partner's most recently observed sequence number
//! 2: payload (fixed size, agreed upon out of band)
//! ```
//!
//! Datagrams shorter than header + payload are rejected, trailing bytes are ignored.
//!
//! ## Sequence numbers
//!
//! Sequence numbers are compared in circular arithmetic: a packet is 'fresh' if its sequence
//!  number is between 1 and 127 steps ahead of the last accepted one. Sequence number 0 is sent
//!  only after wrap-around, the first packet carries 1.
//!
//! ## Liveness
//!
//! The watchdog regards changes of the feedback byte as proof that the partner is alive *and*
//!  receives our packets. It is evaluated whenever the receive loop waits for a datagram longer
//!  than the receive poll interval.

pub mod config;
pub mod engine;
pub mod packet;
pub mod payload;
pub mod receiver;
pub mod send_socket;
pub mod sender;
pub mod seq_nr;
pub mod statistics;

#[cfg(test)] mod test_util;
