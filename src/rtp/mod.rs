//! RTP (Real-time Transport Protocol) module.
//!
//! Provides RTP header building, L16 network byte order conversion, and
//! the connected UDP socket the packetized audio is sent through.

pub mod header;
pub mod l16;
pub mod socket;

pub use header::*;
pub use socket::*;
