#![deny(unsafe_code)]

//! MQTT v3.1 protocol codec
//!
//! Converts between in-memory [`Packet`] values and their exact wire encoding,
//! and back. Usable from both client and broker implementations.
//!
//! ## Core Features:
//! - **Complete v3.1 packet set**: all fourteen control packet types, including
//!   flag-dependent field presence (packet identifier only when QoS > 0)
//! - **Zero-Copy Encoding**: efficient binary processing using `bytes::BytesMut`
//! - **Tokio Integration**: framing codec compatible with `tokio_util::codec`
//! - **Blocking reads**: [`read_packet`] consumes packets from any `std::io::Read`
//! - **Memory Safety**: remaining-length ceiling of 268,435,455 bytes enforced on
//!   both encode and decode, with an optional per-connection inbound limit
//!
//! ## Architecture Components:
//! - [`Packet`]: unified representation of all packet types
//! - [`Codec`]: incremental framing over a growing receive buffer
//! - [`parse_packet`] / [`read_packet`]: one-shot decode entry points
//! - Error handling with dedicated [`EncodeError`]/[`DecodeError`] types

#[macro_use]
mod utils;

/// Error types for encoding/decoding operations
pub mod error;

/// Shared types and constants for the MQTT v3.1 protocol
pub mod types;

#[allow(clippy::module_inception)]
mod codec;
mod decode;
mod encode;
mod packet;

pub use self::codec::Codec;
pub use self::decode::{parse_packet, read_packet};
pub use self::error::{DecodeError, EncodeError};
pub use self::packet::{
    Connect, ConnectAck, ConnectAckReason, GrantedQos, LastWill, Packet, Publish, TopicFilters,
};
pub use self::types::{ConnectFlags, Protocol, QoS};
