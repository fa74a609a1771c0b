use std::io;

/// Errors raised while decoding malformed or non-conformant wire data.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Buffer is shorter than the minimum two-byte fixed header
    #[error("Invalid packet: less than 2 bytes long")]
    InsufficientHeader,
    /// Remaining-length field ended mid-sequence
    #[error("The packet length header is incomplete")]
    LengthHeaderIncomplete,
    #[error("Invalid length")]
    InvalidLength,
    /// Fewer body bytes available than the remaining-length header declared
    #[error("input buffer ({actual} bytes) is not the same as the body length header ({expected})")]
    PayloadTooShort { expected: u32, actual: usize },
    #[error("Invalid packet type identifier: {0}")]
    UnsupportedPacketType(u8),
    #[error("Unsupported protocol name")]
    InvalidProtocol,
    #[error("Unsupported protocol level")]
    UnsupportedProtocolLevel,
    #[error("Connect frame's reserved flag is set")]
    ConnectReservedFlagSet,
    #[error("Malformed packet")]
    MalformedPacket,
    #[error("utf8 error")]
    Utf8Error,
    #[error("Max size exceeded")]
    MaxSizeExceeded,
    /// A blocking byte source was exhausted mid-packet
    #[error("Failed to read byte from stream, {0:?}")]
    ReadByte(io::Error),
    #[error("io error, {0:?}")]
    Io(io::Error),
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> DecodeError {
        DecodeError::Io(e)
    }
}

/// Errors raised when a caller supplies an invalid value to encode.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Client identifier is empty or longer than 23 bytes
    #[error("Invalid client identifier")]
    InvalidClientId,
    /// Topic name is empty
    #[error("Invalid topic name")]
    InvalidTopic,
    #[error("No topic filters given")]
    EmptyTopicFilters,
    #[error("No granted QoS values given")]
    EmptyGrantedQos,
    #[error("Packet id is required")]
    PacketIdRequired,
    #[error("Malformed packet")]
    MalformedPacket,
    /// A length-prefixed field is longer than 65,535 bytes
    #[error("Invalid length")]
    InvalidLength,
    /// Body is larger than the 268,435,455 byte remaining-length ceiling
    #[error("Packet body is more than 256MB")]
    OverMaxPacketSize,
    #[error("io error, {0:?}")]
    Io(io::Error),
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}
