use std::collections::BTreeMap;
use std::fmt;

use bytes::{Bytes, BytesMut};
use bytestring::ByteString;
use serde::{Deserialize, Serialize};

use crate::encode;
use crate::error::EncodeError;
use crate::types::{packet_type, Protocol, QoS};

/// Connect Return Code
#[derive(Debug, PartialEq, Eq, Copy, Clone, Deserialize, Serialize)]
pub enum ConnectAckReason {
    /// Connection accepted
    ConnectionAccepted,
    /// Connection Refused, unacceptable protocol version
    UnacceptableProtocolVersion,
    /// Connection Refused, identifier rejected
    IdentifierRejected,
    /// Connection Refused, Server unavailable
    ServiceUnavailable,
    /// Connection Refused, bad user name or password
    BadUserNameOrPassword,
    /// Connection Refused, not authorized
    NotAuthorized,
    /// Any return code outside the 0-5 range defined by the protocol
    Reserved(u8),
}

impl From<u8> for ConnectAckReason {
    fn from(v: u8) -> Self {
        match v {
            0 => ConnectAckReason::ConnectionAccepted,
            1 => ConnectAckReason::UnacceptableProtocolVersion,
            2 => ConnectAckReason::IdentifierRejected,
            3 => ConnectAckReason::ServiceUnavailable,
            4 => ConnectAckReason::BadUserNameOrPassword,
            5 => ConnectAckReason::NotAuthorized,
            code => ConnectAckReason::Reserved(code),
        }
    }
}

impl From<ConnectAckReason> for u8 {
    fn from(v: ConnectAckReason) -> Self {
        match v {
            ConnectAckReason::ConnectionAccepted => 0,
            ConnectAckReason::UnacceptableProtocolVersion => 1,
            ConnectAckReason::IdentifierRejected => 2,
            ConnectAckReason::ServiceUnavailable => 3,
            ConnectAckReason::BadUserNameOrPassword => 4,
            ConnectAckReason::NotAuthorized => 5,
            ConnectAckReason::Reserved(code) => code,
        }
    }
}

impl Default for ConnectAckReason {
    fn default() -> Self {
        ConnectAckReason::ConnectionAccepted
    }
}

impl fmt::Display for ConnectAckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectAckReason::ConnectionAccepted => f.write_str("Connection Accepted"),
            ConnectAckReason::UnacceptableProtocolVersion => {
                f.write_str("Connection refused: unacceptable protocol version")
            }
            ConnectAckReason::IdentifierRejected => {
                f.write_str("Connection refused: client identifier rejected")
            }
            ConnectAckReason::ServiceUnavailable => {
                f.write_str("Connection refused: broker unavailable")
            }
            ConnectAckReason::BadUserNameOrPassword => {
                f.write_str("Connection refused: bad user name or password")
            }
            ConnectAckReason::NotAuthorized => f.write_str("Connection refused: not authorised"),
            ConnectAckReason::Reserved(code) => {
                write!(f, "Connection refused: error code {}", code)
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
/// Connection Will
pub struct LastWill {
    /// the QoS level to be used when publishing the Will Message.
    pub qos: QoS,
    /// the Will Message is to be Retained when it is published.
    pub retain: bool,
    /// the Will Topic
    pub topic: ByteString,
    /// defines the Application Message that is to be published to the Will Topic
    pub message: Bytes,
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
/// Connect packet content
pub struct Connect {
    /// mqtt protocol version
    pub protocol: Protocol,
    /// the handling of the Session state.
    pub clean_session: bool,
    /// a time interval measured in seconds.
    pub keep_alive: u16,
    /// Will Message be stored on the Server and associated with the Network Connection.
    pub last_will: Option<LastWill>,
    /// identifies the Client to the Server, must be between 1 and 23 bytes long.
    pub client_id: ByteString,
    /// username can be used by the Server for authentication and authorization.
    pub username: Option<ByteString>,
    /// password can be used by the Server for authentication and authorization.
    pub password: Option<Bytes>,
}

impl Default for Connect {
    fn default() -> Self {
        Connect {
            protocol: Protocol::default(),
            clean_session: true,
            keep_alive: 15,
            last_will: None,
            client_id: ByteString::default(),
            username: None,
            password: None,
        }
    }
}

impl Connect {
    /// Set client_id value
    pub fn client_id<T>(mut self, client_id: T) -> Self
    where
        ByteString: From<T>,
    {
        self.client_id = client_id.into();
        self
    }
}

#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Deserialize, Serialize)]
/// ConnectAck message
pub struct ConnectAck {
    pub return_code: ConnectAckReason,
}

#[derive(PartialEq, Eq, Clone, Deserialize, Serialize)]
/// Publish message
pub struct Publish {
    /// this might be re-delivery of an earlier attempt to send the Packet.
    pub dup: bool,
    pub retain: bool,
    /// the level of assurance for delivery of an Application Message.
    pub qos: QoS,
    /// the information channel to which payload data is published.
    pub topic: ByteString,
    /// only present in PUBLISH Packets where the QoS level is 1 or 2.
    pub packet_id: Option<u16>,
    /// the Application Message that is being published.
    pub payload: Bytes,
}

impl fmt::Debug for Publish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publish")
            .field("packet_id", &self.packet_id)
            .field("topic", &self.topic)
            .field("dup", &self.dup)
            .field("retain", &self.retain)
            .field("qos", &self.qos)
            .field("payload", &"<REDACTED>")
            .finish()
    }
}

/// Accepted shapes for a SUBSCRIBE topic-filter list.
///
/// Every shape normalizes into an ordered list of `(filter, qos)` pairs;
/// map entries are ordered by their key.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TopicFilters {
    /// One topic filter at QoS 0
    Single(ByteString),
    /// Explicit `(filter, qos)` pairs, kept in the given order
    List(Vec<(ByteString, QoS)>),
    /// Filter-to-QoS mapping, ordered by filter name
    Map(BTreeMap<ByteString, QoS>),
}

impl TopicFilters {
    /// Normalize into the canonical ordered list of `(filter, qos)` pairs.
    pub fn into_filters(self) -> Vec<(ByteString, QoS)> {
        match self {
            TopicFilters::Single(filter) => vec![(filter, QoS::AtMostOnce)],
            TopicFilters::List(filters) => filters,
            TopicFilters::Map(map) => map.into_iter().collect(),
        }
    }
}

impl From<&str> for TopicFilters {
    fn from(filter: &str) -> Self {
        TopicFilters::Single(ByteString::from(filter))
    }
}

impl From<String> for TopicFilters {
    fn from(filter: String) -> Self {
        TopicFilters::Single(ByteString::from(filter))
    }
}

impl From<Vec<&str>> for TopicFilters {
    fn from(filters: Vec<&str>) -> Self {
        TopicFilters::List(
            filters.into_iter().map(|f| (ByteString::from(f), QoS::AtMostOnce)).collect(),
        )
    }
}

impl From<Vec<(ByteString, QoS)>> for TopicFilters {
    fn from(filters: Vec<(ByteString, QoS)>) -> Self {
        TopicFilters::List(filters)
    }
}

impl From<BTreeMap<ByteString, QoS>> for TopicFilters {
    fn from(filters: BTreeMap<ByteString, QoS>) -> Self {
        TopicFilters::Map(filters)
    }
}

/// Accepted shapes for SUBACK granted-QoS values.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GrantedQos {
    One(u8),
    Many(Vec<u8>),
}

impl GrantedQos {
    /// Normalize into the list of granted QoS bytes.
    pub fn into_codes(self) -> Vec<u8> {
        match self {
            GrantedQos::One(code) => vec![code],
            GrantedQos::Many(codes) => codes,
        }
    }
}

impl From<u8> for GrantedQos {
    fn from(code: u8) -> Self {
        GrantedQos::One(code)
    }
}

impl From<Vec<u8>> for GrantedQos {
    fn from(codes: Vec<u8>) -> Self {
        GrantedQos::Many(codes)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// MQTT Control Packets
pub enum Packet {
    /// Client request to connect to Server
    Connect(Box<Connect>),

    /// Connect acknowledgment
    ConnectAck(ConnectAck),

    /// Publish message
    Publish(Publish),

    /// Publish acknowledgment
    PublishAck {
        /// Packet Identifier
        packet_id: u16,
    },
    /// Publish received (assured delivery part 1)
    PublishReceived {
        /// Packet Identifier
        packet_id: u16,
    },
    /// Publish release (assured delivery part 2)
    PublishRelease {
        /// Packet Identifier
        packet_id: u16,
    },
    /// Publish complete (assured delivery part 3)
    PublishComplete {
        /// Packet Identifier
        packet_id: u16,
    },

    /// Client subscribe request
    Subscribe {
        /// Packet Identifier
        packet_id: u16,
        /// the list of Topic Filters and QoS to which the Client wants to subscribe.
        topic_filters: Vec<(ByteString, QoS)>,
    },
    /// Subscribe acknowledgment
    SubscribeAck {
        packet_id: u16,
        /// granted QoS byte for each Topic Filter in the SUBSCRIBE Packet being acknowledged.
        granted_qos: Vec<u8>,
    },

    /// Unsubscribe request
    Unsubscribe {
        /// Packet Identifier
        packet_id: u16,
        /// the list of Topic Filters that the Client wishes to unsubscribe from.
        topic_filters: Vec<ByteString>,
    },
    /// Unsubscribe acknowledgment
    UnsubscribeAck {
        /// Packet Identifier
        packet_id: u16,
    },

    /// PING request
    PingRequest,
    /// PING response
    PingResponse,
    /// Client is disconnecting
    Disconnect,
}

impl From<Connect> for Packet {
    fn from(val: Connect) -> Packet {
        Packet::Connect(Box::new(val))
    }
}

impl From<Publish> for Packet {
    fn from(val: Publish) -> Packet {
        Packet::Publish(val)
    }
}

impl Packet {
    /// Build a SUBSCRIBE packet from any accepted topic-filter shape.
    pub fn subscribe(packet_id: u16, filters: impl Into<TopicFilters>) -> Packet {
        Packet::Subscribe { packet_id, topic_filters: filters.into().into_filters() }
    }

    /// Build a SUBACK packet from any accepted granted-QoS shape.
    pub fn subscribe_ack(packet_id: u16, granted: impl Into<GrantedQos>) -> Packet {
        Packet::SubscribeAck { packet_id, granted_qos: granted.into().into_codes() }
    }

    pub fn packet_type(&self) -> u8 {
        match self {
            Packet::Connect(_) => packet_type::CONNECT,
            Packet::ConnectAck { .. } => packet_type::CONNACK,
            Packet::Publish(_) => packet_type::PUBLISH,
            Packet::PublishAck { .. } => packet_type::PUBACK,
            Packet::PublishReceived { .. } => packet_type::PUBREC,
            Packet::PublishRelease { .. } => packet_type::PUBREL,
            Packet::PublishComplete { .. } => packet_type::PUBCOMP,
            Packet::Subscribe { .. } => packet_type::SUBSCRIBE,
            Packet::SubscribeAck { .. } => packet_type::SUBACK,
            Packet::Unsubscribe { .. } => packet_type::UNSUBSCRIBE,
            Packet::UnsubscribeAck { .. } => packet_type::UNSUBACK,
            Packet::PingRequest => packet_type::PINGREQ,
            Packet::PingResponse => packet_type::PINGRESP,
            Packet::Disconnect => packet_type::DISCONNECT,
        }
    }

    /// Serialize the packet: fixed header, remaining length, body.
    pub fn to_bytes(&self) -> Result<BytesMut, EncodeError> {
        let mut dst = BytesMut::new();
        encode::encode_packet(self, &mut dst)?;
        Ok(dst)
    }
}
