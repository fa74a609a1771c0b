use std::io::Read;

use bytes::{Buf, Bytes, BytesMut};
use bytestring::ByteString;

use crate::error::DecodeError;
use crate::packet::{Connect, ConnectAck, LastWill, Packet, Publish};
use crate::types::{packet_type, ConnectFlags, Protocol, QoS, MQISDP, MQTT_LEVEL_31, WILL_QOS_SHIFT};
use crate::utils::{decode_variable_length, Decode};

/// Parse one packet from the front of `src`.
///
/// Consumes exactly the parsed packet's bytes, leaving any trailing bytes
/// (such as a following packet) in the buffer for a subsequent call. The
/// buffer must hold the complete packet: a body shorter than the declared
/// remaining length is an error, unlike the incremental [`crate::Codec`].
///
/// Returns the packet together with its declared body length.
pub fn parse_packet(src: &mut BytesMut) -> Result<(Packet, u32), DecodeError> {
    ensure!(src.len() >= 2, DecodeError::InsufficientHeader);
    let first_byte = src[0];
    check_type_id(first_byte)?;
    let (remaining_length, consumed) =
        decode_variable_length(&src[1..])?.ok_or(DecodeError::LengthHeaderIncomplete)?;
    if src.len() < consumed + 1 + remaining_length as usize {
        return Err(DecodeError::PayloadTooShort {
            expected: remaining_length,
            actual: src.len() - consumed - 1,
        });
    }
    src.advance(consumed + 1);
    let body = src.split_to(remaining_length as usize).freeze();
    let packet = decode_packet(body, first_byte)?;
    Ok((packet, remaining_length))
}

/// Read one packet from a blocking byte source.
///
/// Reads the type byte, then the remaining-length bytes one at a time, then
/// exactly the declared number of body bytes. An exhausted source fails each
/// read with [`DecodeError::ReadByte`].
///
/// Returns the packet together with its declared body length.
pub fn read_packet<R: Read>(src: &mut R) -> Result<(Packet, u32), DecodeError> {
    let first_byte = read_byte(src)?;
    check_type_id(first_byte)?;

    let mut remaining_length: u32 = 0;
    let mut shift: u32 = 0;
    loop {
        let digit = read_byte(src)?;
        remaining_length += ((digit & 0x7F) as u32) << shift;
        if digit & 0x80 == 0 {
            break;
        }
        ensure!(shift < 21, DecodeError::InvalidLength);
        shift += 7;
    }

    let mut body = vec![0u8; remaining_length as usize];
    src.read_exact(&mut body).map_err(DecodeError::ReadByte)?;
    let packet = decode_packet(Bytes::from(body), first_byte)?;
    Ok((packet, remaining_length))
}

fn read_byte<R: Read>(src: &mut R) -> Result<u8, DecodeError> {
    let mut byte = [0u8; 1];
    src.read_exact(&mut byte).map_err(DecodeError::ReadByte)?;
    Ok(byte[0])
}

fn check_type_id(first_byte: u8) -> Result<(), DecodeError> {
    let type_id = first_byte >> 4;
    ensure!(
        (packet_type::CONNECT..=packet_type::DISCONNECT).contains(&type_id),
        DecodeError::UnsupportedPacketType(type_id)
    );
    Ok(())
}

pub(crate) fn decode_packet(mut src: Bytes, first_byte: u8) -> Result<Packet, DecodeError> {
    match first_byte >> 4 {
        packet_type::CONNECT => decode_connect_packet(&mut src),
        packet_type::CONNACK => decode_connect_ack_packet(&mut src),
        packet_type::PUBLISH => decode_publish_packet(&mut src, first_byte & 0b0000_1111),
        packet_type::PUBACK => decode_ack(src, |packet_id| Packet::PublishAck { packet_id }),
        packet_type::PUBREC => decode_ack(src, |packet_id| Packet::PublishReceived { packet_id }),
        packet_type::PUBREL => decode_ack(src, |packet_id| Packet::PublishRelease { packet_id }),
        packet_type::PUBCOMP => decode_ack(src, |packet_id| Packet::PublishComplete { packet_id }),
        packet_type::SUBSCRIBE => decode_subscribe_packet(&mut src),
        packet_type::SUBACK => decode_subscribe_ack_packet(&mut src),
        packet_type::UNSUBSCRIBE => decode_unsubscribe_packet(&mut src),
        packet_type::UNSUBACK => decode_ack(src, |packet_id| Packet::UnsubscribeAck { packet_id }),
        packet_type::PINGREQ => decode_empty(src, Packet::PingRequest),
        packet_type::PINGRESP => decode_empty(src, Packet::PingResponse),
        packet_type::DISCONNECT => decode_empty(src, Packet::Disconnect),
        type_id => Err(DecodeError::UnsupportedPacketType(type_id)),
    }
}

#[inline]
fn decode_ack(mut src: Bytes, f: impl Fn(u16) -> Packet) -> Result<Packet, DecodeError> {
    let packet_id = u16::decode(&mut src)?;
    ensure!(!src.has_remaining(), DecodeError::InvalidLength);
    Ok(f(packet_id))
}

#[inline]
fn decode_empty(src: Bytes, packet: Packet) -> Result<Packet, DecodeError> {
    ensure!(!src.has_remaining(), DecodeError::InvalidLength);
    Ok(packet)
}

fn decode_connect_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let protocol_name = Bytes::decode(src)?;
    ensure!(protocol_name.as_ref() == MQISDP, DecodeError::InvalidProtocol);

    ensure!(src.has_remaining(), DecodeError::InvalidLength);
    let level = src.get_u8();
    ensure!(level == MQTT_LEVEL_31, DecodeError::UnsupportedProtocolLevel);

    ensure!(src.has_remaining(), DecodeError::InvalidLength);
    let flags = ConnectFlags::from_bits(src.get_u8()).ok_or(DecodeError::ConnectReservedFlagSet)?;

    let keep_alive = u16::decode(src)?;
    let client_id = ByteString::decode(src)?;

    let last_will = if flags.contains(ConnectFlags::WILL) {
        let topic = ByteString::decode(src)?;
        let message = Bytes::decode(src)?;
        Some(LastWill {
            qos: QoS::try_from((flags & ConnectFlags::WILL_QOS).bits() >> WILL_QOS_SHIFT)?,
            retain: flags.contains(ConnectFlags::WILL_RETAIN),
            topic,
            message,
        })
    } else {
        None
    };
    // a v3.1 peer may truncate the packet before a flagged username/password
    let username = if flags.contains(ConnectFlags::USERNAME) && src.has_remaining() {
        Some(ByteString::decode(src)?)
    } else {
        None
    };
    let password = if flags.contains(ConnectFlags::PASSWORD) && src.has_remaining() {
        Some(Bytes::decode(src)?)
    } else {
        None
    };
    Ok(Connect {
        protocol: Protocol(level),
        clean_session: flags.contains(ConnectFlags::CLEAN_START),
        keep_alive,
        client_id,
        last_will,
        username,
        password,
    }
    .into())
}

fn decode_connect_ack_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    ensure!(src.remaining() >= 2, DecodeError::InvalidLength);
    let _reserved = src.get_u8();
    let return_code = src.get_u8().into();
    ensure!(!src.has_remaining(), DecodeError::InvalidLength);
    Ok(Packet::ConnectAck(ConnectAck { return_code }))
}

fn decode_publish_packet(src: &mut Bytes, packet_flags: u8) -> Result<Packet, DecodeError> {
    let topic = ByteString::decode(src)?;
    let qos = QoS::try_from((packet_flags & 0b0110) >> 1)?;
    let packet_id = if qos == QoS::AtMostOnce { None } else { Some(u16::decode(src)?) };

    Ok(Packet::Publish(Publish {
        dup: (packet_flags & 0b1000) == 0b1000,
        qos,
        retain: (packet_flags & 0b0001) == 0b0001,
        topic,
        packet_id,
        payload: src.split_off(0),
    }))
}

fn decode_subscribe_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = u16::decode(src)?;
    let mut topic_filters = Vec::new();
    while src.has_remaining() {
        let topic = ByteString::decode(src)?;
        ensure!(src.remaining() >= 1, DecodeError::InvalidLength);
        let qos = (src.get_u8() & 0b0000_0011).try_into()?;
        topic_filters.push((topic, qos));
    }

    Ok(Packet::Subscribe { packet_id, topic_filters })
}

fn decode_subscribe_ack_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = u16::decode(src)?;
    let granted_qos = src.split_off(0).to_vec();
    Ok(Packet::SubscribeAck { packet_id, granted_qos })
}

fn decode_unsubscribe_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = u16::decode(src)?;
    let mut topic_filters = Vec::new();
    while src.remaining() > 0 {
        topic_filters.push(ByteString::decode(src)?);
    }
    Ok(Packet::Unsubscribe { packet_id, topic_filters })
}
