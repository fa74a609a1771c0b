use bytes::{BufMut, BytesMut};

use crate::error::EncodeError;
use crate::packet::{Connect, LastWill, Packet, Publish};
use crate::types::{packet_type, ConnectFlags, QoS, MAX_PACKET_SIZE, WILL_QOS_SHIFT};
use crate::utils::{write_variable_length, Encode};

pub(crate) fn get_encoded_size(packet: &Packet) -> usize {
    match *packet {
        Packet::Connect(ref connect) => {
            let Connect { ref protocol, ref last_will, ref client_id, ref username, ref password, .. } =
                **connect;

            // Protocol Level + Connect Flags + Keep Alive
            let mut n = 1 + 1 + 2;

            // Protocol Name
            n += 2 + protocol.name().len();

            // Client Id
            n += 2 + client_id.len();

            // Will Topic + Will Message
            if let Some(LastWill { ref topic, ref message, .. }) = *last_will {
                n += 2 + topic.len() + 2 + message.len();
            }

            if let Some(ref s) = *username {
                n += 2 + s.len();
            }

            if let Some(ref s) = *password {
                n += 2 + s.len();
            }

            n
        }

        Packet::Publish(ref publish) => {
            // Topic + Packet Id + Payload
            if publish.qos == QoS::AtLeastOnce || publish.qos == QoS::ExactlyOnce {
                4 + publish.topic.len() + publish.payload.len()
            } else {
                2 + publish.topic.len() + publish.payload.len()
            }
        }

        Packet::ConnectAck { .. } | // Reserved byte + Return Code
        Packet::PublishAck { .. } | // Packet Id
        Packet::PublishReceived { .. } | // Packet Id
        Packet::PublishRelease { .. } | // Packet Id
        Packet::PublishComplete { .. } | // Packet Id
        Packet::UnsubscribeAck { .. } => 2, // Packet Id

        Packet::Subscribe { ref topic_filters, .. } => {
            2 + topic_filters.iter().fold(0, |acc, (filter, _)| acc + 2 + filter.len() + 1)
        }
        Packet::SubscribeAck { ref granted_qos, .. } => 2 + granted_qos.len(),

        Packet::Unsubscribe { ref topic_filters, .. } => {
            2 + topic_filters.iter().fold(0, |acc, filter| acc + 2 + filter.len())
        }

        Packet::PingRequest | Packet::PingResponse | Packet::Disconnect => 0,
    }
}

/// Validate, then write fixed header + remaining length + body.
pub(crate) fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> Result<(), EncodeError> {
    if let Packet::Publish(Publish { qos, packet_id, .. }) = packet {
        if (*qos == QoS::AtLeastOnce || *qos == QoS::ExactlyOnce) && packet_id.is_none() {
            return Err(EncodeError::PacketIdRequired);
        }
    }
    let content_size = get_encoded_size(packet);
    ensure!(content_size <= MAX_PACKET_SIZE as usize, EncodeError::OverMaxPacketSize);
    dst.reserve(content_size + 5);
    encode(packet, dst, content_size as u32)
}

pub(crate) fn encode(packet: &Packet, dst: &mut BytesMut, content_size: u32) -> Result<(), EncodeError> {
    match packet {
        Packet::Connect(connect) => {
            dst.put_u8(packet_type::CONNECT << 4);
            write_variable_length(content_size, dst)?;
            encode_connect(connect, dst)?;
        }
        Packet::ConnectAck(ack) => {
            dst.put_u8(packet_type::CONNACK << 4);
            write_variable_length(content_size, dst)?;
            let code: u8 = From::from(ack.return_code);
            dst.put_slice(&[0, code]);
        }
        Packet::Publish(publish) => {
            if publish.topic.is_empty() {
                return Err(EncodeError::InvalidTopic);
            }
            dst.put_u8(
                (packet_type::PUBLISH << 4)
                    | (u8::from(publish.qos) << 1)
                    | ((publish.dup as u8) << 3)
                    | (publish.retain as u8),
            );
            write_variable_length(content_size, dst)?;
            publish.topic.encode(dst)?;
            if publish.qos == QoS::AtMostOnce {
                if publish.packet_id.is_some() {
                    return Err(EncodeError::MalformedPacket); // packet id must not be set
                }
            } else {
                publish.packet_id.ok_or(EncodeError::PacketIdRequired)?.encode(dst)?;
            }
            dst.put(publish.payload.as_ref());
        }

        Packet::PublishAck { packet_id } => {
            dst.put_u8(packet_type::PUBACK << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
        }
        Packet::PublishReceived { packet_id } => {
            dst.put_u8(packet_type::PUBREC << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
        }
        Packet::PublishRelease { packet_id } => {
            dst.put_u8(packet_type::PUBREL << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
        }
        Packet::PublishComplete { packet_id } => {
            dst.put_u8(packet_type::PUBCOMP << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
        }
        Packet::Subscribe { packet_id, ref topic_filters } => {
            if topic_filters.is_empty() {
                return Err(EncodeError::EmptyTopicFilters);
            }
            // fixed header QoS is always 1
            dst.put_u8((packet_type::SUBSCRIBE << 4) | 0b0000_0010);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
            for &(ref filter, qos) in topic_filters {
                filter.encode(dst)?;
                dst.put_u8(qos.into());
            }
        }
        Packet::SubscribeAck { packet_id, ref granted_qos } => {
            if granted_qos.is_empty() {
                return Err(EncodeError::EmptyGrantedQos);
            }
            dst.put_u8(packet_type::SUBACK << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
            dst.put_slice(granted_qos);
        }
        Packet::Unsubscribe { packet_id, ref topic_filters } => {
            if topic_filters.is_empty() {
                return Err(EncodeError::EmptyTopicFilters);
            }
            // fixed header QoS is always 1
            dst.put_u8((packet_type::UNSUBSCRIBE << 4) | 0b0000_0010);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
            for filter in topic_filters {
                filter.encode(dst)?;
            }
        }
        Packet::UnsubscribeAck { packet_id } => {
            dst.put_u8(packet_type::UNSUBACK << 4);
            write_variable_length(content_size, dst)?;
            packet_id.encode(dst)?;
        }
        Packet::PingRequest => dst.put_slice(&[packet_type::PINGREQ << 4, 0]),
        Packet::PingResponse => dst.put_slice(&[packet_type::PINGRESP << 4, 0]),
        Packet::Disconnect => dst.put_slice(&[packet_type::DISCONNECT << 4, 0]),
    }

    Ok(())
}

fn encode_connect(connect: &Connect, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let Connect {
        protocol,
        clean_session,
        keep_alive,
        ref last_will,
        ref client_id,
        ref username,
        ref password,
    } = *connect;

    if client_id.is_empty() || client_id.len() > 23 {
        return Err(EncodeError::InvalidClientId);
    }

    protocol.name().as_bytes().encode(dst)?;

    let mut flags = ConnectFlags::empty();

    if username.is_some() {
        flags |= ConnectFlags::USERNAME;
    }
    if password.is_some() {
        flags |= ConnectFlags::PASSWORD;
    }

    if let Some(LastWill { qos, retain, .. }) = *last_will {
        flags |= ConnectFlags::WILL;

        if retain {
            flags |= ConnectFlags::WILL_RETAIN;
        }

        let b: u8 = qos as u8;

        flags |= ConnectFlags::from_bits_truncate(b << WILL_QOS_SHIFT);
    }

    if clean_session {
        flags |= ConnectFlags::CLEAN_START;
    }

    dst.put_slice(&[protocol.level(), flags.bits()]);
    dst.put_u16(keep_alive);
    client_id.encode(dst)?;

    if let Some(LastWill { ref topic, ref message, .. }) = *last_will {
        topic.encode(dst)?;
        message.encode(dst)?;
    }

    if let Some(ref s) = *username {
        s.encode(dst)?;
    }

    if let Some(ref s) = *password {
        s.encode(dst)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use bytestring::ByteString;

    use super::*;
    use crate::packet::{ConnectAck, ConnectAckReason};
    use crate::types::Protocol;

    #[test]
    fn test_encode_fixed_header() {
        let mut v = BytesMut::with_capacity(271);
        let p = Packet::PingRequest;

        assert_eq!(get_encoded_size(&p), 0);
        encode(&p, &mut v, 0).unwrap();
        assert_eq!(v, b"\xc0\x00".as_ref());

        v.clear();

        let p = Packet::Publish(Publish {
            dup: true,
            retain: true,
            qos: QoS::ExactlyOnce,
            topic: ByteString::from_static("topic"),
            packet_id: Some(0x4321),
            payload: (0..255).collect::<Vec<u8>>().into(),
        });

        assert_eq!(get_encoded_size(&p), 264);
        encode(&p, &mut v, 264).unwrap();
        assert_eq!(&v[0..3], b"\x3d\x88\x02".as_ref());
    }

    fn assert_encode_packet(packet: &Packet, expected: &[u8]) {
        let mut v = BytesMut::with_capacity(1024);
        encode(packet, &mut v, get_encoded_size(packet) as u32).unwrap();
        assert_eq!(expected.len(), v.len());
        assert_eq!(expected, &v[..]);
    }

    #[test]
    fn test_encode_connect_packets() {
        assert_encode_packet(
            &Packet::Connect(Box::new(Connect {
                protocol: Protocol::default(),
                clean_session: true,
                keep_alive: 10,
                client_id: ByteString::from_static("test"),
                last_will: None,
                username: None,
                password: None,
            })),
            &b"\x10\x12\x00\x06MQIsdp\x03\x02\x00\x0A\x00\x04test"[..],
        );

        assert_encode_packet(
            &Packet::Connect(Box::new(Connect {
                protocol: Protocol::default(),
                clean_session: false,
                keep_alive: 60,
                client_id: ByteString::from_static("12345"),
                last_will: None,
                username: Some(ByteString::from_static("user")),
                password: Some(Bytes::from_static(b"pass")),
            })),
            &b"\x10\x1F\x00\x06MQIsdp\x03\xC0\x00\x3C\x00\
\x0512345\x00\x04user\x00\x04pass"[..],
        );

        assert_encode_packet(
            &Packet::Connect(Box::new(Connect {
                protocol: Protocol::default(),
                clean_session: false,
                keep_alive: 60,
                client_id: ByteString::from_static("12345"),
                last_will: Some(LastWill {
                    qos: QoS::ExactlyOnce,
                    retain: false,
                    topic: ByteString::from_static("topic"),
                    message: Bytes::from_static(b"message"),
                }),
                username: None,
                password: None,
            })),
            &b"\x10\x23\x00\x06MQIsdp\x03\x14\x00\x3C\x00\
\x0512345\x00\x05topic\x00\x07message"[..],
        );

        assert_encode_packet(&Packet::Disconnect, b"\xe0\x00");
    }

    #[test]
    fn test_encode_connect_client_id_limits() {
        let mut v = BytesMut::new();
        let p = Packet::Connect(Box::new(Connect::default()));
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::InvalidClientId)
        ));

        let p = Packet::Connect(Box::new(
            Connect::default().client_id("c23456789012345678901234"),
        ));
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::InvalidClientId)
        ));

        let p = Packet::Connect(Box::new(Connect::default().client_id("c2345678901234567890123")));
        v.clear();
        assert!(encode(&p, &mut v, get_encoded_size(&p) as u32).is_ok());
    }

    #[test]
    fn test_encode_connect_ack() {
        assert_encode_packet(
            &Packet::ConnectAck(ConnectAck { return_code: ConnectAckReason::ConnectionAccepted }),
            b"\x20\x02\x00\x00",
        );
        assert_encode_packet(
            &Packet::ConnectAck(ConnectAck { return_code: ConnectAckReason::BadUserNameOrPassword }),
            b"\x20\x02\x00\x04",
        );
    }

    #[test]
    fn test_encode_publish_packets() {
        assert_encode_packet(
            &Packet::Publish(Publish {
                dup: true,
                retain: true,
                qos: QoS::ExactlyOnce,
                topic: ByteString::from_static("topic"),
                packet_id: Some(0x4321),
                payload: Bytes::from_static(b"data"),
            }),
            b"\x3d\x0D\x00\x05topic\x43\x21data",
        );

        assert_encode_packet(
            &Packet::Publish(Publish {
                dup: false,
                retain: false,
                qos: QoS::AtMostOnce,
                topic: ByteString::from_static("topic"),
                packet_id: None,
                payload: Bytes::from_static(b"data"),
            }),
            b"\x30\x0b\x00\x05topicdata",
        );
    }

    #[test]
    fn test_encode_publish_validation() {
        let mut v = BytesMut::new();

        let p = Packet::Publish(Publish {
            dup: false,
            retain: false,
            qos: QoS::AtMostOnce,
            topic: ByteString::new(),
            packet_id: None,
            payload: Bytes::from_static(b"data"),
        });
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::InvalidTopic)
        ));

        let p = Packet::Publish(Publish {
            dup: false,
            retain: false,
            qos: QoS::AtLeastOnce,
            topic: ByteString::from_static("topic"),
            packet_id: None,
            payload: Bytes::new(),
        });
        assert!(matches!(encode_packet(&p, &mut v), Err(EncodeError::PacketIdRequired)));

        let p = Packet::Publish(Publish {
            dup: false,
            retain: false,
            qos: QoS::AtMostOnce,
            topic: ByteString::from_static("topic"),
            packet_id: Some(1),
            payload: Bytes::new(),
        });
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::MalformedPacket)
        ));
    }

    #[test]
    fn test_encode_subscribe_packets() {
        assert_encode_packet(
            &Packet::Subscribe {
                packet_id: 0x1234,
                topic_filters: vec![
                    (ByteString::from_static("test"), QoS::AtLeastOnce),
                    (ByteString::from_static("filter"), QoS::ExactlyOnce),
                ],
            },
            b"\x82\x12\x12\x34\x00\x04test\x01\x00\x06filter\x02",
        );

        assert_encode_packet(
            &Packet::SubscribeAck { packet_id: 0x1234, granted_qos: vec![0x01, 0x80, 0x02] },
            b"\x90\x05\x12\x34\x01\x80\x02",
        );

        assert_encode_packet(
            &Packet::Unsubscribe {
                packet_id: 0x1234,
                topic_filters: vec![ByteString::from_static("test"), ByteString::from_static("filter")],
            },
            b"\xa2\x10\x12\x34\x00\x04test\x00\x06filter",
        );

        assert_encode_packet(&Packet::UnsubscribeAck { packet_id: 0x4321 }, b"\xb0\x02\x43\x21");
    }

    #[test]
    fn test_encode_empty_lists() {
        let mut v = BytesMut::new();

        let p = Packet::Subscribe { packet_id: 1, topic_filters: Vec::new() };
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::EmptyTopicFilters)
        ));

        let p = Packet::SubscribeAck { packet_id: 1, granted_qos: Vec::new() };
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::EmptyGrantedQos)
        ));

        let p = Packet::Unsubscribe { packet_id: 1, topic_filters: Vec::new() };
        assert!(matches!(
            encode(&p, &mut v, get_encoded_size(&p) as u32),
            Err(EncodeError::EmptyTopicFilters)
        ));
    }

    #[test]
    fn test_encode_ping_packets() {
        assert_encode_packet(&Packet::PingRequest, b"\xc0\x00");
        assert_encode_packet(&Packet::PingResponse, b"\xd0\x00");
    }
}
