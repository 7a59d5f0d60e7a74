//! RTP depacketizer
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                              |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |            CSRC list (CC entries), optional extension         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Only the payload type and payload are used by the relay. The remaining
//! header fields are parsed so malformed datagrams are rejected.

use crate::error::RtpError;

/// Fixed RTP header length
pub const RTP_HEADER_LEN: usize = 12;

/// RTP fixed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    /// Payload type (0-127)
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Parse the fixed 12-byte header
    pub fn parse(data: &[u8]) -> Result<Self, RtpError> {
        if data.len() < RTP_HEADER_LEN {
            return Err(RtpError::TooShort(data.len()));
        }

        let first = data[0];
        let second = data[1];

        let version = first >> 6;
        if version != 2 {
            return Err(RtpError::UnsupportedVersion(version));
        }

        Ok(Self {
            version,
            padding: (first & 0x20) != 0,
            extension: (first & 0x10) != 0,
            csrc_count: first & 0x0F,
            marker: (second & 0x80) != 0,
            payload_type: second & 0x7F,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }

    /// Total header length including CSRC list and extension
    fn header_len(&self, data: &[u8]) -> Result<usize, RtpError> {
        let mut len = RTP_HEADER_LEN + self.csrc_count as usize * 4;

        if self.extension {
            if data.len() < len + 4 {
                return Err(RtpError::HeaderOverflow {
                    header: len + 4,
                    packet: data.len(),
                });
            }
            let words = u16::from_be_bytes([data[len + 2], data[len + 3]]) as usize;
            len += 4 + words * 4;
        }

        if len > data.len() {
            return Err(RtpError::HeaderOverflow {
                header: len,
                packet: data.len(),
            });
        }

        Ok(len)
    }
}

/// One parsed RTP datagram, borrowing its payload from the receive buffer
#[derive(Debug)]
pub struct RtpPacket<'a> {
    pub header: RtpHeader,
    pub payload: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    /// Parse a complete datagram
    pub fn parse(data: &'a [u8]) -> Result<Self, RtpError> {
        let header = RtpHeader::parse(data)?;
        let header_len = header.header_len(data)?;

        let payload_end = if header.padding {
            let padding = data[data.len() - 1];
            if padding == 0 || padding as usize > data.len() - header_len {
                return Err(RtpError::InvalidPadding(padding));
            }
            data.len() - padding as usize
        } else {
            data.len()
        };

        Ok(Self {
            header,
            payload: &data[header_len..payload_end],
        })
    }

    pub fn payload_type(&self) -> u8 {
        self.header.payload_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn packet(payload_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0x80, payload_type & 0x7F, 0x12, 0x34, 0, 0, 0, 1, 0xde, 0xad, 0xbe, 0xef];
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_parse_basic() {
        let data = packet(33, b"transport");
        let packet = RtpPacket::parse(&data).unwrap();
        assert_eq!(packet.payload_type(), 33);
        assert_eq!(packet.header.sequence, 0x1234);
        assert_eq!(packet.header.ssrc, 0xdeadbeef);
        assert_eq!(packet.payload, b"transport");
    }

    #[test]
    fn test_marker_bit_not_part_of_payload_type() {
        let mut data = packet(96, b"x");
        data[1] |= 0x80;
        let packet = RtpPacket::parse(&data).unwrap();
        assert!(packet.header.marker);
        assert_eq!(packet.payload_type(), 96);
    }

    #[test]
    fn test_empty_payload() {
        let data = packet(33, b"");
        let packet = RtpPacket::parse(&data).unwrap();
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_csrc_and_extension_skipped() {
        // CC=1, X=1
        let mut data = vec![0x91, 33, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
        data.extend_from_slice(&[0, 0, 0, 2]); // CSRC
        data.extend_from_slice(&[0xbe, 0xde, 0, 1]); // extension header, one word
        data.extend_from_slice(&[1, 2, 3, 4]); // extension body
        data.extend_from_slice(b"payload");
        let packet = RtpPacket::parse(&data).unwrap();
        assert_eq!(packet.payload, b"payload");
    }

    #[test]
    fn test_padding_removed() {
        let mut data = packet(33, b"abc");
        data[0] |= 0x20;
        data.extend_from_slice(&[0, 0, 3]);
        let packet = RtpPacket::parse(&data).unwrap();
        assert_eq!(packet.payload, b"abc");
    }

    #[test]
    fn test_invalid_padding() {
        let mut data = packet(33, b"ab");
        data[0] |= 0x20;
        data.push(9);
        assert_eq!(RtpPacket::parse(&data).unwrap_err(), RtpError::InvalidPadding(9));

        let mut data = packet(33, b"ab");
        data[0] |= 0x20;
        data.push(0);
        assert_eq!(RtpPacket::parse(&data).unwrap_err(), RtpError::InvalidPadding(0));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(RtpPacket::parse(&[0x80, 33, 0]).unwrap_err(), RtpError::TooShort(3));
        assert_eq!(RtpPacket::parse(&[]).unwrap_err(), RtpError::TooShort(0));
    }

    #[test]
    fn test_wrong_version() {
        let mut data = packet(33, b"x");
        data[0] = 0x40;
        assert_eq!(RtpPacket::parse(&data).unwrap_err(), RtpError::UnsupportedVersion(1));
    }

    #[test]
    fn test_truncated_csrc_list() {
        let mut data = packet(33, b"");
        data[0] |= 0x03;
        data.extend_from_slice(&[0, 0, 0, 1]);
        assert!(matches!(
            RtpPacket::parse(&data),
            Err(RtpError::HeaderOverflow { header: 24, packet: 16 })
        ));
    }

    #[test]
    fn test_truncated_extension() {
        let mut data = packet(33, b"");
        data[0] |= 0x10;
        data.extend_from_slice(&[0xbe, 0xde, 0, 4, 1, 2]);
        assert!(matches!(RtpPacket::parse(&data), Err(RtpError::HeaderOverflow { .. })));
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = RtpPacket::parse(&data);
        }

        #[test]
        fn prop_plain_packets_keep_payload(
            payload_type in 0u8..128,
            payload in proptest::collection::vec(any::<u8>(), 0..1488)
        ) {
            let data = packet(payload_type, &payload);
            let packet = RtpPacket::parse(&data).unwrap();
            prop_assert_eq!(packet.payload_type(), payload_type);
            prop_assert_eq!(packet.payload, &payload[..]);
        }
    }
}
