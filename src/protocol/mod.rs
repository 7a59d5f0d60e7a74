//! Wire-level pieces: request targets, RTP framing and content types

pub mod rtp;
pub mod target;

pub use rtp::RtpPacket;
pub use target::resolve_target;

use crate::constants::{CONTENT_TYPE_DEFAULT, CONTENT_TYPE_MP2T, RTP_PAYLOAD_MP2T};

/// Media type announced to the client for a relayed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// MPEG-2 transport stream
    Mp2t,
    /// Anything else
    OctetStream,
}

impl ContentType {
    /// Pick the content type for an RTP payload type
    pub fn from_payload_type(payload_type: u8) -> Self {
        if payload_type == RTP_PAYLOAD_MP2T {
            ContentType::Mp2t
        } else {
            ContentType::OctetStream
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Mp2t => CONTENT_TYPE_MP2T,
            ContentType::OctetStream => CONTENT_TYPE_DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp2t_payload_type() {
        assert_eq!(ContentType::from_payload_type(33), ContentType::Mp2t);
        assert_eq!(ContentType::from_payload_type(33).as_str(), "video/MP2T");
    }

    #[test]
    fn test_other_payload_types() {
        for pt in [0u8, 14, 32, 34, 96, 127] {
            assert_eq!(ContentType::from_payload_type(pt), ContentType::OctetStream);
        }
        assert_eq!(ContentType::OctetStream.as_str(), "application/octet-stream");
    }
}
