//! # Multicast Relay
//!
//! HTTP relay for RTP-encapsulated MPEG transport streams carried over IP multicast.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  GET /udp/239.1.1.1:1234   ┌──────────────────────────────────────┐
//! │ HTTP client  │ ─────────────────────────► │  HTTP layer (http::server, handlers) │
//! └──────▲───────┘                            └──────────────────┬───────────────────┘
//!        │                                                       │ path
//!        │                                                       ▼
//!        │                                    ┌──────────────────────────────────────┐
//!        │                                    │  Target resolver (protocol::target)  │
//!        │                                    └──────────────────┬───────────────────┘
//!        │                                                       │ group address
//!        │                                                       ▼
//!        │                                    ┌──────────────────────────────────────┐
//!        │                                    │ Multicast socket (network::multicast)│
//!        │                                    │   joined on the configured interface │
//!        │                                    └──────────────────┬───────────────────┘
//!        │                                                       │ datagrams
//!        │                                                       ▼
//!        │  200 + Content-Type + payloads     ┌──────────────────────────────────────┐
//!        └─────────────────────────────────── │  Relay session (relay::session)      │
//!           or 400/500 + plain text           │   AwaitingFirst → Streaming → Done   │
//!                                             │   RTP depacketizer (protocol::rtp)   │
//!                                             └──────────────────────────────────────┘
//! ```
//!
//! Each request gets its own [`relay::RelaySession`] running on a dedicated
//! task. Sessions share nothing but the read-only provisioned settings.

pub mod config;
pub mod error;
pub mod http;
pub mod network;
pub mod protocol;
pub mod relay;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// RTP payload type for MPEG-2 transport streams (RFC 3551)
    pub const RTP_PAYLOAD_MP2T: u8 = 33;

    /// Media type announced for MPEG-2 transport streams
    pub const CONTENT_TYPE_MP2T: &str = "video/MP2T";

    /// Media type announced for every other payload type
    pub const CONTENT_TYPE_DEFAULT: &str = "application/octet-stream";

    /// Receive buffer size, one standard Ethernet datagram
    pub const MAX_DATAGRAM_SIZE: usize = 1500;

    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Default first-packet timeout
    pub const DEFAULT_TIMEOUT: &str = "5s";

    /// Payload chunks buffered between a session and its HTTP body
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
}
