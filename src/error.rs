//! Error types for the multicast relay

use std::net::SocketAddrV4;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request relay failures
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("No address specified")]
    MissingAddress,

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("{0} is not an IPv4 multicast group")]
    NotMulticast(SocketAddrV4),

    #[error("Failed to join multicast group {group}: {source}")]
    Join {
        group: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    #[error("No packet received from {group} within {timeout:?}")]
    Timeout { group: SocketAddrV4, timeout: Duration },

    #[error("Malformed RTP packet: {0}")]
    Decode(#[from] RtpError),

    #[error("Client connection closed")]
    DownstreamClosed,

    #[error("Multicast read failed: {0}")]
    UpstreamRead(#[source] std::io::Error),
}

/// Failure classes a relay error falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    ClientInput,
    ResourceAcquisition,
    Timeout,
    ProtocolDecode,
    DownstreamWrite,
    UpstreamRead,
}

impl RelayError {
    /// Classify this error
    pub fn kind(&self) -> RelayErrorKind {
        match self {
            RelayError::MissingAddress
            | RelayError::InvalidAddress { .. }
            | RelayError::NotMulticast(_) => RelayErrorKind::ClientInput,
            RelayError::Join { .. } => RelayErrorKind::ResourceAcquisition,
            RelayError::Timeout { .. } => RelayErrorKind::Timeout,
            RelayError::Decode(_) => RelayErrorKind::ProtocolDecode,
            RelayError::DownstreamClosed => RelayErrorKind::DownstreamWrite,
            RelayError::UpstreamRead(_) => RelayErrorKind::UpstreamRead,
        }
    }
}

/// RTP decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtpError {
    #[error("Packet too short: {0} bytes")]
    TooShort(usize),

    #[error("Unsupported RTP version: {0}")]
    UnsupportedVersion(u8),

    #[error("Header length {header} exceeds packet length {packet}")]
    HeaderOverflow { header: usize, packet: usize },

    #[error("Invalid padding length: {0}")]
    InvalidPadding(u8),
}

/// Configuration and provisioning errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No interface configured")]
    MissingInterface,

    #[error("Interface not found: {name}: {reason}")]
    InterfaceNotFound { name: String, reason: String },

    #[error("Invalid timeout {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
