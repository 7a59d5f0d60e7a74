//! Relay session state machine
//!
//! The first read runs under the first-packet deadline. A failure there (or a
//! malformed first datagram) is reported to the client with an error status.
//! Once the response head is committed every failure ends the stream
//! silently, since the status line is already on the wire. A client leaving
//! ends the session in either phase.

use bytes::Bytes;
use std::net::SocketAddrV4;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::RelayError;
use crate::network::DatagramSource;
use crate::protocol::{ContentType, RtpPacket};
use crate::relay::sink::ResponseSink;

/// Why a session stopped
#[derive(Debug)]
pub enum SessionEnd {
    /// Failed before streaming; the client got an error response
    Failed(RelayError),
    /// The client went away
    ClientGone,
    /// Reading from the group failed mid-stream
    SourceEnded(RelayError),
    /// A malformed datagram arrived mid-stream
    Malformed(RelayError),
}

/// Summary of a finished session
#[derive(Debug)]
pub struct RelayOutcome {
    pub group: SocketAddrV4,
    pub content_type: Option<ContentType>,
    pub bytes_forwarded: u64,
    pub packets_forwarded: u64,
    pub end: SessionEnd,
}

impl RelayOutcome {
    pub fn log(&self) {
        match &self.end {
            SessionEnd::Failed(e) => {
                tracing::warn!("Relay from {} failed before streaming: {}", self.group, e);
            }
            SessionEnd::ClientGone => tracing::info!(
                "Client left {} after {} packets, {} bytes",
                self.group,
                self.packets_forwarded,
                self.bytes_forwarded
            ),
            SessionEnd::SourceEnded(e) => tracing::info!(
                "Stream from {} ended after {} packets, {} bytes: {}",
                self.group,
                self.packets_forwarded,
                self.bytes_forwarded,
                e
            ),
            SessionEnd::Malformed(e) => tracing::warn!(
                "Stream from {} stopped after {} packets, {} bytes: {}",
                self.group,
                self.packets_forwarded,
                self.bytes_forwarded,
                e
            ),
        }
    }
}

/// One client request relaying one multicast group
pub struct RelaySession<S> {
    group: SocketAddrV4,
    source: S,
    first_packet_timeout: Duration,
    header_sent: bool,
    content_type: Option<ContentType>,
    bytes_forwarded: u64,
    packets_forwarded: u64,
    /// Receive buffer, reused for every datagram
    buf: Vec<u8>,
}

impl<S: DatagramSource> RelaySession<S> {
    pub fn new(group: SocketAddrV4, source: S, first_packet_timeout: Duration) -> Self {
        Self {
            group,
            source,
            first_packet_timeout,
            header_sent: false,
            content_type: None,
            bytes_forwarded: 0,
            packets_forwarded: 0,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Run the session to completion.
    ///
    /// Consumes the session, so the source is released when this returns.
    pub async fn run(mut self, mut sink: ResponseSink) -> RelayOutcome {
        let end = self.relay(&mut sink).await;

        if let SessionEnd::Failed(ref error) = end {
            sink.fail(error);
        }

        RelayOutcome {
            group: self.group,
            content_type: self.content_type,
            bytes_forwarded: self.bytes_forwarded,
            packets_forwarded: self.packets_forwarded,
            end,
        }
    }

    async fn relay(&mut self, sink: &mut ResponseSink) -> SessionEnd {
        let deadline = Instant::now() + self.first_packet_timeout;

        let first = tokio::select! {
            result = timeout_at(deadline, self.source.recv(&mut self.buf)) => result,
            _ = sink.closed() => return SessionEnd::ClientGone,
        };

        let mut len = match first {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return SessionEnd::Failed(RelayError::UpstreamRead(e)),
            Err(_) => {
                return SessionEnd::Failed(RelayError::Timeout {
                    group: self.group,
                    timeout: self.first_packet_timeout,
                })
            }
        };

        // No deadline from here on
        tracing::debug!("First datagram from {}: {} bytes", self.group, len);

        loop {
            let (payload_type, payload) = match RtpPacket::parse(&self.buf[..len]) {
                Ok(packet) => (packet.payload_type(), Bytes::copy_from_slice(packet.payload)),
                Err(e) if !self.header_sent => return SessionEnd::Failed(e.into()),
                Err(e) => return SessionEnd::Malformed(e.into()),
            };

            if !self.header_sent {
                self.header_sent = true;
                let content_type = ContentType::from_payload_type(payload_type);
                self.content_type = Some(content_type);
                tracing::info!(
                    "Streaming {} as {} (payload type {})",
                    self.group,
                    content_type.as_str(),
                    payload_type
                );
                if sink.start(content_type).is_err() {
                    return SessionEnd::ClientGone;
                }
            }

            let payload_len = payload.len() as u64;
            if sink.write(payload).await.is_err() {
                return SessionEnd::ClientGone;
            }
            self.bytes_forwarded += payload_len;
            self.packets_forwarded += 1;

            len = tokio::select! {
                result = self.source.recv(&mut self.buf) => match result {
                    Ok(len) => len,
                    Err(e) => return SessionEnd::SourceEnded(RelayError::UpstreamRead(e)),
                },
                _ = sink.closed() => return SessionEnd::ClientGone,
            };
        }
    }
}
