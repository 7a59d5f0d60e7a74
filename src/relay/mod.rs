//! Per-request relay execution
//!
//! [`Relay`] is built once from provisioned settings and shared by every
//! request. Each call to [`Relay::serve`] resolves the target, opens a
//! source and runs a [`RelaySession`] on its own task.

pub mod failure;
pub mod session;
pub mod sink;

pub use failure::failure_response;
pub use session::{RelayOutcome, RelaySession, SessionEnd};
pub use sink::{response_channel, ResponseHead, ResponseSink, ResponseStream};

use axum::response::Response;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{RelayConfig, RelaySettings};
use crate::error::ConfigError;
use crate::network::{MulticastOpener, SourceOpener};
use crate::protocol::resolve_target;

/// Provisioned relay, shared read-only across requests
pub struct Relay<O = MulticastOpener> {
    opener: O,
    first_packet_timeout: Duration,
    channel_capacity: usize,
}

impl Relay<MulticastOpener> {
    /// Validate config and resolve the interface
    pub fn provision(config: &RelayConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_settings(config.provision()?))
    }

    pub fn from_settings(settings: RelaySettings) -> Self {
        Self::new(
            MulticastOpener::new(settings.interface),
            settings.first_packet_timeout,
            settings.channel_capacity,
        )
    }
}

impl<O: SourceOpener> Relay<O> {
    pub fn new(opener: O, first_packet_timeout: Duration, channel_capacity: usize) -> Self {
        Self {
            opener,
            first_packet_timeout,
            channel_capacity,
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn first_packet_timeout(&self) -> Duration {
        self.first_packet_timeout
    }

    /// Handle one request path, returning once the response head is known
    pub async fn serve(&self, path: &str) -> Response {
        let group = match resolve_target(path) {
            Ok(group) => group,
            Err(e) => {
                tracing::debug!("Rejected {:?}: {}", path, e);
                return failure_response(&e);
            }
        };

        let span = tracing::info_span!("relay", session = %Uuid::new_v4(), %group);

        let source = match span.in_scope(|| self.opener.open(group)) {
            Ok(source) => source,
            Err(e) => {
                span.in_scope(|| tracing::warn!("{}", e));
                return failure_response(&e);
            }
        };

        let (sink, stream) = response_channel(self.channel_capacity);
        let session = RelaySession::new(group, source, self.first_packet_timeout);

        tokio::spawn(
            async move {
                let outcome = session.run(sink).await;
                outcome.log();
            }
            .instrument(span),
        );

        stream.into_response().await
    }
}
