//! Response sink between a relay session and the HTTP body
//!
//! The session owns a [`ResponseSink`]; the HTTP handler owns the matching
//! [`ResponseStream`]. The head travels over a oneshot so it can be sent
//! exactly once, payloads travel over a bounded channel so a slow client
//! applies backpressure to its own session only.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use std::convert::Infallible;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::RelayError;
use crate::protocol::ContentType;

/// What the client sees before any payload
#[derive(Debug)]
pub enum ResponseHead {
    /// 200 with the given content type, payloads follow
    Stream { content_type: ContentType },
    /// Error status with a plain-text body
    Failure { status: StatusCode, message: String },
}

/// Session side of the response
pub struct ResponseSink {
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::Sender<Bytes>,
}

/// Handler side of the response
pub struct ResponseStream {
    head: oneshot::Receiver<ResponseHead>,
    body: mpsc::Receiver<Bytes>,
}

/// Create a connected sink/stream pair buffering up to `capacity` payloads
pub fn response_channel(capacity: usize) -> (ResponseSink, ResponseStream) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(capacity);

    (
        ResponseSink {
            head: Some(head_tx),
            body: body_tx,
        },
        ResponseStream {
            head: head_rx,
            body: body_rx,
        },
    )
}

impl ResponseSink {
    /// Whether a head has already been sent
    pub fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    /// Announce a successful stream. Later calls are no-ops.
    pub fn start(&mut self, content_type: ContentType) -> Result<(), RelayError> {
        match self.head.take() {
            Some(head) => head
                .send(ResponseHead::Stream { content_type })
                .map_err(|_| RelayError::DownstreamClosed),
            None => Ok(()),
        }
    }

    /// Report a failure, if nothing was committed yet.
    ///
    /// Returns `true` when the failure head was delivered.
    pub fn fail(&mut self, error: &RelayError) -> bool {
        match self.head.take() {
            Some(head) => head
                .send(ResponseHead::Failure {
                    status: error.status(),
                    message: error.to_string(),
                })
                .is_ok(),
            None => false,
        }
    }

    /// Forward one payload, waiting for room in the channel
    pub async fn write(&mut self, payload: Bytes) -> Result<(), RelayError> {
        self.body
            .send(payload)
            .await
            .map_err(|_| RelayError::DownstreamClosed)
    }

    /// Resolves once the client side has gone away
    pub async fn closed(&self) {
        self.body.closed().await
    }
}

impl ResponseStream {
    /// Wait for the head. `None` if the session ended without sending one.
    pub async fn recv_head(&mut self) -> Option<ResponseHead> {
        (&mut self.head).await.ok()
    }

    /// Next forwarded payload, `None` once the session is done
    pub async fn recv_chunk(&mut self) -> Option<Bytes> {
        self.body.recv().await
    }

    /// Wait for the head and build the HTTP response from it
    pub async fn into_response(self) -> Response {
        let ResponseStream { head, body } = self;

        match head.await {
            Ok(ResponseHead::Stream { content_type }) => {
                let stream = ReceiverStream::new(body).map(Ok::<_, Infallible>);
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, content_type.as_str())],
                    Body::from_stream(stream),
                )
                    .into_response()
            }
            Ok(ResponseHead::Failure { status, message }) => (status, message).into_response(),
            Err(_) => {
                tracing::error!("Relay session ended without a response");
                (StatusCode::INTERNAL_SERVER_ERROR, "Relay session aborted").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_head_sent_once() {
        let (mut sink, mut stream) = response_channel(4);
        assert!(!sink.is_committed());

        sink.start(ContentType::Mp2t).unwrap();
        assert!(sink.is_committed());
        sink.start(ContentType::OctetStream).unwrap();
        assert!(!sink.fail(&RelayError::MissingAddress));

        match stream.recv_head().await {
            Some(ResponseHead::Stream { content_type }) => assert_eq!(content_type, ContentType::Mp2t),
            other => panic!("unexpected head {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_head() {
        let (mut sink, mut stream) = response_channel(4);
        assert!(sink.fail(&RelayError::MissingAddress));

        match stream.recv_head().await {
            Some(ResponseHead::Failure { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "No address specified");
            }
            other => panic!("unexpected head {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_after_client_gone() {
        let (mut sink, stream) = response_channel(4);
        sink.start(ContentType::Mp2t).unwrap();
        drop(stream);

        sink.closed().await;
        let err = sink.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, RelayError::DownstreamClosed));
    }

    #[tokio::test]
    async fn test_start_after_client_gone() {
        let (mut sink, stream) = response_channel(4);
        drop(stream);
        assert!(matches!(sink.start(ContentType::Mp2t), Err(RelayError::DownstreamClosed)));
    }

    #[tokio::test]
    async fn test_dropped_sink_without_head() {
        let (sink, stream) = response_channel(4);
        drop(sink);
        let response = stream.into_response().await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
